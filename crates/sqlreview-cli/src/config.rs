//! Configuration file handling

use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use sqlreview_core::rules::{default_rule_configs, RuleConfig};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "sqlreview.toml";

/// Configuration for sqlreview
///
/// ```toml
/// schema = ["schema/*.sql"]
/// files = ["migrations/*.sql"]
/// dialect = "mysql"
/// disable = ["statement.select-no-select-all"]
///
/// [[rules]]
/// type = "column.required"
/// level = "error"
/// payload = { list = ["id", "created_at"] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Schema file paths or patterns
    #[serde(default)]
    pub schema: Vec<String>,

    /// Migration file patterns to review
    #[serde(default)]
    pub files: Vec<String>,

    /// SQL dialect ("postgresql" or "mysql")
    #[serde(default)]
    pub dialect: Option<String>,

    /// Output format (human, json, sarif)
    #[serde(default)]
    pub format: Option<String>,

    /// Rule types to disable
    #[serde(default)]
    pub disable: Vec<String>,

    /// Schema directory
    pub schema_dir: Option<String>,

    /// Rules to run; the default profile when empty
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).into_diagnostic()?;
        let config: Config = toml::from_str(&contents).into_diagnostic()?;
        tracing::debug!(path = %path.display(), rules = config.rules.len(), "loaded configuration");
        Ok(config)
    }

    /// Try to find and load sqlreview.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(Some(Self::from_file(&config_path)?));
            }

            // Try parent directory
            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Merge CLI arguments into configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_with_args(
        mut self,
        schema: &[PathBuf],
        schema_dir: &Option<PathBuf>,
        files: &[PathBuf],
        dialect: &Option<String>,
        format: &Option<crate::args::OutputFormat>,
        disable: &[String],
    ) -> Self {
        // CLI args override config file
        if !schema.is_empty() {
            self.schema = schema.iter().map(|p| p.display().to_string()).collect();
        }

        if schema_dir.is_some() {
            self.schema_dir = schema_dir.as_ref().map(|p| p.display().to_string());
        }

        if !files.is_empty() {
            self.files = files.iter().map(|p| p.display().to_string()).collect();
        }

        if dialect.is_some() {
            self.dialect = dialect.clone();
        }

        if let Some(fmt) = format {
            self.format = Some(format!("{:?}", fmt).to_lowercase());
        }

        if !disable.is_empty() {
            self.disable = disable.to_vec();
        }

        self
    }

    /// Configured rules (or the default profile) minus the disabled ones
    pub fn rule_configs(&self) -> Vec<RuleConfig> {
        let rules = if self.rules.is_empty() {
            default_rule_configs()
        } else {
            self.rules.clone()
        };
        rules
            .into_iter()
            .filter(|r| !self.disable.iter().any(|d| d == r.rule_type.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlreview_core::rules::RuleType;
    use sqlreview_core::Severity;

    #[test]
    fn test_parse_rules_table() {
        let config: Config = toml::from_str(
            r#"
            dialect = "mysql"
            disable = ["naming.column"]

            [[rules]]
            type = "column.required"
            level = "error"
            payload = { list = ["id", "created_at"] }

            [[rules]]
            type = "naming.column"
            "#,
        )
        .unwrap();

        assert_eq!(config.dialect.as_deref(), Some("mysql"));
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].level, Severity::Error);
        assert_eq!(
            config.rules[0].payload,
            Some(serde_json::json!({ "list": ["id", "created_at"] }))
        );

        let active = config.rule_configs();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].rule_type, RuleType::ColumnRequired);
    }

    #[test]
    fn test_empty_config_uses_default_profile() {
        let config = Config::default();
        assert_eq!(config.rule_configs().len(), RuleType::ALL.len());
    }

    #[test]
    fn test_cli_overrides_file() {
        let config = Config {
            dialect: Some("postgresql".to_string()),
            ..Config::default()
        };
        let merged = config.merge_with_args(
            &[],
            &None,
            &[PathBuf::from("a.sql")],
            &Some("mysql".to_string()),
            &Some(crate::args::OutputFormat::Json),
            &[],
        );
        assert_eq!(merged.dialect.as_deref(), Some("mysql"));
        assert_eq!(merged.format.as_deref(), Some("json"));
        assert_eq!(merged.files, vec!["a.sql".to_string()]);
    }
}
