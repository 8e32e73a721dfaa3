//! Naming-convention templates
//!
//! A template is a regular expression that may contain metadata
//! placeholders such as `{{table}}`. Placeholders are substituted per
//! occurrence, so the pattern for an index on `orders(customer_id)` is
//! compiled from `idx_{{table}}_{{column_list}}` as `idx_orders_customer_id`.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::error::ConfigError;

pub const TABLE_TOKEN: &str = "table";
pub const COLUMN_LIST_TOKEN: &str = "column_list";
pub const REFERENCED_TABLE_TOKEN: &str = "referenced_table";
pub const REFERENCED_COLUMN_TOKEN: &str = "referenced_column";

const KNOWN_TOKENS: &[&str] = &[
    TABLE_TOKEN,
    COLUMN_LIST_TOKEN,
    REFERENCED_TABLE_TOKEN,
    REFERENCED_COLUMN_TOKEN,
];

/// Placeholder values for one named object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingMetadata {
    values: HashMap<&'static str, String>,
}

impl NamingMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(token, value.into());
        self
    }

    /// Metadata for an index: its table and `_`-joined column list
    pub fn for_index<S: AsRef<str>>(table: &str, columns: &[S]) -> Self {
        let column_list = columns
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("_");
        Self::new()
            .with(TABLE_TOKEN, table)
            .with(COLUMN_LIST_TOKEN, column_list)
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.values.get(token).map(String::as_str)
    }
}

/// Ways a name can break its convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingViolation {
    Mismatch { name: String, pattern: String },
    TooLong { name: String, max_length: usize },
}

impl fmt::Display for NamingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingViolation::Mismatch { name, pattern } => {
                write!(f, "`{name}` mismatches the naming convention, expected \"{pattern}\"")
            }
            NamingViolation::TooLong { name, max_length } => write!(
                f,
                "`{name}` mismatches the naming convention, its length should be within {max_length} characters"
            ),
        }
    }
}

/// A naming convention with optional metadata placeholders
#[derive(Debug, Clone)]
pub struct NamingTemplate {
    format: String,
    max_length: Option<usize>,
}

impl NamingTemplate {
    /// Validate `format` by compiling it with placeholder values
    pub fn new(
        rule: &'static str,
        format: impl Into<String>,
        max_length: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let format = format.into();
        let mut sample = NamingMetadata::new();
        for token in KNOWN_TOKENS {
            sample = sample.with(token, "a");
        }
        let template = Self { format, max_length };
        template
            .compile(&sample)
            .map_err(|source| ConfigError::InvalidPattern {
                rule,
                format: template.format.clone(),
                source: Box::new(source),
            })?;
        Ok(template)
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// Substitute known placeholders; missing metadata becomes an empty string
    pub fn expand(&self, metadata: &NamingMetadata) -> String {
        let mut out = String::with_capacity(self.format.len());
        let mut rest = self.format.as_str();
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                break;
            };
            let token = after[..close].trim();
            if KNOWN_TOKENS.contains(&token) {
                out.push_str(metadata.get(token).unwrap_or_default());
            } else {
                // Unknown placeholders stay literal and usually fail to compile
                out.push_str(&rest[open..open + 2 + close + 2]);
            }
            rest = &after[close + 2..];
        }
        out.push_str(rest);
        out
    }

    pub fn compile(&self, metadata: &NamingMetadata) -> Result<Regex, regex::Error> {
        Regex::new(&self.expand(metadata))
    }

    /// Check one name against the convention
    ///
    /// Pattern and length are checked independently, so a name can yield
    /// two violations.
    pub fn check(
        &self,
        name: &str,
        metadata: &NamingMetadata,
    ) -> Result<Vec<NamingViolation>, regex::Error> {
        let regex = self.compile(metadata)?;
        let mut violations = Vec::new();
        if !regex.is_match(name) {
            violations.push(NamingViolation::Mismatch {
                name: name.to_string(),
                pattern: regex.as_str().to_string(),
            });
        }
        if let Some(max_length) = self.max_length {
            if max_length > 0 && name.chars().count() > max_length {
                violations.push(NamingViolation::TooLong {
                    name: name.to_string(),
                    max_length,
                });
            }
        }
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_metadata() -> NamingMetadata {
        NamingMetadata::for_index("orders", &["customer_id"])
    }

    #[test]
    fn test_index_template() {
        let template = NamingTemplate::new("naming.index", "idx_{{table}}_{{column_list}}", None)
            .unwrap();
        assert_eq!(template.expand(&orders_metadata()), "idx_orders_customer_id");

        let ok = template
            .check("idx_orders_customer_id", &orders_metadata())
            .unwrap();
        assert!(ok.is_empty());

        let bad = template
            .check("ix_orders_customer_id", &orders_metadata())
            .unwrap();
        assert_eq!(bad.len(), 1);
        assert!(matches!(bad[0], NamingViolation::Mismatch { .. }));
    }

    #[test]
    fn test_column_list_joins_with_underscore() {
        let metadata = NamingMetadata::for_index("t", &["a", "b"]);
        assert_eq!(metadata.get(COLUMN_LIST_TOKEN), Some("a_b"));
    }

    #[test]
    fn test_missing_metadata_is_empty() {
        let template =
            NamingTemplate::new("naming.index", "^fk_{{referenced_table}}$", None).unwrap();
        assert_eq!(template.expand(&NamingMetadata::new()), "^fk_$");
    }

    #[test]
    fn test_mismatch_and_length_are_independent() {
        let template = NamingTemplate::new("naming.table", "^[a-z]+$", Some(5)).unwrap();
        let violations = template.check("Customers", &NamingMetadata::new()).unwrap();
        assert_eq!(violations.len(), 2);

        let violations = template.check("customers", &NamingMetadata::new()).unwrap();
        assert_eq!(
            violations,
            vec![NamingViolation::TooLong {
                name: "customers".to_string(),
                max_length: 5
            }]
        );
    }

    #[test]
    fn test_invalid_format_is_config_error() {
        let err = NamingTemplate::new("naming.table", "^([a-z]+$", None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_metadata_values_are_not_escaped() {
        // A value with regex syntax can break an otherwise valid template
        let template = NamingTemplate::new("naming.index", "^idx_{{table}}$", None).unwrap();
        let metadata = NamingMetadata::new().with(TABLE_TOKEN, "bad(");
        assert!(template.check("idx_bad", &metadata).is_err());
    }
}
