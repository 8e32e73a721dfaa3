//! Built-in review rules and their configuration
//!
//! Rules are built fresh for every check from a list of [`RuleConfig`]s.
//! Each config names the rule type, the severity of its advice and an
//! optional JSON payload; a missing payload selects the rule's defaults.

mod column_default;
mod column_type;
mod function;
mod index_count;
mod index_key;
mod naming;
mod required_columns;
mod statement;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use column_default::ColumnRequireDefault;
pub use column_type::{ColumnTypeDisallowList, ColumnTypeDisallowPayload};
pub use function::{FunctionDisallowList, FunctionDisallowPayload};
pub use index_count::{IndexCountPayload, IndexTotalNumberLimit};
pub use index_key::{IndexPrimaryKeyType, IndexTypeNoBlob, PrimaryKeyTypePayload};
pub use naming::{ColumnNaming, IndexNaming, NamingPayload, TableNaming};
pub use required_columns::{RequiredColumns, RequiredColumnsPayload};
pub use statement::{SelectNoSelectAll, WhereRequire};

use crate::advice::Severity;
use crate::engine::Rule;
use crate::error::ConfigError;

/// Every rule type the engine knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleType {
    #[serde(rename = "column.required")]
    ColumnRequired,
    #[serde(rename = "column.type-disallow-list")]
    ColumnTypeDisallowList,
    #[serde(rename = "column.require-default")]
    ColumnRequireDefault,
    #[serde(rename = "naming.table")]
    NamingTable,
    #[serde(rename = "naming.column")]
    NamingColumn,
    #[serde(rename = "naming.index")]
    NamingIndex,
    #[serde(rename = "naming.unique-key")]
    NamingUniqueKey,
    #[serde(rename = "index.primary-key-type")]
    IndexPrimaryKeyType,
    #[serde(rename = "index.type-no-blob")]
    IndexTypeNoBlob,
    #[serde(rename = "index.total-number-limit")]
    IndexTotalNumberLimit,
    #[serde(rename = "function.disallow-list")]
    FunctionDisallowList,
    #[serde(rename = "statement.select-no-select-all")]
    StatementSelectNoSelectAll,
    #[serde(rename = "statement.where-require")]
    StatementWhereRequire,
}

impl RuleType {
    pub const ALL: &'static [RuleType] = &[
        RuleType::ColumnRequired,
        RuleType::ColumnTypeDisallowList,
        RuleType::ColumnRequireDefault,
        RuleType::NamingTable,
        RuleType::NamingColumn,
        RuleType::NamingIndex,
        RuleType::NamingUniqueKey,
        RuleType::IndexPrimaryKeyType,
        RuleType::IndexTypeNoBlob,
        RuleType::IndexTotalNumberLimit,
        RuleType::FunctionDisallowList,
        RuleType::StatementSelectNoSelectAll,
        RuleType::StatementWhereRequire,
    ];

    /// Configuration identifier, e.g. `column.required`
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::ColumnRequired => "column.required",
            RuleType::ColumnTypeDisallowList => "column.type-disallow-list",
            RuleType::ColumnRequireDefault => "column.require-default",
            RuleType::NamingTable => "naming.table",
            RuleType::NamingColumn => "naming.column",
            RuleType::NamingIndex => "naming.index",
            RuleType::NamingUniqueKey => "naming.unique-key",
            RuleType::IndexPrimaryKeyType => "index.primary-key-type",
            RuleType::IndexTypeNoBlob => "index.type-no-blob",
            RuleType::IndexTotalNumberLimit => "index.total-number-limit",
            RuleType::FunctionDisallowList => "function.disallow-list",
            RuleType::StatementSelectNoSelectAll => "statement.select-no-select-all",
            RuleType::StatementWhereRequire => "statement.where-require",
        }
    }

    /// Display title used on advice
    pub fn title(&self) -> &'static str {
        match self {
            RuleType::ColumnRequired => "Required columns",
            RuleType::ColumnTypeDisallowList => "Column type disallow list",
            RuleType::ColumnRequireDefault => "Column default required",
            RuleType::NamingTable => "Table naming convention",
            RuleType::NamingColumn => "Column naming convention",
            RuleType::NamingIndex => "Index naming convention",
            RuleType::NamingUniqueKey => "Unique key naming convention",
            RuleType::IndexPrimaryKeyType => "Primary key type allow list",
            RuleType::IndexTypeNoBlob => "No BLOB/TEXT index keys",
            RuleType::IndexTotalNumberLimit => "Index count limit",
            RuleType::FunctionDisallowList => "Function disallow list",
            RuleType::StatementSelectNoSelectAll => "No SELECT *",
            RuleType::StatementWhereRequire => "WHERE required",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RuleType::ColumnRequired => "Every table must end up with the configured columns",
            RuleType::ColumnTypeDisallowList => "Columns must not use the configured types",
            RuleType::ColumnRequireDefault => "Columns must declare a DEFAULT value",
            RuleType::NamingTable => "Table names must match the configured pattern",
            RuleType::NamingColumn => "Column names must match the configured pattern",
            RuleType::NamingIndex => "Index names must match the configured template",
            RuleType::NamingUniqueKey => "Unique key names must match the configured template",
            RuleType::IndexPrimaryKeyType => "Primary key columns must use an allowed type",
            RuleType::IndexTypeNoBlob => "Index keys must not be BLOB, TEXT or JSON columns",
            RuleType::IndexTotalNumberLimit => "Tables must not exceed the configured index count",
            RuleType::FunctionDisallowList => "Statements must not call the configured functions",
            RuleType::StatementSelectNoSelectAll => "Queries must list their columns explicitly",
            RuleType::StatementWhereRequire => "UPDATE and DELETE must have a WHERE clause",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown rule type: {s}"))
    }
}

/// Configuration of one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    #[serde(default = "default_level")]
    pub level: Severity,
    /// Rule-specific settings; `None` selects the defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

fn default_level() -> Severity {
    Severity::Warning
}

impl RuleConfig {
    pub fn new(rule_type: RuleType, level: Severity) -> Self {
        Self {
            rule_type,
            level,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Decode the payload, falling back to the payload type's defaults
    fn payload<T: DeserializeOwned + Default>(&self) -> Result<T, ConfigError> {
        match &self.payload {
            None | Some(serde_json::Value::Null) => Ok(T::default()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|source| {
                    ConfigError::InvalidPayload {
                        rule: self.rule_type.as_str(),
                        source,
                    }
                })
            }
        }
    }
}

/// Build one rule instance from its configuration
pub fn build_rule(config: &RuleConfig) -> Result<Box<dyn Rule>, ConfigError> {
    let level = config.level;
    let rule: Box<dyn Rule> = match config.rule_type {
        RuleType::ColumnRequired => Box::new(RequiredColumns::new(level, config.payload()?)?),
        RuleType::ColumnTypeDisallowList => {
            Box::new(ColumnTypeDisallowList::new(level, config.payload()?))
        }
        RuleType::ColumnRequireDefault => Box::new(ColumnRequireDefault::new(level)),
        RuleType::NamingTable => Box::new(TableNaming::new(level, config.payload()?)?),
        RuleType::NamingColumn => Box::new(ColumnNaming::new(level, config.payload()?)?),
        RuleType::NamingIndex => Box::new(IndexNaming::index(level, config.payload()?)?),
        RuleType::NamingUniqueKey => {
            Box::new(IndexNaming::unique_key(level, config.payload()?)?)
        }
        RuleType::IndexPrimaryKeyType => {
            Box::new(IndexPrimaryKeyType::new(level, config.payload()?)?)
        }
        RuleType::IndexTypeNoBlob => Box::new(IndexTypeNoBlob::new(level)),
        RuleType::IndexTotalNumberLimit => {
            Box::new(IndexTotalNumberLimit::new(level, config.payload()?))
        }
        RuleType::FunctionDisallowList => {
            Box::new(FunctionDisallowList::new(level, config.payload()?))
        }
        RuleType::StatementSelectNoSelectAll => Box::new(SelectNoSelectAll::new(level)),
        RuleType::StatementWhereRequire => Box::new(WhereRequire::new(level)),
    };
    Ok(rule)
}

/// Build every configured rule, keeping each construction result separate
/// so callers decide whether a bad config aborts the run
pub fn build_rules(configs: &[RuleConfig]) -> Vec<(RuleType, Result<Box<dyn Rule>, ConfigError>)> {
    configs
        .iter()
        .map(|config| (config.rule_type, build_rule(config)))
        .collect()
}

/// Every rule enabled with its default payload at warning level
pub fn default_rule_configs() -> Vec<RuleConfig> {
    RuleType::ALL
        .iter()
        .map(|&rule_type| RuleConfig::new(rule_type, Severity::Warning))
        .collect()
}

/// Case-insensitive membership for configured name lists
pub(crate) fn contains_ignore_case(list: &[String], name: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(name))
}
