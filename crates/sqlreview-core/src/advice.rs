//! Advice types - the findings produced by a review

use serde::{Deserialize, Serialize};

/// Map a statement-local line to a script line.
///
/// `base_line` is the number of line breaks preceding the statement's source
/// text in the script and `local_line` is the 1-indexed line reported by the
/// parser inside that text. Every advice position goes through this helper.
pub fn position(base_line: usize, local_line: usize) -> usize {
    base_line + local_line
}

/// Location of an advice in the reviewed script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed, script-relative)
    pub line: usize,
    /// Column number (1-indexed), when the offending token is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Position {
    /// Position of a statement-local line
    pub fn at(base_line: usize, local_line: usize) -> Self {
        Self {
            line: position(base_line, local_line.max(1)),
            column: None,
        }
    }

    /// Position from a sqlparser location inside a statement
    pub fn from_location(base_line: usize, location: &sqlparser::tokenizer::Location) -> Self {
        let column = (location.column > 0).then_some(location.column as usize);
        Self {
            line: position(base_line, (location.line as usize).max(1)),
            column,
        }
    }
}

/// Advice severity level
///
/// Ordered so that `Info < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single finding reported by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    pub severity: Severity,
    pub code: AdviceCode,
    /// Display name of the rule that produced this advice
    pub title: String,
    pub message: String,
    pub position: Position,
}

impl Advice {
    pub fn new(
        severity: Severity,
        code: AdviceCode,
        title: impl Into<String>,
        message: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            severity,
            code,
            title: title.into(),
            message: message.into(),
            position,
        }
    }

    /// Numeric advice code (e.g. 401)
    pub fn code(&self) -> u32 {
        self.code.code()
    }

    /// Script line of this advice
    pub fn line(&self) -> usize {
        self.position.line
    }
}

/// Kinds of advice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdviceCode {
    /// 201: Statement could not be parsed
    StatementSyntaxError,
    /// 202: UPDATE or DELETE without WHERE
    StatementNoWhere,
    /// 203: SELECT *
    StatementSelectAll,
    /// 301: Table name does not follow the naming convention
    TableNamingMismatch,
    /// 302: Column name does not follow the naming convention
    ColumnNamingMismatch,
    /// 303: Index name does not follow the naming convention
    IndexNamingMismatch,
    /// 304: Unique key name does not follow the naming convention
    UniqueKeyNamingMismatch,
    /// 401: Table is missing required columns
    NoRequiredColumn,
    /// 411: Column uses a disallowed type
    DisabledColumnType,
    /// 420: Column has no default value
    ColumnNoDefault,
    /// 802: Primary key column has a disallowed type
    IndexPrimaryKeyType,
    /// 803: Index key column has a BLOB/TEXT type
    IndexTypeNoBlob,
    /// 804: Too many indexes on a table
    IndexCountExceedsLimit,
    /// 1701: Statement uses a disallowed function
    DisabledFunction,
}

impl AdviceCode {
    pub fn code(&self) -> u32 {
        match self {
            AdviceCode::StatementSyntaxError => 201,
            AdviceCode::StatementNoWhere => 202,
            AdviceCode::StatementSelectAll => 203,
            AdviceCode::TableNamingMismatch => 301,
            AdviceCode::ColumnNamingMismatch => 302,
            AdviceCode::IndexNamingMismatch => 303,
            AdviceCode::UniqueKeyNamingMismatch => 304,
            AdviceCode::NoRequiredColumn => 401,
            AdviceCode::DisabledColumnType => 411,
            AdviceCode::ColumnNoDefault => 420,
            AdviceCode::IndexPrimaryKeyType => 802,
            AdviceCode::IndexTypeNoBlob => 803,
            AdviceCode::IndexCountExceedsLimit => 804,
            AdviceCode::DisabledFunction => 1701,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdviceCode::StatementSyntaxError => "statement-syntax-error",
            AdviceCode::StatementNoWhere => "statement-no-where",
            AdviceCode::StatementSelectAll => "statement-select-all",
            AdviceCode::TableNamingMismatch => "table-naming-mismatch",
            AdviceCode::ColumnNamingMismatch => "column-naming-mismatch",
            AdviceCode::IndexNamingMismatch => "index-naming-mismatch",
            AdviceCode::UniqueKeyNamingMismatch => "unique-key-naming-mismatch",
            AdviceCode::NoRequiredColumn => "no-required-column",
            AdviceCode::DisabledColumnType => "disabled-column-type",
            AdviceCode::ColumnNoDefault => "column-no-default",
            AdviceCode::IndexPrimaryKeyType => "index-primary-key-type",
            AdviceCode::IndexTypeNoBlob => "index-type-no-blob",
            AdviceCode::IndexCountExceedsLimit => "index-count-exceeds-limit",
            AdviceCode::DisabledFunction => "disabled-function",
        }
    }
}
