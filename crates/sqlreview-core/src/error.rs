//! Error types

use thiserror::Error;

use crate::engine::EventTag;

/// Error returned by a rule hook
///
/// A rule that returns an error is not invoked again for the rest of the
/// script. Other rules keep running.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum RuleError {
    #[error("unexpected {tag:?} node: {detail}")]
    #[diagnostic(code(sqlreview::rule::unexpected_node))]
    UnexpectedNode { tag: EventTag, detail: String },

    #[error("{0}")]
    #[diagnostic(code(sqlreview::rule::internal))]
    Internal(String),
}

/// A rule error tagged with the rule that raised it
#[derive(Debug, Error, miette::Diagnostic)]
#[error("rule '{rule}' stopped: {error}")]
pub struct RuleFailure {
    pub rule: &'static str,
    #[source]
    pub error: RuleError,
}

/// Error building a rule from its configuration
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ConfigError {
    #[error("invalid payload for rule '{rule}': {source}")]
    #[diagnostic(
        code(sqlreview::config::payload),
        help("Check the [rules.payload] table of this rule")
    )]
    InvalidPayload {
        rule: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid naming format '{format}' for rule '{rule}': {source}")]
    #[diagnostic(code(sqlreview::config::pattern))]
    InvalidPattern {
        rule: &'static str,
        format: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("rule '{rule}' requires a non-empty '{field}'")]
    #[diagnostic(code(sqlreview::config::missing))]
    MissingValue {
        rule: &'static str,
        field: &'static str,
    },
}

/// Script-level failure that aborts a whole check
#[derive(Debug, Error, miette::Diagnostic)]
pub enum CheckError {
    #[error("review cancelled before statement {statement}")]
    #[diagnostic(code(sqlreview::cancelled))]
    Cancelled { statement: usize },
}
