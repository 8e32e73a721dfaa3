//! Review engine - parses a script and drives the registered rules over it

mod node;
mod rule;
mod source;
mod walker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use node::{classify, ColumnNode, EventTag, Node};
pub use rule::{Rule, RuleBase, WalkContext};
pub use source::{parse_script, split_statements, ParsedStatement, StatementSource, SyntaxError};
pub use walker::{WalkOutcome, Walker};

use crate::advice::{position, Advice, AdviceCode, Position, Severity};
use crate::dialect::SqlDialect;
use crate::error::{CheckError, RuleFailure};
use crate::schema::Catalog;

/// Shared cancellation signal for a running review
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Caller-supplied context for a single check
#[derive(Debug, Clone, Default)]
pub struct CheckContext {
    cancel: CancelFlag,
}

impl CheckContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_flag(cancel: CancelFlag) -> Self {
        Self { cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Result of reviewing one script
#[derive(Debug, Default)]
pub struct ReviewReport {
    /// Findings in traversal order, then rule registration order
    pub advice: Vec<Advice>,
    /// Rules that failed and were skipped for the rest of the script
    pub failures: Vec<RuleFailure>,
}

impl ReviewReport {
    fn syntax_error(error: SyntaxError) -> Self {
        let advice = Advice::new(
            Severity::Error,
            AdviceCode::StatementSyntaxError,
            "Syntax error",
            error.message,
            Position::at(error.base_line, error.local_line),
        );
        Self {
            advice: vec![advice],
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.advice.is_empty() && self.failures.is_empty()
    }

    /// Highest severity among the advice, if any
    pub fn max_severity(&self) -> Option<Severity> {
        self.advice.iter().map(|a| a.severity).max()
    }

    pub fn has_errors(&self) -> bool {
        self.max_severity() == Some(Severity::Error)
    }
}

/// Reviews scripts in one dialect, optionally against a persisted schema
#[derive(Debug, Clone, Copy)]
pub struct Reviewer<'a> {
    dialect: SqlDialect,
    catalog: Option<&'a Catalog>,
}

impl<'a> Reviewer<'a> {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            catalog: None,
        }
    }

    pub fn with_catalog(mut self, catalog: &'a Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Review a script with the given rules
    ///
    /// A script that does not parse yields a single syntax-error advice and
    /// no rule runs. Rule failures are isolated and reported alongside the
    /// advice; the only error is cancellation.
    pub fn check(
        &self,
        sql: &str,
        rules: Vec<Box<dyn Rule>>,
        ctx: &CheckContext,
    ) -> Result<ReviewReport, CheckError> {
        let statements = match parse_script(self.dialect, sql) {
            Ok(statements) => statements,
            Err(error) => {
                tracing::debug!(
                    line = position(error.base_line, error.local_line),
                    "script failed to parse"
                );
                return Ok(ReviewReport::syntax_error(error));
            }
        };

        let mut walker = Walker::new(rules);
        tracing::debug!(
            statements = statements.len(),
            rules = ?walker.rule_names(),
            "reviewing script"
        );

        for (i, parsed) in statements.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(CheckError::Cancelled { statement: i + 1 });
            }
            let walk_ctx = WalkContext {
                catalog: self.catalog,
                dialect: self.dialect,
                statement: parsed.source.text,
                base_line: parsed.source.base_line,
            };
            walker.walk_statement(&parsed.statement, &walk_ctx);
        }
        if ctx.is_cancelled() {
            return Err(CheckError::Cancelled {
                statement: statements.len(),
            });
        }

        let outcome = walker.finish(self.catalog);
        Ok(ReviewReport {
            advice: outcome.advice,
            failures: outcome.failures,
        })
    }
}
