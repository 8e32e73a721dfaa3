//! sqlreview-core: SQL schema review library
//!
//! This library walks the statements of a SQL script once, fans every
//! interesting node out to a configurable set of rules and collects their
//! advice. Rules can follow a table's columns across the whole script and
//! fall back to a schema catalog built from DDL files, without requiring a
//! database connection.

pub mod advice;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod naming;
pub mod rules;
pub mod schema;
pub mod types;

pub use advice::{position, Advice, AdviceCode, Position, Severity};
pub use dialect::SqlDialect;
pub use engine::{CancelFlag, CheckContext, EventTag, ReviewReport, Reviewer, Rule, RuleBase};
pub use error::{CheckError, ConfigError, RuleError, RuleFailure};
pub use rules::{build_rule, build_rules, default_rule_configs, RuleConfig, RuleType};
pub use schema::{Catalog, ColumnDef, QualifiedName, Schema, SchemaBuilder, TableDef};
pub use types::SqlType;
