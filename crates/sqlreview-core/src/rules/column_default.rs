//! `column.require-default`
//!
//! Primary keys, serial and auto-increment columns, identity and generated
//! columns are exempt since the database supplies their values. On MySQL,
//! BLOB/TEXT/JSON columns are exempt as well because they cannot carry a
//! literal default.

use std::collections::HashSet;

use sqlparser::ast::{Statement, TableConstraint};

use crate::advice::{AdviceCode, Severity};
use crate::dialect::SqlDialect;
use crate::engine::{ColumnNode, EventTag, Node, Rule, RuleBase, WalkContext};
use crate::error::RuleError;
use crate::schema::QualifiedName;
use crate::types::SqlType;

use super::RuleType;

pub struct ColumnRequireDefault {
    base: RuleBase,
    /// Columns named by a table-level PRIMARY KEY of the CREATE TABLE being walked
    primary_key: HashSet<String>,
}

impl ColumnRequireDefault {
    pub fn new(level: Severity) -> Self {
        Self {
            base: RuleBase::new(RuleType::ColumnRequireDefault.title(), level),
            primary_key: HashSet::new(),
        }
    }

    fn is_exempt(&self, column: &ColumnNode<'_>, dialect: SqlDialect) -> bool {
        if column.is_primary_key()
            || column.is_generated()
            || self
                .primary_key
                .contains(&column.name.value.to_ascii_lowercase())
        {
            return true;
        }
        let type_name = column.data_type.to_string().to_ascii_lowercase();
        if type_name.ends_with("serial") {
            return true;
        }
        dialect == SqlDialect::MySQL && SqlType::from_ast(column.data_type).is_blob_like()
    }
}

impl Rule for ColumnRequireDefault {
    fn name(&self) -> &'static str {
        RuleType::ColumnRequireDefault.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[EventTag::CreateTable, EventTag::ColumnDefinition]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        match node {
            Node::Statement(Statement::CreateTable(create)) => {
                self.primary_key = create
                    .constraints
                    .iter()
                    .filter_map(|c| match c {
                        TableConstraint::PrimaryKey { columns, .. } => Some(columns),
                        _ => None,
                    })
                    .flatten()
                    .map(|ident| ident.value.to_ascii_lowercase())
                    .collect();
            }
            Node::Column(column) => {
                if column.default_expr().is_none() && !self.is_exempt(column, ctx.dialect) {
                    let message = format!(
                        "Column `{}`.`{}` doesn't have DEFAULT",
                        QualifiedName::from_object_name(column.table).name,
                        column.name.value
                    );
                    self.base
                        .report_at(AdviceCode::ColumnNoDefault, message, ctx.position_of(node));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_exit(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        _ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        if let Node::Statement(_) = node {
            self.primary_key.clear();
        }
        Ok(())
    }

    fn base(&self) -> &RuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RuleBase {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CheckContext, Reviewer};

    fn check(dialect: SqlDialect, sql: &str) -> Vec<String> {
        Reviewer::new(dialect)
            .check(
                sql,
                vec![Box::new(ColumnRequireDefault::new(Severity::Warning))],
                &CheckContext::new(),
            )
            .unwrap()
            .advice
            .into_iter()
            .map(|a| a.message)
            .collect()
    }

    #[test]
    fn test_missing_default() {
        let advice = check(
            SqlDialect::PostgreSQL,
            "CREATE TABLE t (id SERIAL PRIMARY KEY, name TEXT, n INT DEFAULT 0)",
        );
        assert_eq!(advice, vec!["Column `t`.`name` doesn't have DEFAULT"]);
    }

    #[test]
    fn test_table_level_primary_key_is_exempt() {
        let advice = check(
            SqlDialect::PostgreSQL,
            "CREATE TABLE t (id BIGINT, code INT DEFAULT 1, PRIMARY KEY (id))",
        );
        assert!(advice.is_empty());
    }

    #[test]
    fn test_auto_increment_and_mysql_text_are_exempt() {
        let advice = check(
            SqlDialect::MySQL,
            "CREATE TABLE t (id INT AUTO_INCREMENT, body TEXT, n INT)",
        );
        assert_eq!(advice, vec!["Column `t`.`n` doesn't have DEFAULT"]);
    }

    #[test]
    fn test_added_column() {
        let advice = check(SqlDialect::PostgreSQL, "ALTER TABLE t ADD COLUMN flag BOOLEAN");
        assert_eq!(advice, vec!["Column `t`.`flag` doesn't have DEFAULT"]);
    }
}
