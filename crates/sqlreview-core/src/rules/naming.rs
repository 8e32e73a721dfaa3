//! Naming-convention rules: `naming.table`, `naming.column`, `naming.index`
//! and `naming.unique-key`

use serde::{Deserialize, Serialize};
use sqlparser::ast::{AlterTableOperation, Ident, ObjectName, Statement, TableConstraint};

use crate::advice::{AdviceCode, Position, Severity};
use crate::engine::{EventTag, Node, Rule, RuleBase, WalkContext};
use crate::error::{ConfigError, RuleError};
use crate::naming::{NamingMetadata, NamingTemplate};
use crate::schema::{index_column_name, QualifiedName};

use super::RuleType;

const DEFAULT_MAX_LENGTH: usize = 64;
const SNAKE_CASE: &str = "^[a-z]+(_[a-z]+)*$";
const INDEX_FORMAT: &str = "^$|^idx_{{table}}_{{column_list}}$";
const UNIQUE_KEY_FORMAT: &str = "^$|^uk_{{table}}_{{column_list}}$";

/// Payload shared by the naming rules; omitted fields take the rule's defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingPayload {
    #[serde(default)]
    pub format: Option<String>,
    /// Maximum name length; 0 disables the check
    #[serde(default)]
    pub max_length: Option<usize>,
}

impl NamingPayload {
    fn template(self, rule: RuleType, default_format: &str) -> Result<NamingTemplate, ConfigError> {
        NamingTemplate::new(
            rule.as_str(),
            self.format.unwrap_or_else(|| default_format.to_string()),
            Some(self.max_length.unwrap_or(DEFAULT_MAX_LENGTH)),
        )
    }
}

/// Check a name and report each violation; a pattern that fails to compile
/// for this occurrence is logged and skipped
fn report_name(
    base: &mut RuleBase,
    rule: RuleType,
    code: AdviceCode,
    template: &NamingTemplate,
    name: &str,
    metadata: &NamingMetadata,
    position: Position,
) {
    match template.check(name, metadata) {
        Ok(violations) => {
            for violation in violations {
                base.report_at(code, violation.to_string(), position);
            }
        }
        Err(error) => {
            tracing::warn!(
                rule = rule.as_str(),
                name,
                format = template.format(),
                %error,
                "naming pattern failed to compile, skipping"
            );
        }
    }
}

fn last_ident(name: &ObjectName) -> String {
    QualifiedName::from_object_name(name).name
}

pub struct TableNaming {
    base: RuleBase,
    template: NamingTemplate,
}

impl TableNaming {
    pub fn new(level: Severity, payload: NamingPayload) -> Result<Self, ConfigError> {
        Ok(Self {
            base: RuleBase::new(RuleType::NamingTable.title(), level),
            template: payload.template(RuleType::NamingTable, SNAKE_CASE)?,
        })
    }
}

impl Rule for TableNaming {
    fn name(&self) -> &'static str {
        RuleType::NamingTable.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[EventTag::CreateTable, EventTag::AlterTableAction]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        let name = match node {
            Node::Statement(Statement::CreateTable(create)) => last_ident(&create.name),
            Node::AlterAction {
                operation: AlterTableOperation::RenameTable { table_name },
                ..
            } => last_ident(table_name),
            _ => return Ok(()),
        };
        report_name(
            &mut self.base,
            RuleType::NamingTable,
            AdviceCode::TableNamingMismatch,
            &self.template,
            &name,
            &NamingMetadata::new(),
            ctx.position_of(node),
        );
        Ok(())
    }

    fn base(&self) -> &RuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RuleBase {
        &mut self.base
    }
}

pub struct ColumnNaming {
    base: RuleBase,
    template: NamingTemplate,
}

impl ColumnNaming {
    pub fn new(level: Severity, payload: NamingPayload) -> Result<Self, ConfigError> {
        Ok(Self {
            base: RuleBase::new(RuleType::NamingColumn.title(), level),
            template: payload.template(RuleType::NamingColumn, SNAKE_CASE)?,
        })
    }
}

impl Rule for ColumnNaming {
    fn name(&self) -> &'static str {
        RuleType::NamingColumn.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[EventTag::ColumnDefinition, EventTag::AlterTableAction]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        let (table, column) = match node {
            Node::Column(column) => (column.table, column.name),
            Node::AlterAction {
                table,
                operation: AlterTableOperation::RenameColumn {
                    new_column_name, ..
                },
            } => (*table, new_column_name),
            _ => return Ok(()),
        };
        let metadata = NamingMetadata::new().with(crate::naming::TABLE_TOKEN, last_ident(table));
        report_name(
            &mut self.base,
            RuleType::NamingColumn,
            AdviceCode::ColumnNamingMismatch,
            &self.template,
            &column.value,
            &metadata,
            ctx.position_of(node),
        );
        Ok(())
    }

    fn base(&self) -> &RuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RuleBase {
        &mut self.base
    }
}

/// Index and unique-key naming share one implementation; `unique` selects
/// which kind of index this instance checks
pub struct IndexNaming {
    base: RuleBase,
    template: NamingTemplate,
    rule: RuleType,
    unique: bool,
}

impl IndexNaming {
    pub fn index(level: Severity, payload: NamingPayload) -> Result<Self, ConfigError> {
        Self::build(RuleType::NamingIndex, false, INDEX_FORMAT, level, payload)
    }

    pub fn unique_key(level: Severity, payload: NamingPayload) -> Result<Self, ConfigError> {
        Self::build(RuleType::NamingUniqueKey, true, UNIQUE_KEY_FORMAT, level, payload)
    }

    fn build(
        rule: RuleType,
        unique: bool,
        default_format: &str,
        level: Severity,
        payload: NamingPayload,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base: RuleBase::new(rule.title(), level),
            template: payload.template(rule, default_format)?,
            rule,
            unique,
        })
    }

    fn code(&self) -> AdviceCode {
        if self.unique {
            AdviceCode::UniqueKeyNamingMismatch
        } else {
            AdviceCode::IndexNamingMismatch
        }
    }

    fn check_index(&mut self, table: &ObjectName, name: &str, columns: &[String], position: Position) {
        let metadata = NamingMetadata::for_index(&last_ident(table), columns);
        let code = self.code();
        report_name(
            &mut self.base,
            self.rule,
            code,
            &self.template,
            name,
            &metadata,
            position,
        );
    }
}

fn ident_values(columns: &[Ident]) -> Vec<String> {
    columns.iter().map(|c| c.value.clone()).collect()
}

impl Rule for IndexNaming {
    fn name(&self) -> &'static str {
        self.rule.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[EventTag::CreateIndex, EventTag::TableConstraint]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        let position = ctx.position_of(node);
        match node {
            Node::Statement(Statement::CreateIndex(index)) if index.unique == self.unique => {
                let Some(name) = &index.name else {
                    return Ok(());
                };
                let columns: Vec<String> = index
                    .columns
                    .iter()
                    .filter_map(|c| index_column_name(&c.expr))
                    .collect();
                self.check_index(&index.table_name, &last_ident(name), &columns, position);
            }
            Node::Constraint { table, constraint } => match constraint {
                TableConstraint::Index { name, columns, .. } if !self.unique => {
                    if let Some(name) = name {
                        self.check_index(table, &name.value, &ident_values(columns), position);
                    }
                }
                TableConstraint::Unique {
                    name,
                    index_name,
                    columns,
                    ..
                } if self.unique => {
                    if let Some(name) = name.as_ref().or(index_name.as_ref()) {
                        self.check_index(table, &name.value, &ident_values(columns), position);
                    }
                }
                _ => {}
            },
            _ => {}
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
    use crate::dialect::SqlDialect;
    use crate::engine::{CheckContext, Reviewer, Rule};
    use pretty_assertions::assert_eq;

    fn check(dialect: SqlDialect, rule: impl Rule + 'static, sql: &str) -> Vec<(usize, String)> {
        Reviewer::new(dialect)
            .check(sql, vec![Box::new(rule)], &CheckContext::new())
            .unwrap()
            .advice
            .into_iter()
            .map(|a| (a.line(), a.message))
            .collect()
    }

    #[test]
    fn test_table_naming() {
        let rule = TableNaming::new(Severity::Warning, NamingPayload::default()).unwrap();
        let advice = check(
            SqlDialect::PostgreSQL,
            rule,
            "CREATE TABLE user_events (id INT);\nCREATE TABLE UserEvents (id INT)",
        );
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].0, 2);
        assert!(advice[0].1.starts_with("`UserEvents` mismatches"));
    }

    #[test]
    fn test_table_rename_and_length() {
        let rule = TableNaming::new(
            Severity::Warning,
            NamingPayload {
                format: None,
                max_length: Some(8),
            },
        )
        .unwrap();
        let advice = check(
            SqlDialect::PostgreSQL,
            rule,
            "ALTER TABLE a RENAME TO very_long_name",
        );
        assert_eq!(
            advice,
            vec![(
                1,
                "`very_long_name` mismatches the naming convention, its length should be within 8 characters"
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_column_naming() {
        let rule = ColumnNaming::new(Severity::Warning, NamingPayload::default()).unwrap();
        let advice = check(
            SqlDialect::MySQL,
            rule,
            "CREATE TABLE t (\n  id INT,\n  firstName TEXT\n);\nALTER TABLE t RENAME COLUMN id TO ID",
        );
        let lines: Vec<usize> = advice.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![3, 5]);
    }

    #[test]
    fn test_index_naming_template() {
        let rule = IndexNaming::index(Severity::Warning, NamingPayload::default()).unwrap();
        let advice = check(
            SqlDialect::PostgreSQL,
            rule,
            "CREATE INDEX idx_orders_customer_id ON orders (customer_id);\n\
             CREATE INDEX ix_orders_customer_id ON orders (customer_id);\n\
             CREATE UNIQUE INDEX whatever ON orders (code)",
        );
        assert_eq!(
            advice,
            vec![(
                2,
                "`ix_orders_customer_id` mismatches the naming convention, expected \"^$|^idx_orders_customer_id$\""
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_unique_key_constraints() {
        let rule = IndexNaming::unique_key(Severity::Warning, NamingPayload::default()).unwrap();
        let advice = check(
            SqlDialect::MySQL,
            rule,
            "CREATE TABLE t (a INT, b INT, UNIQUE KEY uk_t_a_b (a, b), INDEX idx_wrong (a));\n\
             ALTER TABLE t ADD CONSTRAINT bad_name UNIQUE (b)",
        );
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].0, 2);
    }

    #[test]
    fn test_uncompilable_occurrence_is_skipped() {
        let rule = IndexNaming::index(
            Severity::Warning,
            NamingPayload {
                format: Some("^idx_{{table}}$".to_string()),
                max_length: None,
            },
        )
        .unwrap();
        let advice = check(
            SqlDialect::PostgreSQL,
            rule,
            "CREATE INDEX other ON \"we(ird\" (a); CREATE INDEX other ON plain (a)",
        );
        assert_eq!(advice.len(), 1);
    }
}
