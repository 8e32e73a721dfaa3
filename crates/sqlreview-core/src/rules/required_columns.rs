//! `column.required`: every table must end up with the configured columns
//!
//! The rule follows each table across the script. A table becomes tracked
//! when the script creates it, or lazily when an ALTER touches one of the
//! required columns; tables the script never touches that way are assumed
//! compliant. So are tables created from a query or copied from another
//! table, whose columns the script does not spell out. Missing columns are
//! reported once per table after the last statement, so adding a column back
//! later in the script clears the finding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlparser::ast::{AlterTableOperation, ObjectName, ObjectType, Statement};

use crate::advice::{AdviceCode, Position, Severity};
use crate::engine::{EventTag, Node, Rule, RuleBase, WalkContext};
use crate::error::{ConfigError, RuleError};
use crate::schema::{Catalog, QualifiedName};

use super::RuleType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredColumnsPayload {
    pub list: Vec<String>,
}

impl Default for RequiredColumnsPayload {
    fn default() -> Self {
        Self {
            list: vec![
                "id".to_string(),
                "created_at".to_string(),
                "updated_at".to_string(),
            ],
        }
    }
}

#[derive(Debug)]
struct TrackedTable {
    /// Table name as last written in the script
    name: String,
    /// Folded required column -> present
    columns: BTreeMap<String, bool>,
    /// Where a missing column is reported
    position: Position,
}

pub struct RequiredColumns {
    base: RuleBase,
    /// Configured names, keyed by their folded form
    required: BTreeMap<String, String>,
    /// Folded table name -> tracking state
    tables: BTreeMap<String, TrackedTable>,
    /// Position of the ALTER TABLE statement being walked
    statement_position: Position,
}

impl RequiredColumns {
    pub fn new(level: Severity, payload: RequiredColumnsPayload) -> Result<Self, ConfigError> {
        let required: BTreeMap<String, String> = payload
            .list
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .map(|c| (fold(&c), c))
            .collect();
        if required.is_empty() {
            return Err(ConfigError::MissingValue {
                rule: RuleType::ColumnRequired.as_str(),
                field: "list",
            });
        }
        Ok(Self {
            base: RuleBase::new(RuleType::ColumnRequired.title(), level),
            required,
            tables: BTreeMap::new(),
            statement_position: Position::at(0, 1),
        })
    }

    fn is_required(&self, column: &str) -> bool {
        self.required.contains_key(&fold(column))
    }

    /// Tracking state of a table, assuming it was compliant before this statement
    fn tracked(&mut self, table: &ObjectName) -> &mut TrackedTable {
        let name = table_name(table);
        let position = self.statement_position;
        let required = &self.required;
        self.tables
            .entry(fold(&name))
            .or_insert_with(|| TrackedTable {
                name,
                columns: required.keys().map(|c| (c.clone(), true)).collect(),
                position,
            })
    }

    fn set_present(&mut self, table: &ObjectName, column: &str, present: bool) {
        if !self.is_required(column) {
            return;
        }
        let position = self.statement_position;
        let entry = self.tracked(table);
        entry.columns.insert(fold(column), present);
        if !present {
            entry.position = position;
        }
    }

    fn rename_column(&mut self, table: &ObjectName, old: &str, new: &str) {
        if !self.is_required(old) && !self.is_required(new) {
            return;
        }
        self.tracked(table);
        self.set_present(table, old, false);
        self.set_present(table, new, true);
    }

    fn rename_table(&mut self, from: &ObjectName, to: &ObjectName) {
        if let Some(mut entry) = self.tables.remove(&fold(&table_name(from))) {
            entry.name = table_name(to);
            self.tables.insert(fold(&entry.name), entry);
        }
    }
}

impl Rule for RequiredColumns {
    fn name(&self) -> &'static str {
        RuleType::ColumnRequired.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[
            EventTag::CreateTable,
            EventTag::AlterTable,
            EventTag::AlterTableAction,
            EventTag::DropTable,
        ]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        match node {
            Node::Statement(Statement::CreateTable(create)) => {
                let name = table_name(&create.name);
                // AS SELECT, LIKE and CLONE take their columns from elsewhere
                if create.query.is_some() || create.like.is_some() || create.clone.is_some() {
                    self.tables.remove(&fold(&name));
                    return Ok(());
                }
                let mut columns: BTreeMap<String, bool> =
                    self.required.keys().map(|c| (c.clone(), false)).collect();
                for column in &create.columns {
                    if let Some(present) = columns.get_mut(&fold(&column.name.value)) {
                        *present = true;
                    }
                }
                self.tables.insert(
                    fold(&name),
                    TrackedTable {
                        name,
                        columns,
                        position: ctx.position_of(node),
                    },
                );
            }
            Node::Statement(Statement::Drop {
                object_type: ObjectType::Table,
                names,
                ..
            }) => {
                for name in names {
                    self.tables.remove(&fold(&table_name(name)));
                }
            }
            Node::Statement(Statement::AlterTable { .. }) => {
                self.statement_position = ctx.position_of(node);
            }
            Node::AlterAction { table, operation } => match operation {
                AlterTableOperation::AddColumn { column_def, .. } => {
                    self.set_present(table, &column_def.name.value, true);
                }
                AlterTableOperation::DropColumn { column_name, .. } => {
                    self.set_present(table, &column_name.value, false);
                }
                AlterTableOperation::RenameColumn {
                    old_column_name,
                    new_column_name,
                } => {
                    self.rename_column(table, &old_column_name.value, &new_column_name.value);
                }
                AlterTableOperation::ChangeColumn {
                    old_name, new_name, ..
                } => {
                    self.rename_column(table, &old_name.value, &new_name.value);
                }
                AlterTableOperation::RenameTable { table_name } => {
                    self.rename_table(table, table_name);
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn finalize(&mut self, _catalog: Option<&Catalog>) -> Result<(), RuleError> {
        let tables = std::mem::take(&mut self.tables);
        for entry in tables.values() {
            let mut missing: Vec<&str> = entry
                .columns
                .iter()
                .filter(|(_, present)| !**present)
                .filter_map(|(column, _)| self.required.get(column).map(String::as_str))
                .collect();
            if missing.is_empty() {
                continue;
            }
            missing.sort_unstable();
            let message = format!(
                "Table `{}` requires columns: {}",
                entry.name,
                missing.join(", ")
            );
            self.base
                .report_at(AdviceCode::NoRequiredColumn, message, entry.position);
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

fn table_name(name: &ObjectName) -> String {
    QualifiedName::from_object_name(name).name
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlDialect;
    use crate::engine::{CheckContext, Reviewer};
    use pretty_assertions::assert_eq;

    fn check(sql: &str) -> Vec<(usize, String)> {
        let rule = RequiredColumns::new(
            Severity::Warning,
            RequiredColumnsPayload {
                list: vec!["id".to_string(), "created_at".to_string()],
            },
        )
        .unwrap();
        Reviewer::new(SqlDialect::MySQL)
            .check(sql, vec![Box::new(rule)], &CheckContext::new())
            .unwrap()
            .advice
            .into_iter()
            .map(|a| (a.line(), a.message))
            .collect()
    }

    #[test]
    fn test_all_required_present() {
        assert!(check("CREATE TABLE t (id INT, created_at TIMESTAMP)").is_empty());
    }

    #[test]
    fn test_missing_column_reported_at_create() {
        let advice = check("SELECT 1;\n\nCREATE TABLE t (\n  id INT\n)");
        assert_eq!(
            advice,
            vec![(3, "Table `t` requires columns: created_at".to_string())]
        );
    }

    #[test]
    fn test_add_then_drop_equals_never_added() {
        let never = check("CREATE TABLE t (id INT)");
        let added_dropped = check(
            "CREATE TABLE t (id INT);\nALTER TABLE t ADD COLUMN created_at TIMESTAMP;\nALTER TABLE t DROP COLUMN created_at",
        );
        assert_eq!(never.len(), 1);
        assert_eq!(added_dropped.len(), 1);
        assert_eq!(never[0].1, added_dropped[0].1);
        // The drop moves the report to the dropping statement
        assert_eq!(added_dropped[0].0, 3);
    }

    #[test]
    fn test_derived_tables_are_untracked() {
        assert!(check("CREATE TABLE t AS SELECT id, created_at FROM s").is_empty());
        assert!(check("CREATE TABLE t LIKE s").is_empty());
        // Replacing a tracked table with a derived one drops the earlier finding
        assert!(check("CREATE TABLE t (name TEXT);\nCREATE TABLE t AS SELECT 1 AS id").is_empty());
    }

    #[test]
    fn test_create_then_drop_is_clean() {
        assert!(check("CREATE TABLE t (name TEXT); DROP TABLE t").is_empty());
    }

    #[test]
    fn test_added_later_in_script() {
        let sql = "CREATE TABLE t (id INT); ALTER TABLE t ADD COLUMN created_at TIMESTAMP";
        assert!(check(sql).is_empty());
    }

    #[test]
    fn test_untracked_table_drop_is_reported() {
        let advice = check("ALTER TABLE legacy DROP COLUMN id");
        assert_eq!(
            advice,
            vec![(1, "Table `legacy` requires columns: id".to_string())]
        );
    }

    #[test]
    fn test_untracked_unrelated_alter_is_ignored() {
        assert!(check("ALTER TABLE legacy ADD COLUMN note TEXT").is_empty());
    }

    #[test]
    fn test_rename_column() {
        let advice = check("CREATE TABLE t (id INT, created_at INT); ALTER TABLE t RENAME COLUMN created_at TO created");
        assert_eq!(advice.len(), 1);
        assert!(advice[0].1.ends_with("created_at"));

        let fixed = check("CREATE TABLE t (id INT, created INT); ALTER TABLE t CHANGE COLUMN created created_at TIMESTAMP");
        assert!(fixed.is_empty());
    }

    #[test]
    fn test_tables_reported_in_name_order() {
        let advice = check("CREATE TABLE zeta (id INT); CREATE TABLE alpha (created_at INT)");
        let messages: Vec<&str> = advice.iter().map(|(_, m)| m.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Table `alpha` requires columns: id",
                "Table `zeta` requires columns: created_at",
            ]
        );
    }

    #[test]
    fn test_renamed_table_keeps_state() {
        let advice = check("CREATE TABLE a (id INT); ALTER TABLE a RENAME TO b");
        assert_eq!(advice.len(), 1);
        assert!(advice[0].1.starts_with("Table `b`"));
    }

    #[test]
    fn test_empty_list_is_config_error() {
        let err = RequiredColumns::new(
            Severity::Warning,
            RequiredColumnsPayload { list: vec![] },
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::MissingValue { .. }));
    }
}
