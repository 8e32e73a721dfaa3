//! `index.total-number-limit`
//!
//! Counts indexes per table across the script. A table the script creates
//! starts from its own definition; any other table starts from the catalog
//! the first time the script changes its indexes. ALTER TABLE ... DROP
//! PRIMARY KEY lowers the count, and so does DROP CONSTRAINT when it names a
//! known index. DROP INDEX names no table and is not counted.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlparser::ast::{
    AlterTableOperation, ColumnOption, ObjectName, ObjectType, Statement, TableConstraint,
};

use crate::advice::{AdviceCode, Position, Severity};
use crate::engine::{ColumnNode, EventTag, Node, Rule, RuleBase, WalkContext};
use crate::error::RuleError;
use crate::schema::{Catalog, QualifiedName};

use super::RuleType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCountPayload {
    pub number: usize,
}

impl Default for IndexCountPayload {
    fn default() -> Self {
        Self { number: 5 }
    }
}

#[derive(Debug)]
struct TableIndexes {
    name: String,
    count: usize,
    /// Folded names of indexes known to exist
    names: HashSet<String>,
    /// Statement that last added an index
    position: Position,
}

pub struct IndexTotalNumberLimit {
    base: RuleBase,
    limit: usize,
    tables: BTreeMap<String, TableIndexes>,
    /// Tables dropped by the script; their catalog indexes are gone
    dropped: HashSet<String>,
}

impl IndexTotalNumberLimit {
    pub fn new(level: Severity, payload: IndexCountPayload) -> Self {
        Self {
            base: RuleBase::new(RuleType::IndexTotalNumberLimit.title(), level),
            limit: payload.number,
            tables: BTreeMap::new(),
            dropped: HashSet::new(),
        }
    }

    /// State of a table, seeded from the catalog on first touch
    fn tracked(
        &mut self,
        table: &ObjectName,
        ctx: &WalkContext<'_>,
        position: Position,
    ) -> &mut TableIndexes {
        let name = QualifiedName::from_object_name(table);
        let key = name.name.to_ascii_lowercase();
        let known = if self.dropped.contains(&key) {
            None
        } else {
            ctx.catalog.and_then(|catalog| catalog.indexes(&name))
        };
        self.tables.entry(key).or_insert_with(|| TableIndexes {
            count: known.map_or(0, |indexes| indexes.len()),
            names: known
                .into_iter()
                .flatten()
                .filter_map(|index| index.name.as_deref())
                .map(str::to_ascii_lowercase)
                .collect(),
            name: name.name.clone(),
            position,
        })
    }

    fn add(
        &mut self,
        table: &ObjectName,
        added: usize,
        index_name: Option<&str>,
        ctx: &WalkContext<'_>,
        position: Position,
    ) {
        let entry = self.tracked(table, ctx, position);
        entry.count += added;
        entry.position = position;
        if let Some(index_name) = index_name {
            entry.names.insert(index_name.to_ascii_lowercase());
        }
    }
}

fn column_key_count(column: &ColumnNode<'_>) -> usize {
    column
        .options()
        .iter()
        .filter(|o| matches!(o, ColumnOption::Unique { .. }))
        .count()
}

/// Folded names a key constraint can be dropped by
fn constraint_names(constraint: &TableConstraint) -> Vec<String> {
    let names = match constraint {
        TableConstraint::PrimaryKey {
            name, index_name, ..
        }
        | TableConstraint::Unique {
            name, index_name, ..
        } => vec![name.as_ref(), index_name.as_ref()],
        TableConstraint::Index { name, .. } => vec![name.as_ref()],
        _ => Vec::new(),
    };
    names
        .into_iter()
        .flatten()
        .map(|ident| ident.value.to_ascii_lowercase())
        .collect()
}

fn is_index_constraint(constraint: &TableConstraint) -> bool {
    matches!(
        constraint,
        TableConstraint::PrimaryKey { .. }
            | TableConstraint::Unique { .. }
            | TableConstraint::Index { .. }
    )
}

impl Rule for IndexTotalNumberLimit {
    fn name(&self) -> &'static str {
        RuleType::IndexTotalNumberLimit.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[
            EventTag::CreateTable,
            EventTag::CreateIndex,
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
        let position = ctx.position_of(node);
        match node {
            Node::Statement(Statement::CreateTable(create)) => {
                let inline: usize = create
                    .columns
                    .iter()
                    .map(|c| column_key_count(&ColumnNode::from_def(&create.name, c)))
                    .sum();
                let constraints = create
                    .constraints
                    .iter()
                    .filter(|c| is_index_constraint(c))
                    .count();
                let names = create.constraints.iter().flat_map(constraint_names).collect();
                let name = QualifiedName::from_object_name(&create.name).name;
                self.tables.insert(
                    name.to_ascii_lowercase(),
                    TableIndexes {
                        name,
                        count: inline + constraints,
                        names,
                        position,
                    },
                );
            }
            Node::Statement(Statement::CreateIndex(index)) => {
                let index_name = index
                    .name
                    .as_ref()
                    .and_then(|name| name.0.last())
                    .map(|ident| ident.value.as_str());
                self.add(&index.table_name, 1, index_name, ctx, position);
            }
            Node::Statement(Statement::Drop {
                object_type: ObjectType::Table,
                names,
                ..
            }) => {
                for name in names {
                    let key = QualifiedName::from_object_name(name)
                        .name
                        .to_ascii_lowercase();
                    self.tables.remove(&key);
                    self.dropped.insert(key);
                }
            }
            Node::AlterAction { table, operation } => match operation {
                AlterTableOperation::AddConstraint(constraint) if is_index_constraint(constraint) => {
                    self.add(table, 1, None, ctx, position);
                    let entry = self.tracked(table, ctx, position);
                    entry.names.extend(constraint_names(constraint));
                }
                AlterTableOperation::AddColumn { column_def, .. } => {
                    let added = column_key_count(&ColumnNode::from_def(table, column_def));
                    if added > 0 {
                        self.add(table, added, None, ctx, position);
                    }
                }
                AlterTableOperation::DropPrimaryKey => {
                    let entry = self.tracked(table, ctx, position);
                    entry.count = entry.count.saturating_sub(1);
                }
                AlterTableOperation::DropConstraint { name, .. } => {
                    let entry = self.tracked(table, ctx, position);
                    // Foreign keys and checks are constraints too, but not indexes
                    if entry.names.remove(&name.value.to_ascii_lowercase()) {
                        entry.count = entry.count.saturating_sub(1);
                    }
                }
                AlterTableOperation::RenameTable { table_name } => {
                    let from = QualifiedName::from_object_name(table)
                        .name
                        .to_ascii_lowercase();
                    if let Some(mut entry) = self.tables.remove(&from) {
                        entry.name = QualifiedName::from_object_name(table_name).name;
                        self.tables.insert(entry.name.to_ascii_lowercase(), entry);
                    }
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    fn finalize(&mut self, _catalog: Option<&Catalog>) -> Result<(), RuleError> {
        let limit = self.limit;
        for entry in self.tables.values().filter(|t| t.count > limit) {
            let message = format!(
                "The count of index in table `{}` should be no more than {}, but found {}",
                entry.name, limit, entry.count
            );
            self.base
                .report_at(AdviceCode::IndexCountExceedsLimit, message, entry.position);
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
    use crate::engine::{CheckContext, Reviewer};
    use crate::schema::SchemaBuilder;

    fn check(limit: usize, catalog: Option<&Catalog>, sql: &str) -> Vec<(usize, String)> {
        let rule = IndexTotalNumberLimit::new(Severity::Warning, IndexCountPayload { number: limit });
        let mut reviewer = Reviewer::new(SqlDialect::MySQL);
        if let Some(catalog) = catalog {
            reviewer = reviewer.with_catalog(catalog);
        }
        reviewer
            .check(sql, vec![Box::new(rule)], &CheckContext::new())
            .unwrap()
            .advice
            .into_iter()
            .map(|a| (a.line(), a.message))
            .collect()
    }

    #[test]
    fn test_counts_create_table_definition() {
        let sql = "CREATE TABLE t (id INT PRIMARY KEY, a INT UNIQUE, b INT, INDEX idx_b (b))";
        assert!(check(3, None, sql).is_empty());
        assert_eq!(
            check(2, None, sql),
            vec![(
                1,
                "The count of index in table `t` should be no more than 2, but found 3".to_string()
            )]
        );
    }

    #[test]
    fn test_later_indexes_accumulate() {
        let advice = check(
            1,
            None,
            "CREATE TABLE t (id INT PRIMARY KEY, a INT);\nCREATE INDEX idx_a ON t (a)",
        );
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].0, 2);
    }

    #[test]
    fn test_starts_from_catalog() {
        let mut builder = SchemaBuilder::with_dialect(SqlDialect::MySQL);
        builder.parse("CREATE TABLE t (id INT PRIMARY KEY, a INT, INDEX idx_a (a))");
        let (catalog, _) = builder.build();

        let advice = check(2, Some(&catalog), "ALTER TABLE t ADD INDEX idx_id_a (id, a)");
        assert_eq!(advice.len(), 1);
        assert!(advice[0].1.ends_with("found 3"));
    }

    #[test]
    fn test_replacing_primary_key_keeps_count() {
        let mut builder = SchemaBuilder::with_dialect(SqlDialect::MySQL);
        builder.parse("CREATE TABLE t (id INT PRIMARY KEY, a INT, UNIQUE KEY uk_a (a))");
        let (catalog, _) = builder.build();

        let sql = "ALTER TABLE t DROP PRIMARY KEY, ADD PRIMARY KEY (a)";
        assert!(check(2, Some(&catalog), sql).is_empty());
        assert_eq!(check(1, Some(&catalog), sql).len(), 1);
    }

    #[test]
    fn test_drop_constraint_counts_only_known_indexes() {
        let mut builder = SchemaBuilder::with_dialect(SqlDialect::MySQL);
        builder.parse("CREATE TABLE t (id INT PRIMARY KEY, a INT, UNIQUE KEY uk_a (a))");
        let (catalog, _) = builder.build();

        let replaced = "ALTER TABLE t DROP CONSTRAINT uk_a, ADD CONSTRAINT uk_a_id UNIQUE (a, id)";
        assert!(check(2, Some(&catalog), replaced).is_empty());

        // The dropped constraint is not an index, so the new one is extra
        let advice = check(
            2,
            Some(&catalog),
            "ALTER TABLE t DROP CONSTRAINT fk_owner;\nCREATE INDEX idx_id_a ON t (id, a)",
        );
        assert_eq!(advice.len(), 1);
        assert!(advice[0].1.ends_with("found 3"));
        assert_eq!(advice[0].0, 2);
    }

    #[test]
    fn test_script_named_index_can_be_dropped() {
        let sql = "CREATE TABLE t (id INT, a INT, CONSTRAINT pk PRIMARY KEY (id));\nALTER TABLE t ADD CONSTRAINT uk_a UNIQUE (a);\nALTER TABLE t DROP CONSTRAINT uk_a";
        assert!(check(1, None, sql).is_empty());
    }

    #[test]
    fn test_dropped_table_ignores_catalog() {
        let mut builder = SchemaBuilder::with_dialect(SqlDialect::MySQL);
        builder.parse("CREATE TABLE t (id INT PRIMARY KEY, a INT, INDEX idx_a (a))");
        let (catalog, _) = builder.build();

        let advice = check(1, Some(&catalog), "DROP TABLE t; CREATE INDEX idx_a ON t (a)");
        assert!(advice.is_empty());
    }
}
