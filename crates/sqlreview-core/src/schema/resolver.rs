//! Two-tier column type resolution
//!
//! Columns defined earlier in the reviewed script take precedence over the
//! persisted catalog. The overlay remembers removals too, so a column that
//! the script dropped never falls back to a stale catalog entry, and tables
//! the script created or dropped are not looked up in the catalog at all.

use std::collections::{HashMap, HashSet};

use sqlparser::ast::{
    AlterColumnOperation, AlterTableOperation, ObjectName, ObjectType, Statement,
};

use super::catalog::{Catalog, QualifiedName};
use crate::types::SqlType;

/// Column types introduced or removed by the script so far
///
/// Keys are ASCII-lowercased table and column names. Schema qualifiers are
/// not part of the key.
#[derive(Debug, Clone, Default)]
pub struct ColumnTypeOverlay {
    /// table -> column -> normalized type, `None` for a removed column
    tables: HashMap<String, HashMap<String, Option<String>>>,
    /// Tables whose catalog definition no longer applies
    shadowed: HashSet<String>,
    /// Renamed table -> its name in the catalog
    catalog_names: HashMap<String, QualifiedName>,
}

impl ColumnTypeOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, table: &str, column: &str, data_type: impl Into<String>) {
        self.tables
            .entry(fold(table))
            .or_default()
            .insert(fold(column), Some(data_type.into()));
    }

    /// Record that a column no longer exists
    pub fn remove(&mut self, table: &str, column: &str) {
        self.tables
            .entry(fold(table))
            .or_default()
            .insert(fold(column), None);
    }

    /// Overlay entry for a column: `Some(Some(ty))` defined, `Some(None)`
    /// removed, `None` when the script never touched it
    pub fn entry(&self, table: &str, column: &str) -> Option<Option<&str>> {
        self.tables
            .get(&fold(table))?
            .get(&fold(column))
            .map(|ty| ty.as_deref())
    }

    /// Forget every column of a table and stop consulting the catalog for it
    pub fn shadow(&mut self, table: &str) {
        let key = fold(table);
        self.tables.remove(&key);
        self.catalog_names.remove(&key);
        self.shadowed.insert(key);
    }

    pub fn is_shadowed(&self, table: &str) -> bool {
        self.shadowed.contains(&fold(table))
    }

    /// Move a table's entries to its new name
    pub fn rename_table(&mut self, from: &QualifiedName, to: &str) {
        let from_key = fold(&from.name);
        let to_key = fold(to);
        if from_key == to_key {
            return;
        }

        let columns = self.tables.remove(&from_key);
        let catalog_name = self.catalog_names.remove(&from_key);
        let was_shadowed = self.shadowed.contains(&from_key);
        self.shadow(&from_key);

        self.shadowed.remove(&to_key);
        if let Some(columns) = columns {
            self.tables.insert(to_key.clone(), columns);
        }
        if was_shadowed {
            self.shadowed.insert(to_key);
        } else {
            self.catalog_names
                .insert(to_key, catalog_name.unwrap_or_else(|| from.clone()));
        }
    }

    /// Name under which the catalog knows a table, if it may be consulted
    fn catalog_name(&self, table: &QualifiedName) -> Option<QualifiedName> {
        let key = fold(&table.name);
        if self.shadowed.contains(&key) {
            return None;
        }
        Some(
            self.catalog_names
                .get(&key)
                .cloned()
                .unwrap_or_else(|| table.clone()),
        )
    }
}

/// Resolves column types script-first, catalog second
#[derive(Debug, Clone, Default)]
pub struct ColumnTypeResolver {
    overlay: ColumnTypeOverlay,
}

impl ColumnTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlay(&self) -> &ColumnTypeOverlay {
        &self.overlay
    }

    /// Normalized type of `table.column`, or `None` when it cannot be determined
    pub fn resolve(
        &self,
        catalog: Option<&Catalog>,
        table: &QualifiedName,
        column: &str,
    ) -> Option<String> {
        if let Some(entry) = self.overlay.entry(&table.name, column) {
            return entry.map(str::to_string);
        }
        let catalog_name = self.overlay.catalog_name(table)?;
        catalog?
            .column_type(&catalog_name, column)
            .map(SqlType::display_name)
    }

    pub fn resolve_object(
        &self,
        catalog: Option<&Catalog>,
        table: &ObjectName,
        column: &str,
    ) -> Option<String> {
        self.resolve(catalog, &QualifiedName::from_object_name(table), column)
    }

    /// Apply the schema effect of a statement to the overlay
    pub fn observe(&mut self, catalog: Option<&Catalog>, stmt: &Statement) {
        match stmt {
            Statement::CreateTable(create) => {
                let table = QualifiedName::from_object_name(&create.name);
                self.overlay.shadow(&table.name);
                for column in &create.columns {
                    let ty = SqlType::from_ast(&column.data_type).display_name();
                    self.overlay.define(&table.name, &column.name.value, ty);
                }
            }
            Statement::AlterTable {
                name, operations, ..
            } => {
                let mut table = QualifiedName::from_object_name(name);
                for operation in operations {
                    self.observe_alter(catalog, &mut table, operation);
                }
            }
            Statement::Drop {
                object_type: ObjectType::Table,
                names,
                ..
            } => {
                for name in names {
                    self.overlay
                        .shadow(&QualifiedName::from_object_name(name).name);
                }
            }
            _ => {}
        }
    }

    fn observe_alter(
        &mut self,
        catalog: Option<&Catalog>,
        table: &mut QualifiedName,
        operation: &AlterTableOperation,
    ) {
        match operation {
            AlterTableOperation::AddColumn { column_def, .. } => {
                let ty = SqlType::from_ast(&column_def.data_type).display_name();
                self.overlay.define(&table.name, &column_def.name.value, ty);
            }
            AlterTableOperation::ModifyColumn {
                col_name,
                data_type,
                ..
            } => {
                let ty = SqlType::from_ast(data_type).display_name();
                self.overlay.define(&table.name, &col_name.value, ty);
            }
            AlterTableOperation::AlterColumn {
                column_name,
                op: AlterColumnOperation::SetDataType { data_type, .. },
            } => {
                let ty = SqlType::from_ast(data_type).display_name();
                self.overlay.define(&table.name, &column_name.value, ty);
            }
            AlterTableOperation::DropColumn { column_name, .. } => {
                self.overlay.remove(&table.name, &column_name.value);
            }
            AlterTableOperation::RenameColumn {
                old_column_name,
                new_column_name,
            } => {
                let ty = self.resolve(catalog, table, &old_column_name.value);
                self.overlay.remove(&table.name, &old_column_name.value);
                match ty {
                    Some(ty) => self.overlay.define(&table.name, &new_column_name.value, ty),
                    None => self.overlay.remove(&table.name, &new_column_name.value),
                }
            }
            AlterTableOperation::ChangeColumn {
                old_name,
                new_name,
                data_type,
                ..
            } => {
                self.overlay.remove(&table.name, &old_name.value);
                let ty = SqlType::from_ast(data_type).display_name();
                self.overlay.define(&table.name, &new_name.value, ty);
            }
            AlterTableOperation::RenameTable { table_name } => {
                let renamed = QualifiedName::from_object_name(table_name);
                self.overlay.rename_table(table, &renamed.name);
                *table = renamed;
            }
            _ => {}
        }
    }
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}
