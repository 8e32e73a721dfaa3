//! Schema builder - converts DDL files into a Catalog

use sqlparser::ast::{
    AlterTableOperation, ColumnOption, CreateIndex, CreateTable, Expr, ObjectName, ObjectType,
    Statement, TableConstraint,
};

use crate::advice::position;
use crate::dialect::SqlDialect;
use crate::engine::split_statements;
use crate::schema::{Catalog, ColumnDef, IndexDef, QualifiedName, TableDef};
use crate::types::SqlType;

/// Builder for constructing a Catalog from SQL schema definitions
pub struct SchemaBuilder {
    catalog: Catalog,
    dialect: SqlDialect,
    warnings: Vec<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::with_dialect(SqlDialect::default())
    }

    pub fn with_dialect(dialect: SqlDialect) -> Self {
        let default_schema = match dialect.default_schema() {
            "" => "public",
            schema => schema,
        };
        Self {
            catalog: Catalog::with_default_schema(default_schema),
            dialect,
            warnings: Vec::new(),
        }
    }

    /// Parse SQL schema definitions and add them to the catalog
    ///
    /// Statements the parser does not understand (functions, triggers, ...) are
    /// skipped; the number of skipped statements is returned.
    pub fn parse(&mut self, sql: &str) -> usize {
        // Try parsing the entire SQL first (fast path)
        if let Ok(statements) = self.dialect.parse(sql) {
            for stmt in &statements {
                self.process_statement(stmt);
            }
            return 0;
        }

        let mut skipped = 0;
        for source in split_statements(sql, self.dialect) {
            match self.dialect.parse(source.text) {
                Ok(stmts) => {
                    for stmt in &stmts {
                        self.process_statement(stmt);
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        line = position(source.base_line, 1),
                        error = %e,
                        "skipping schema statement"
                    );
                    skipped += 1;
                }
            }
        }
        skipped
    }

    fn process_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::CreateTable(create) => self.process_create_table(create),
            Statement::CreateIndex(index) => self.process_create_index(index),
            Statement::AlterTable {
                name, operations, ..
            } => self.process_alter_table(name, operations),
            Statement::Drop {
                object_type: ObjectType::Table,
                names,
                ..
            } => {
                for name in names {
                    self.catalog
                        .remove_table(&QualifiedName::from_object_name(name));
                }
            }
            _ => {}
        }
    }

    fn process_create_table(&mut self, create: &CreateTable) {
        let mut table = TableDef::new(QualifiedName::from_object_name(&create.name));

        for column in &create.columns {
            let mut col = ColumnDef::new(&column.name.value, SqlType::from_ast(&column.data_type));
            for option in &column.options {
                apply_column_option(&mut table, &mut col, &option.option);
            }
            table.columns.insert(column.name.value.clone(), col);
        }

        for constraint in &create.constraints {
            add_constraint(&mut table, constraint);
        }

        self.catalog.add_table(table);
    }

    fn process_create_index(&mut self, index: &CreateIndex) {
        let table_name = QualifiedName::from_object_name(&index.table_name);
        let Some(table) = self.catalog.get_table_mut(&table_name) else {
            self.warnings.push(format!(
                "CREATE INDEX references table '{}' which was not found in schema",
                table_name
            ));
            return;
        };
        let columns = index
            .columns
            .iter()
            .filter_map(|c| index_column_name(&c.expr))
            .collect();
        let mut def = IndexDef::new(index.name.as_ref().map(|n| n.to_string()), columns);
        if index.unique {
            def = def.unique();
        }
        table.indexes.push(def);
    }

    fn process_alter_table(&mut self, name: &ObjectName, operations: &[AlterTableOperation]) {
        let table_name = QualifiedName::from_object_name(name);

        if !self.catalog.table_exists(&table_name) {
            self.warnings.push(format!(
                "ALTER TABLE references table '{}' which was not found in schema",
                table_name
            ));
            return;
        }

        for operation in operations {
            if let AlterTableOperation::RenameTable {
                table_name: new_name,
            } = operation
            {
                if let Some(mut table) = self.catalog.remove_table(&table_name) {
                    table.name = QualifiedName::from_object_name(new_name);
                    self.catalog.add_table(table);
                }
                return;
            }

            let Some(table) = self.catalog.get_table_mut(&table_name) else {
                return;
            };
            match operation {
                AlterTableOperation::AddColumn { column_def, .. } => {
                    let mut col = ColumnDef::new(
                        &column_def.name.value,
                        SqlType::from_ast(&column_def.data_type),
                    );
                    for option in &column_def.options {
                        apply_column_option(table, &mut col, &option.option);
                    }
                    table.columns.insert(column_def.name.value.clone(), col);
                }
                AlterTableOperation::DropColumn { column_name, .. } => {
                    table.columns.shift_remove(&column_name.value);
                }
                AlterTableOperation::RenameColumn {
                    old_column_name,
                    new_column_name,
                } => {
                    if let Some(mut col) = table.columns.shift_remove(&old_column_name.value) {
                        col.name = new_column_name.value.clone();
                        table.columns.insert(new_column_name.value.clone(), col);
                    }
                }
                AlterTableOperation::ChangeColumn {
                    old_name,
                    new_name,
                    data_type,
                    options,
                    ..
                } => {
                    table.columns.shift_remove(&old_name.value);
                    let mut col = ColumnDef::new(&new_name.value, SqlType::from_ast(data_type));
                    for option in options {
                        apply_column_option(table, &mut col, option);
                    }
                    table.columns.insert(new_name.value.clone(), col);
                }
                AlterTableOperation::ModifyColumn {
                    col_name,
                    data_type,
                    options,
                    ..
                } => {
                    let mut col = ColumnDef::new(&col_name.value, SqlType::from_ast(data_type));
                    for option in options {
                        apply_column_option(table, &mut col, option);
                    }
                    table.columns.insert(col_name.value.clone(), col);
                }
                AlterTableOperation::AddConstraint(constraint) => {
                    add_constraint(table, constraint);
                }
                _ => {}
            }
        }
    }

    /// Consume the builder and return the catalog with any warnings
    pub fn build(self) -> (Catalog, Vec<String>) {
        (self.catalog, self.warnings)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_column_option(table: &mut TableDef, col: &mut ColumnDef, option: &ColumnOption) {
    match option {
        ColumnOption::Null => col.nullable = true,
        ColumnOption::NotNull => col.nullable = false,
        ColumnOption::Default(expr) => col.default = Some(expr.to_string()),
        ColumnOption::Unique { is_primary, .. } => {
            let columns = vec![col.name.clone()];
            if *is_primary {
                col.nullable = false;
                table.indexes.push(IndexDef::new(None, columns).primary());
            } else {
                table.indexes.push(IndexDef::new(None, columns).unique());
            }
        }
        _ => {}
    }
}

fn add_constraint(table: &mut TableDef, constraint: &TableConstraint) {
    let ident_names = |columns: &[sqlparser::ast::Ident]| -> Vec<String> {
        columns.iter().map(|c| c.value.clone()).collect()
    };
    match constraint {
        TableConstraint::PrimaryKey { name, columns, .. } => {
            let columns = ident_names(columns);
            for col_name in &columns {
                if let Some(col) = table.columns.get_mut(col_name) {
                    col.nullable = false;
                }
            }
            let name = name.as_ref().map(|n| n.value.clone());
            table.indexes.push(IndexDef::new(name, columns).primary());
        }
        TableConstraint::Unique {
            name,
            index_name,
            columns,
            ..
        } => {
            let name = index_name.as_ref().or(name.as_ref()).map(|n| n.value.clone());
            table
                .indexes
                .push(IndexDef::new(name, ident_names(columns)).unique());
        }
        TableConstraint::Index { name, columns, .. } => {
            let name = name.as_ref().map(|n| n.value.clone());
            table.indexes.push(IndexDef::new(name, ident_names(columns)));
        }
        _ => {}
    }
}

/// Column name of an index key expression, when it is a plain column
pub(crate) fn index_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.clone()),
        Expr::CompoundIdentifier(idents) => idents.last().map(|i| i.value.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_table() {
        let sql = r#"
            CREATE TABLE users (
                id SERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                email TEXT UNIQUE,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
        "#;

        let mut builder = SchemaBuilder::new();
        assert_eq!(builder.parse(sql), 0);
        let (catalog, _) = builder.build();

        let table = catalog.get_table(&QualifiedName::new("users")).unwrap();
        assert_eq!(table.columns.len(), 4);

        let id_col = table.get_column("id").unwrap();
        assert!(!id_col.nullable);
        assert_eq!(id_col.data_type, SqlType::Integer);
        assert_eq!(table.primary_key().unwrap().columns, vec!["id"]);

        let created = table.get_column("created_at").unwrap();
        assert!(created.default.is_some());

        assert_eq!(table.indexes.len(), 2);
    }

    #[test]
    fn test_create_index_and_alter() {
        let sql = r#"
            CREATE TABLE orders (id BIGINT, customer_id BIGINT);
            CREATE INDEX idx_orders_customer_id ON orders (customer_id);
            ALTER TABLE orders ADD COLUMN note TEXT;
            ALTER TABLE orders RENAME COLUMN note TO remark;
        "#;

        let mut builder = SchemaBuilder::new();
        builder.parse(sql);
        let (catalog, warnings) = builder.build();
        assert!(warnings.is_empty(), "{:?}", warnings);

        let orders = QualifiedName::new("orders");
        let indexes = catalog.indexes(&orders).unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name.as_deref(), Some("idx_orders_customer_id"));
        assert_eq!(indexes[0].columns, vec!["customer_id"]);

        assert_eq!(catalog.column_type(&orders, "remark"), Some(&SqlType::Text));
        assert_eq!(catalog.column_type(&orders, "note"), None);
    }

    #[test]
    fn test_drop_table_removes_it() {
        let mut builder = SchemaBuilder::new();
        builder.parse("CREATE TABLE t (id INT); DROP TABLE t;");
        let (catalog, _) = builder.build();
        assert!(!catalog.table_exists(&QualifiedName::new("t")));
    }

    #[test]
    fn test_parse_with_functions_and_triggers() {
        let sql = r#"
            CREATE TABLE users (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE FUNCTION update_timestamp() RETURNS TRIGGER AS $$
            BEGIN
                NEW.updated_at = NOW();
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql;

            CREATE TABLE posts (
                id SERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                user_id INTEGER NOT NULL
            );
        "#;

        let mut builder = SchemaBuilder::new();
        builder.parse(sql);
        let (catalog, _) = builder.build();

        assert!(catalog.table_exists(&QualifiedName::new("users")));
        assert!(catalog.table_exists(&QualifiedName::new("posts")));
    }

    #[test]
    fn test_alter_unknown_table_warns() {
        let mut builder = SchemaBuilder::new();
        builder.parse("ALTER TABLE ghost ADD COLUMN x INT;");
        let (_, warnings) = builder.build();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ghost"));
    }
}
