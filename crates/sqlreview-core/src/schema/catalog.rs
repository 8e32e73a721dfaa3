//! Schema catalog - the persisted schema consulted when a script does not define a column itself

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlparser::ast::ObjectName;

use crate::types::SqlType;

/// Schema catalog - holds all table information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Schema name -> Schema
    pub schemas: IndexMap<String, Schema>,
    /// Default schema name (e.g., "public" for PostgreSQL)
    pub default_schema: String,
    /// Whether table and column names are matched case-sensitively
    pub case_sensitive: bool,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_default_schema("public")
    }

    /// Create an empty catalog whose unqualified names live in `default_schema`
    pub fn with_default_schema(default_schema: impl Into<String>) -> Self {
        let default_schema = default_schema.into();
        let mut schemas = IndexMap::new();
        schemas.insert(default_schema.clone(), Schema::new(&default_schema));
        Self {
            schemas,
            default_schema,
            case_sensitive: false,
        }
    }

    /// Match names exactly instead of ignoring ASCII case
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Get or create a schema
    pub fn get_or_create_schema(&mut self, name: &str) -> &mut Schema {
        self.schemas
            .entry(name.to_string())
            .or_insert_with(|| Schema::new(name))
    }

    /// Add a table to the catalog, replacing any previous definition
    pub fn add_table(&mut self, table: TableDef) {
        let schema_name = self.schema_name(&table.name).to_string();
        let schema = self.get_or_create_schema(&schema_name);
        schema.tables.insert(table.name.name.clone(), table);
    }

    /// Look up a table by name
    pub fn get_table(&self, name: &QualifiedName) -> Option<&TableDef> {
        let schema = self.schemas.get(self.schema_name(name))?;
        if let Some(table) = schema.tables.get(&name.name) {
            return Some(table);
        }
        if self.case_sensitive {
            return None;
        }
        schema
            .tables
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name.name))
            .map(|(_, v)| v)
    }

    /// Look up a table by name (mutable)
    pub fn get_table_mut(&mut self, name: &QualifiedName) -> Option<&mut TableDef> {
        let case_sensitive = self.case_sensitive;
        let schema_name = self.schema_name(name).to_string();
        let schema = self.schemas.get_mut(&schema_name)?;
        let key = schema
            .tables
            .keys()
            .find(|k| names_match(k, &name.name, case_sensitive))?
            .clone();
        schema.tables.get_mut(&key)
    }

    /// Remove a table from the catalog
    pub fn remove_table(&mut self, name: &QualifiedName) -> Option<TableDef> {
        let case_sensitive = self.case_sensitive;
        let schema_name = self.schema_name(name).to_string();
        let schema = self.schemas.get_mut(&schema_name)?;
        let key = schema
            .tables
            .keys()
            .find(|k| names_match(k, &name.name, case_sensitive))?
            .clone();
        schema.tables.shift_remove(&key)
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &QualifiedName) -> bool {
        self.get_table(name).is_some()
    }

    /// Declared type of `table.column`
    pub fn column_type(&self, table: &QualifiedName, column: &str) -> Option<&SqlType> {
        let table = self.get_table(table)?;
        table
            .columns
            .iter()
            .find(|(k, _)| names_match(k, column, self.case_sensitive))
            .map(|(_, c)| &c.data_type)
    }

    /// Indexes (including primary and unique keys) defined on a table
    pub fn indexes(&self, table: &QualifiedName) -> Option<&[IndexDef]> {
        self.get_table(table).map(|t| t.indexes.as_slice())
    }

    fn schema_name<'a>(&'a self, name: &'a QualifiedName) -> &'a str {
        name.schema.as_deref().unwrap_or(&self.default_schema)
    }
}

fn names_match(stored: &str, wanted: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        stored == wanted
    } else {
        stored.eq_ignore_ascii_case(wanted)
    }
}

/// A database schema (namespace)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub tables: IndexMap<String, TableDef>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: IndexMap::new(),
        }
    }
}

/// Qualified name (schema.table or just table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Parse from a dotted name like "schema.table" or just "table"
    pub fn parse(s: &str) -> Self {
        if let Some((schema, name)) = s.split_once('.') {
            Self::with_schema(schema, name)
        } else {
            Self::new(s)
        }
    }

    /// Convert a sqlparser object name, dropping any database/catalog prefix
    pub fn from_object_name(name: &ObjectName) -> Self {
        match name.0.as_slice() {
            [table] => Self::new(&table.value),
            [schema, table] => Self::with_schema(&schema.value, &table.value),
            [.., schema, table] => Self::with_schema(&schema.value, &table.value),
            [] => Self::new(name.to_string()),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.{}", schema, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Table definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: QualifiedName,
    pub columns: IndexMap<String, ColumnDef>,
    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            columns: IndexMap::new(),
            indexes: Vec::new(),
        }
    }

    /// Get a column by name (case-insensitive)
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// The primary key index, if one is declared
    pub fn primary_key(&self) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.primary)
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: SqlType,
    pub nullable: bool,
    /// DEFAULT expression as written
    pub default: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: SqlType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            default: None,
        }
    }
}

/// Index, unique key or primary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
}

impl IndexDef {
    pub fn new(name: Option<String>, columns: Vec<String>) -> Self {
        Self {
            name,
            columns,
            unique: false,
            primary: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.unique = true;
        self.primary = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_parse() {
        let name = QualifiedName::parse("users");
        assert_eq!(name.schema, None);
        assert_eq!(name.name, "users");

        let name = QualifiedName::parse("public.users");
        assert_eq!(name.schema, Some("public".to_string()));
        assert_eq!(name.name, "users");
    }

    #[test]
    fn test_catalog_add_table() {
        let mut catalog = Catalog::new();
        let table = TableDef::new(QualifiedName::new("users"));
        catalog.add_table(table);

        assert!(catalog.table_exists(&QualifiedName::new("users")));
        assert!(catalog.table_exists(&QualifiedName::with_schema("public", "users")));
    }

    #[test]
    fn test_column_type_respects_case_flag() {
        let mut table = TableDef::new(QualifiedName::new("Users"));
        table
            .columns
            .insert("Id".to_string(), ColumnDef::new("Id", SqlType::BigInt));

        let mut catalog = Catalog::new();
        catalog.add_table(table.clone());
        assert_eq!(
            catalog.column_type(&QualifiedName::new("users"), "id"),
            Some(&SqlType::BigInt)
        );

        let mut strict = Catalog::new().case_sensitive(true);
        strict.add_table(table);
        assert_eq!(strict.column_type(&QualifiedName::new("users"), "id"), None);
        assert_eq!(
            strict.column_type(&QualifiedName::new("Users"), "Id"),
            Some(&SqlType::BigInt)
        );
    }
}
