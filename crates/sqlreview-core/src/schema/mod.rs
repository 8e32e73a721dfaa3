//! Schema management module

mod builder;
mod catalog;
mod resolver;

pub(crate) use builder::index_column_name;
pub use builder::SchemaBuilder;
pub use catalog::{Catalog, ColumnDef, IndexDef, QualifiedName, Schema, TableDef};
pub use resolver::{ColumnTypeOverlay, ColumnTypeResolver};
