//! Syntax nodes and their classification into event tags
//!
//! A [`Node`] is a borrowed view into the sqlparser AST. Rules never match
//! on concrete grammar types to decide *whether* they are interested; they
//! declare [`EventTag`]s and the walker only hands them nodes whose
//! classification matches.

use sqlparser::ast::{
    AlterTableOperation, ColumnOption, ColumnOptionDef, DataType, Expr, Ident, ObjectName,
    ObjectType, Query, SelectItem, Spanned, Statement, TableConstraint,
};

/// Semantic event vocabulary produced by [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventTag {
    CreateTable,
    AlterTable,
    /// One operation of an ALTER TABLE statement
    AlterTableAction,
    DropTable,
    CreateIndex,
    DropIndex,
    /// Column definition in CREATE TABLE, ADD COLUMN, CHANGE/MODIFY COLUMN
    ColumnDefinition,
    /// Table-level constraint or index in CREATE TABLE / ALTER TABLE ADD
    TableConstraint,
    FunctionCall,
    Query,
    /// Projection of one SELECT body
    SelectItemList,
    Insert,
    Update,
    Delete,
    /// Anything else; traversed but never dispatched
    Uninteresting,
}

/// A node visited by the walker
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Statement(&'a Statement),
    AlterAction {
        table: &'a ObjectName,
        operation: &'a AlterTableOperation,
    },
    Column(ColumnNode<'a>),
    Constraint {
        table: &'a ObjectName,
        constraint: &'a TableConstraint,
    },
    Query(&'a Query),
    SelectItems(&'a [SelectItem]),
    Expr(&'a Expr),
}

/// Map a node to its event tag
///
/// Total over every node kind: constructs outside the vocabulary are
/// `Uninteresting`.
pub fn classify(node: &Node<'_>) -> EventTag {
    match node {
        Node::Statement(stmt) => match stmt {
            Statement::CreateTable(_) => EventTag::CreateTable,
            Statement::AlterTable { .. } => EventTag::AlterTable,
            Statement::Drop {
                object_type: ObjectType::Table,
                ..
            } => EventTag::DropTable,
            Statement::Drop {
                object_type: ObjectType::Index,
                ..
            } => EventTag::DropIndex,
            Statement::CreateIndex(_) => EventTag::CreateIndex,
            Statement::Insert(_) => EventTag::Insert,
            Statement::Update { .. } => EventTag::Update,
            Statement::Delete(_) => EventTag::Delete,
            _ => EventTag::Uninteresting,
        },
        Node::AlterAction { .. } => EventTag::AlterTableAction,
        Node::Column(_) => EventTag::ColumnDefinition,
        Node::Constraint { .. } => EventTag::TableConstraint,
        Node::Query(_) => EventTag::Query,
        Node::SelectItems(_) => EventTag::SelectItemList,
        Node::Expr(Expr::Function(_)) => EventTag::FunctionCall,
        Node::Expr(_) => EventTag::Uninteresting,
    }
}

impl<'a> Node<'a> {
    /// Statement-local line where the node starts, or 0 when unknown
    pub fn local_line(&self) -> usize {
        let line = match self {
            Node::Statement(stmt) => stmt.span().start.line,
            Node::AlterAction { table, operation } => {
                alter_operation_line(operation).unwrap_or_else(|| object_name_line(table))
            }
            Node::Column(column) => column.name.span.start.line,
            Node::Constraint { table, constraint } => {
                constraint_line(constraint).unwrap_or_else(|| object_name_line(table))
            }
            Node::Query(query) => query.span().start.line,
            Node::SelectItems(items) => items.first().map_or(0, |item| item.span().start.line),
            Node::Expr(expr) => expr.span().start.line,
        };
        line as usize
    }
}

/// A column definition, whichever statement form it came from
#[derive(Debug, Clone, Copy)]
pub struct ColumnNode<'a> {
    pub table: &'a ObjectName,
    pub name: &'a Ident,
    pub data_type: &'a DataType,
    /// Previous name when the column is redefined by CHANGE COLUMN
    pub replaces: Option<&'a Ident>,
    options: ColumnOptions<'a>,
}

#[derive(Debug, Clone, Copy)]
enum ColumnOptions<'a> {
    Named(&'a [ColumnOptionDef]),
    Bare(&'a [ColumnOption]),
}

impl<'a> ColumnNode<'a> {
    /// Column from a CREATE TABLE or ADD COLUMN definition
    pub fn from_def(table: &'a ObjectName, def: &'a sqlparser::ast::ColumnDef) -> Self {
        Self {
            table,
            name: &def.name,
            data_type: &def.data_type,
            replaces: None,
            options: ColumnOptions::Named(&def.options),
        }
    }

    /// Column from a CHANGE/MODIFY COLUMN operation
    pub fn redefined(
        table: &'a ObjectName,
        name: &'a Ident,
        data_type: &'a DataType,
        options: &'a [ColumnOption],
        replaces: Option<&'a Ident>,
    ) -> Self {
        Self {
            table,
            name,
            data_type,
            replaces,
            options: ColumnOptions::Bare(options),
        }
    }

    /// Column options (NOT NULL, DEFAULT, PRIMARY KEY, ...)
    pub fn options(&self) -> Vec<&'a ColumnOption> {
        match self.options {
            ColumnOptions::Named(defs) => defs.iter().map(|d| &d.option).collect(),
            ColumnOptions::Bare(options) => options.iter().collect(),
        }
    }

    /// Whether the column is declared PRIMARY KEY inline
    pub fn is_primary_key(&self) -> bool {
        self.options()
            .iter()
            .any(|o| matches!(o, ColumnOption::Unique { is_primary: true, .. }))
    }

    /// DEFAULT expression, if any
    pub fn default_expr(&self) -> Option<&'a Expr> {
        self.options().into_iter().find_map(|o| match o {
            ColumnOption::Default(expr) => Some(expr),
            _ => None,
        })
    }

    /// Values are generated by the database (AUTO_INCREMENT, IDENTITY, generated columns)
    pub fn is_generated(&self) -> bool {
        self.options().iter().any(|o| match o {
            ColumnOption::Generated { .. } => true,
            ColumnOption::DialectSpecific(tokens) => tokens
                .iter()
                .any(|t| t.to_string().eq_ignore_ascii_case("AUTO_INCREMENT")),
            _ => false,
        })
    }
}

fn object_name_line(name: &ObjectName) -> u64 {
    name.0.last().map_or(0, |ident| ident.span.start.line)
}

fn alter_operation_line(operation: &AlterTableOperation) -> Option<u64> {
    let ident = match operation {
        AlterTableOperation::AddColumn { column_def, .. } => &column_def.name,
        AlterTableOperation::DropColumn { column_name, .. } => column_name,
        AlterTableOperation::RenameColumn {
            old_column_name, ..
        } => old_column_name,
        AlterTableOperation::ChangeColumn { old_name, .. } => old_name,
        AlterTableOperation::ModifyColumn { col_name, .. } => col_name,
        AlterTableOperation::AddConstraint(constraint) => return constraint_line(constraint),
        AlterTableOperation::RenameTable { table_name } => return table_name.0.last().map(|i| i.span.start.line),
        _ => return None,
    };
    Some(ident.span.start.line).filter(|line| *line > 0)
}

fn constraint_line(constraint: &TableConstraint) -> Option<u64> {
    let (name, columns) = match constraint {
        TableConstraint::PrimaryKey { name, columns, .. }
        | TableConstraint::Unique { name, columns, .. }
        | TableConstraint::ForeignKey { name, columns, .. } => (name.as_ref(), columns.as_slice()),
        TableConstraint::Index { name, columns, .. } => (name.as_ref(), columns.as_slice()),
        _ => return None,
    };
    name.or(columns.first())
        .map(|ident| ident.span.start.line)
        .filter(|line| *line > 0)
}
