//! Index key column checks: `index.primary-key-type` and `index.type-no-blob`
//!
//! Both rules need the type of columns that a key merely names, so they
//! resolve through [`ColumnTypeResolver`]: columns defined earlier in the
//! script first, then the catalog. A column whose type cannot be resolved
//! is skipped.

use serde::{Deserialize, Serialize};
use sqlparser::ast::{
    AlterTableOperation, ColumnOption, Ident, ObjectName, Statement, TableConstraint,
};

use crate::advice::{AdviceCode, Position, Severity};
use crate::engine::{ColumnNode, EventTag, Node, Rule, RuleBase, WalkContext};
use crate::error::{ConfigError, RuleError};
use crate::schema::{index_column_name, ColumnTypeResolver, QualifiedName};
use crate::types::{base_type_name, normalize_type_name, SqlType};

use super::RuleType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyTypePayload {
    /// Allowed primary key column types
    pub list: Vec<String>,
}

impl Default for PrimaryKeyTypePayload {
    fn default() -> Self {
        Self {
            list: vec!["INT".to_string(), "BIGINT".to_string()],
        }
    }
}

/// Keep the resolver in step with statements that change column types
fn observe_statement(resolver: &mut ColumnTypeResolver, node: &Node<'_>, ctx: &WalkContext<'_>) {
    if let Node::Statement(stmt) = node {
        resolver.observe(ctx.catalog, stmt);
    }
}

fn table_name(table: &ObjectName) -> String {
    QualifiedName::from_object_name(table).name
}

pub struct IndexPrimaryKeyType {
    base: RuleBase,
    allowed: Vec<String>,
    resolver: ColumnTypeResolver,
}

impl IndexPrimaryKeyType {
    pub fn new(level: Severity, payload: PrimaryKeyTypePayload) -> Result<Self, ConfigError> {
        if payload.list.is_empty() {
            return Err(ConfigError::MissingValue {
                rule: RuleType::IndexPrimaryKeyType.as_str(),
                field: "list",
            });
        }
        Ok(Self {
            base: RuleBase::new(RuleType::IndexPrimaryKeyType.title(), level),
            allowed: payload.list.iter().map(|t| normalize_type_name(t)).collect(),
            resolver: ColumnTypeResolver::new(),
        })
    }

    fn is_allowed(&self, normalized: &str) -> bool {
        let base = base_type_name(normalized);
        self.allowed.iter().any(|t| t == normalized || t == base)
    }

    fn check_columns<'c>(
        &mut self,
        table: &ObjectName,
        columns: impl IntoIterator<Item = &'c Ident>,
        ctx: &WalkContext<'_>,
        position: Position,
    ) {
        for column in columns {
            let Some(ty) = self.resolver.resolve_object(ctx.catalog, table, &column.value) else {
                continue;
            };
            if !self.is_allowed(&ty) {
                let message = format!(
                    "The column `{}` in table `{}` is one of the primary key, but its type \"{}\" is not in allow list",
                    column.value,
                    table_name(table),
                    ty.to_uppercase()
                );
                self.base
                    .report_at(AdviceCode::IndexPrimaryKeyType, message, position);
            }
        }
    }
}

impl Rule for IndexPrimaryKeyType {
    fn name(&self) -> &'static str {
        RuleType::IndexPrimaryKeyType.as_str()
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
        observe_statement(&mut self.resolver, node, ctx);
        match node {
            Node::Statement(Statement::CreateTable(create)) => {
                let position = ctx.position_of(node);
                let inline = create
                    .columns
                    .iter()
                    .filter(|c| ColumnNode::from_def(&create.name, c).is_primary_key())
                    .map(|c| &c.name);
                self.check_columns(&create.name, inline, ctx, position);
                for constraint in &create.constraints {
                    if let TableConstraint::PrimaryKey { columns, .. } = constraint {
                        self.check_columns(&create.name, columns, ctx, position);
                    }
                }
            }
            Node::AlterAction { table, operation } => {
                let position = ctx.position_of(node);
                match operation {
                    AlterTableOperation::AddConstraint(TableConstraint::PrimaryKey {
                        columns,
                        ..
                    }) => self.check_columns(table, columns, ctx, position),
                    AlterTableOperation::AddColumn { column_def, .. }
                        if ColumnNode::from_def(table, column_def).is_primary_key() =>
                    {
                        self.check_columns(table, [&column_def.name], ctx, position)
                    }
                    AlterTableOperation::ChangeColumn {
                        new_name: name,
                        options,
                        ..
                    }
                    | AlterTableOperation::ModifyColumn {
                        col_name: name,
                        options,
                        ..
                    } if has_primary_option(options) => {
                        self.check_columns(table, [name], ctx, position)
                    }
                    _ => {}
                }
            }
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

fn has_primary_option(options: &[ColumnOption]) -> bool {
    options
        .iter()
        .any(|o| matches!(o, ColumnOption::Unique { is_primary: true, .. }))
}

fn has_key_option(column: &ColumnNode<'_>) -> bool {
    column
        .options()
        .iter()
        .any(|o| matches!(o, ColumnOption::Unique { .. }))
}

pub struct IndexTypeNoBlob {
    base: RuleBase,
    resolver: ColumnTypeResolver,
}

impl IndexTypeNoBlob {
    pub fn new(level: Severity) -> Self {
        Self {
            base: RuleBase::new(RuleType::IndexTypeNoBlob.title(), level),
            resolver: ColumnTypeResolver::new(),
        }
    }

    fn check_columns(
        &mut self,
        table: &ObjectName,
        columns: &[String],
        ctx: &WalkContext<'_>,
        position: Position,
    ) {
        for column in columns {
            let Some(ty) = self.resolver.resolve_object(ctx.catalog, table, column) else {
                continue;
            };
            if SqlType::parse(&ty).is_blob_like() {
                self.report(table, column, &ty, position);
            }
        }
    }

    fn report(&mut self, table: &ObjectName, column: &str, ty: &str, position: Position) {
        let message = format!(
            "Columns in index must not be BLOB, TEXT or JSON, but `{}`.`{}` is {}",
            table_name(table),
            column,
            ty.to_uppercase()
        );
        self.base
            .report_at(AdviceCode::IndexTypeNoBlob, message, position);
    }
}

impl Rule for IndexTypeNoBlob {
    fn name(&self) -> &'static str {
        RuleType::IndexTypeNoBlob.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[
            EventTag::CreateTable,
            EventTag::AlterTable,
            EventTag::DropTable,
            EventTag::CreateIndex,
            EventTag::ColumnDefinition,
            EventTag::TableConstraint,
        ]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        observe_statement(&mut self.resolver, node, ctx);
        let position = ctx.position_of(node);
        match node {
            Node::Statement(Statement::CreateIndex(index)) => {
                let columns: Vec<String> = index
                    .columns
                    .iter()
                    .filter_map(|c| index_column_name(&c.expr))
                    .collect();
                self.check_columns(&index.table_name, &columns, ctx, position);
            }
            Node::Constraint { table, constraint } => {
                let columns = match constraint {
                    TableConstraint::PrimaryKey { columns, .. }
                    | TableConstraint::Unique { columns, .. }
                    | TableConstraint::Index { columns, .. } => columns,
                    _ => return Ok(()),
                };
                let columns: Vec<String> = columns.iter().map(|c| c.value.clone()).collect();
                self.check_columns(table, &columns, ctx, position);
            }
            Node::Column(column) if has_key_option(column) => {
                let ty = SqlType::from_ast(column.data_type);
                if ty.is_blob_like() {
                    self.report(column.table, &column.name.value, &ty.display_name(), position);
                }
            }
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
