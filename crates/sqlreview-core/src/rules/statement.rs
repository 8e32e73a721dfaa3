//! Single-statement checks: `statement.select-no-select-all` and
//! `statement.where-require`

use sqlparser::ast::{SelectItem, Statement};

use crate::advice::{AdviceCode, Severity};
use crate::engine::{EventTag, Node, Rule, RuleBase, WalkContext};
use crate::error::RuleError;

use super::RuleType;

pub struct SelectNoSelectAll {
    base: RuleBase,
}

impl SelectNoSelectAll {
    pub fn new(level: Severity) -> Self {
        Self {
            base: RuleBase::new(RuleType::StatementSelectNoSelectAll.title(), level),
        }
    }
}

impl Rule for SelectNoSelectAll {
    fn name(&self) -> &'static str {
        RuleType::StatementSelectNoSelectAll.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[EventTag::SelectItemList]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        let Node::SelectItems(items) = node else {
            return Ok(());
        };
        let wildcard = items.iter().any(|item| {
            matches!(
                item,
                SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..)
            )
        });
        if wildcard {
            let message = format!("\"{}\" uses SELECT all", ctx.statement_text());
            self.base
                .report_at(AdviceCode::StatementSelectAll, message, ctx.position_of(node));
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

pub struct WhereRequire {
    base: RuleBase,
}

impl WhereRequire {
    pub fn new(level: Severity) -> Self {
        Self {
            base: RuleBase::new(RuleType::StatementWhereRequire.title(), level),
        }
    }
}

impl Rule for WhereRequire {
    fn name(&self) -> &'static str {
        RuleType::StatementWhereRequire.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[EventTag::Update, EventTag::Delete]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        let missing = match node {
            Node::Statement(Statement::Update { selection, .. }) => selection.is_none(),
            Node::Statement(Statement::Delete(delete)) => delete.selection.is_none(),
            _ => false,
        };
        if missing {
            let message = format!("\"{}\" requires WHERE clause", ctx.statement_text());
            self.base
                .report_at(AdviceCode::StatementNoWhere, message, ctx.position_of(node));
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
