//! Single-pass multi-rule walker

use std::collections::HashMap;
use std::convert::Infallible;
use std::ops::ControlFlow;

use sqlparser::ast::{
    AlterTableOperation, Expr, ObjectName, Query, SelectItem, SetExpr, Statement, TableConstraint,
    Visit, Visitor,
};

use crate::advice::Advice;
use crate::error::RuleFailure;
use crate::schema::Catalog;

use super::node::{classify, ColumnNode, EventTag, Node};
use super::rule::{Rule, WalkContext};

/// Advice and isolated rule failures collected by a walk
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub advice: Vec<Advice>,
    pub failures: Vec<RuleFailure>,
}

/// Walks each statement once and fans every classified node out to the
/// rules interested in its tag.
pub struct Walker {
    rules: Vec<Box<dyn Rule>>,
    /// Tag -> indices of interested rules, in registration order
    index: HashMap<EventTag, Vec<usize>>,
    failed: Vec<bool>,
    failures: Vec<RuleFailure>,
    advice: Vec<Advice>,
}

impl Walker {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        let mut index: HashMap<EventTag, Vec<usize>> = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            for &tag in rule.interests() {
                if tag == EventTag::Uninteresting {
                    continue;
                }
                let interested = index.entry(tag).or_default();
                if !interested.contains(&i) {
                    interested.push(i);
                }
            }
        }
        Self {
            failed: vec![false; rules.len()],
            rules,
            index,
            failures: Vec::new(),
            advice: Vec::new(),
        }
    }

    /// Names of the registered rules, in registration order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Walk one statement
    pub fn walk_statement(&mut self, stmt: &Statement, ctx: &WalkContext<'_>) {
        tracing::debug!(base_line = ctx.base_line, "walking statement");
        for rule in &mut self.rules {
            rule.base_mut().set_base_line(ctx.base_line);
        }

        let node = Node::Statement(stmt);
        self.dispatch(&node, ctx, true);
        match stmt {
            Statement::CreateTable(create) => {
                for column in &create.columns {
                    self.walk_column(ColumnNode::from_def(&create.name, column), ctx);
                }
                for constraint in &create.constraints {
                    self.walk_constraint(&create.name, constraint, ctx);
                }
                if let Some(query) = &create.query {
                    let _ = query.visit(&mut Descent { walker: self, ctx });
                }
            }
            Statement::AlterTable {
                name, operations, ..
            } => {
                for operation in operations {
                    self.walk_alter_operation(name, operation, ctx);
                }
            }
            _ => {
                let _ = stmt.visit(&mut Descent { walker: self, ctx });
            }
        }
        self.dispatch(&node, ctx, false);
    }

    /// Run every surviving rule's finalize step and return everything collected
    pub fn finish(mut self, catalog: Option<&Catalog>) -> WalkOutcome {
        for (i, rule) in self.rules.iter_mut().enumerate() {
            if self.failed[i] {
                continue;
            }
            let result = rule.finalize(catalog);
            self.advice.extend(rule.base_mut().take_advice());
            if let Err(error) = result {
                tracing::warn!(rule = rule.name(), error = %error, "rule failed during finalize");
                self.failures.push(RuleFailure {
                    rule: rule.name(),
                    error,
                });
            }
        }
        WalkOutcome {
            advice: self.advice,
            failures: self.failures,
        }
    }

    fn walk_column(&mut self, column: ColumnNode<'_>, ctx: &WalkContext<'_>) {
        let node = Node::Column(column);
        self.dispatch(&node, ctx, true);
        let mut descent = Descent { walker: self, ctx };
        for option in column.options() {
            let _ = option.visit(&mut descent);
        }
        self.dispatch(&node, ctx, false);
    }

    fn walk_constraint(
        &mut self,
        table: &ObjectName,
        constraint: &TableConstraint,
        ctx: &WalkContext<'_>,
    ) {
        let node = Node::Constraint { table, constraint };
        self.dispatch(&node, ctx, true);
        let _ = constraint.visit(&mut Descent { walker: self, ctx });
        self.dispatch(&node, ctx, false);
    }

    fn walk_alter_operation(
        &mut self,
        table: &ObjectName,
        operation: &AlterTableOperation,
        ctx: &WalkContext<'_>,
    ) {
        let node = Node::AlterAction { table, operation };
        self.dispatch(&node, ctx, true);
        match operation {
            AlterTableOperation::AddColumn { column_def, .. } => {
                self.walk_column(ColumnNode::from_def(table, column_def), ctx);
            }
            AlterTableOperation::ChangeColumn {
                old_name,
                new_name,
                data_type,
                options,
                ..
            } => {
                let column =
                    ColumnNode::redefined(table, new_name, data_type, options, Some(old_name));
                self.walk_column(column, ctx);
            }
            AlterTableOperation::ModifyColumn {
                col_name,
                data_type,
                options,
                ..
            } => {
                let column = ColumnNode::redefined(table, col_name, data_type, options, None);
                self.walk_column(column, ctx);
            }
            AlterTableOperation::AddConstraint(constraint) => {
                self.walk_constraint(table, constraint, ctx);
            }
            other => {
                let _ = other.visit(&mut Descent { walker: self, ctx });
            }
        }
        self.dispatch(&node, ctx, false);
    }

    fn dispatch(&mut self, node: &Node<'_>, ctx: &WalkContext<'_>, entering: bool) {
        let tag = classify(node);
        if tag == EventTag::Uninteresting {
            return;
        }
        let Some(interested) = self.index.get(&tag) else {
            return;
        };
        for &i in interested {
            if self.failed[i] {
                continue;
            }
            let rule = &mut self.rules[i];
            let result = if entering {
                rule.on_enter(node, tag, ctx)
            } else {
                rule.on_exit(node, tag, ctx)
            };
            self.advice.extend(rule.base_mut().take_advice());
            if let Err(error) = result {
                tracing::warn!(
                    rule = rule.name(),
                    ?tag,
                    error = %error,
                    "rule failed; skipping it for the rest of the script"
                );
                self.failed[i] = true;
                self.failures.push(RuleFailure {
                    rule: rule.name(),
                    error,
                });
            }
        }
    }
}

/// Generic descent through the parts of a statement the walker does not
/// lay out itself: queries, projections and expressions.
struct Descent<'w, 'c> {
    walker: &'w mut Walker,
    ctx: &'w WalkContext<'c>,
}

impl Visitor for Descent<'_, '_> {
    type Break = Infallible;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        self.walker.dispatch(&Node::Query(query), self.ctx, true);
        let mut projections = Vec::new();
        collect_projections(&query.body, &mut projections);
        for items in projections {
            let node = Node::SelectItems(items);
            self.walker.dispatch(&node, self.ctx, true);
            self.walker.dispatch(&node, self.ctx, false);
        }
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        self.walker.dispatch(&Node::Query(query), self.ctx, false);
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        self.walker.dispatch(&Node::Expr(expr), self.ctx, true);
        ControlFlow::Continue(())
    }

    fn post_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        self.walker.dispatch(&Node::Expr(expr), self.ctx, false);
        ControlFlow::Continue(())
    }
}

/// SELECT projections directly under a query body; nested queries report their own
fn collect_projections<'q>(body: &'q SetExpr, out: &mut Vec<&'q [SelectItem]>) {
    match body {
        SetExpr::Select(select) => out.push(&select.projection),
        SetExpr::SetOperation { left, right, .. } => {
            collect_projections(left, out);
            collect_projections(right, out);
        }
        _ => {}
    }
}
