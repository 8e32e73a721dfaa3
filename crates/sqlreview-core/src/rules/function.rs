//! `function.disallow-list`

use serde::{Deserialize, Serialize};
use sqlparser::ast::Expr;

use crate::advice::{AdviceCode, Severity};
use crate::engine::{EventTag, Node, Rule, RuleBase, WalkContext};
use crate::error::RuleError;

use super::{contains_ignore_case, RuleType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDisallowPayload {
    pub list: Vec<String>,
}

impl Default for FunctionDisallowPayload {
    fn default() -> Self {
        Self {
            list: vec!["SLEEP".to_string(), "RAND".to_string(), "UUID".to_string()],
        }
    }
}

pub struct FunctionDisallowList {
    base: RuleBase,
    disallowed: Vec<String>,
}

impl FunctionDisallowList {
    pub fn new(level: Severity, payload: FunctionDisallowPayload) -> Self {
        Self {
            base: RuleBase::new(RuleType::FunctionDisallowList.title(), level),
            disallowed: payload.list,
        }
    }
}

impl Rule for FunctionDisallowList {
    fn name(&self) -> &'static str {
        RuleType::FunctionDisallowList.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[EventTag::FunctionCall]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        let Node::Expr(Expr::Function(function)) = node else {
            return Ok(());
        };
        // Schema-qualified calls are matched on the bare function name
        let Some(name) = function.name.0.last() else {
            return Ok(());
        };
        if contains_ignore_case(&self.disallowed, &name.value) {
            let message = format!(
                "Function \"{}\" is disallowed, but \"{}\" uses",
                name.value.to_uppercase(),
                ctx.statement_text()
            );
            self.base
                .report_at(AdviceCode::DisabledFunction, message, ctx.position_of(node));
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

    fn check(sql: &str) -> Vec<(usize, String)> {
        let rule = FunctionDisallowList::new(Severity::Error, FunctionDisallowPayload::default());
        Reviewer::new(SqlDialect::MySQL)
            .check(sql, vec![Box::new(rule)], &CheckContext::new())
            .unwrap()
            .advice
            .into_iter()
            .map(|a| (a.line(), a.message))
            .collect()
    }

    #[test]
    fn test_disallowed_call_anywhere_in_statement() {
        let advice = check("SELECT id FROM t\nWHERE n > rand()");
        assert_eq!(
            advice,
            vec![(
                2,
                "Function \"RAND\" is disallowed, but \"SELECT id FROM t\nWHERE n > rand()\" uses"
                    .to_string()
            )]
        );
    }

    #[test]
    fn test_allowed_calls() {
        assert!(check("SELECT COUNT(*), NOW() FROM t").is_empty());
    }

    #[test]
    fn test_default_expression_in_ddl() {
        let advice = check("CREATE TABLE t (id CHAR(36) DEFAULT (UUID()))");
        assert_eq!(advice.len(), 1);
    }

    #[test]
    fn test_nested_calls() {
        let advice = check("UPDATE t SET v = ROUND(RAND() * 10) WHERE id = 1; SELECT SLEEP(1)");
        let lines: Vec<usize> = advice.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![1, 1]);
    }
}
