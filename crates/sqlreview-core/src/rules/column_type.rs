//! `column.type-disallow-list`

use serde::{Deserialize, Serialize};

use crate::advice::{AdviceCode, Severity};
use crate::engine::{EventTag, Node, Rule, RuleBase, WalkContext};
use crate::error::RuleError;
use crate::schema::QualifiedName;
use crate::types::{base_type_name, normalize_type_name, SqlType};

use super::RuleType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypeDisallowPayload {
    pub list: Vec<String>,
}

impl Default for ColumnTypeDisallowPayload {
    fn default() -> Self {
        Self {
            list: vec!["JSON".to_string()],
        }
    }
}

pub struct ColumnTypeDisallowList {
    base: RuleBase,
    /// Normalized type names; a bare name also matches sized variants
    disallowed: Vec<String>,
}

impl ColumnTypeDisallowList {
    pub fn new(level: Severity, payload: ColumnTypeDisallowPayload) -> Self {
        Self {
            base: RuleBase::new(RuleType::ColumnTypeDisallowList.title(), level),
            disallowed: payload
                .list
                .iter()
                .map(|t| normalize_type_name(t))
                .collect(),
        }
    }

    fn is_disallowed(&self, normalized: &str) -> bool {
        let base = base_type_name(normalized);
        self.disallowed
            .iter()
            .any(|t| t == normalized || t == base)
    }
}

impl Rule for ColumnTypeDisallowList {
    fn name(&self) -> &'static str {
        RuleType::ColumnTypeDisallowList.as_str()
    }

    fn interests(&self) -> &'static [EventTag] {
        &[EventTag::ColumnDefinition]
    }

    fn on_enter(
        &mut self,
        node: &Node<'_>,
        _tag: EventTag,
        ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        let Node::Column(column) = node else {
            return Ok(());
        };
        let ty = SqlType::from_ast(column.data_type).display_name();
        if self.is_disallowed(&ty) {
            let message = format!(
                "Disallow column type {} but column `{}`.`{}` is",
                ty.to_uppercase(),
                QualifiedName::from_object_name(column.table).name,
                column.name.value
            );
            self.base
                .report_at(AdviceCode::DisabledColumnType, message, ctx.position_of(node));
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
