//! Rule contract shared by every check

use crate::advice::{Advice, AdviceCode, Position, Severity};
use crate::dialect::SqlDialect;
use crate::error::RuleError;
use crate::schema::Catalog;

use super::node::{EventTag, Node};

/// Per-statement context handed to rule hooks
#[derive(Debug, Clone, Copy)]
pub struct WalkContext<'a> {
    /// Persisted schema, if the review runs against one
    pub catalog: Option<&'a Catalog>,
    pub dialect: SqlDialect,
    /// Source text of the statement being walked
    pub statement: &'a str,
    /// Line offset of the statement within the script
    pub base_line: usize,
}

impl WalkContext<'_> {
    /// Script position of a node in the current statement
    ///
    /// Nodes without span information report the statement's first line.
    pub fn position_of(&self, node: &Node<'_>) -> Position {
        let local_line = match node.local_line() {
            0 => self.first_line(),
            line => line,
        };
        Position::at(self.base_line, local_line)
    }

    /// Statement-local line of the first non-blank character
    pub fn first_line(&self) -> usize {
        let leading = self.statement.len() - self.statement.trim_start().len();
        self.statement[..leading]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
            + 1
    }

    /// Statement text without surrounding whitespace, for messages
    pub fn statement_text(&self) -> &str {
        self.statement.trim()
    }
}

/// Advice accumulation shared by all rules
#[derive(Debug, Clone)]
pub struct RuleBase {
    title: String,
    severity: Severity,
    base_line: usize,
    advice: Vec<Advice>,
}

impl RuleBase {
    pub fn new(title: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            severity,
            base_line: 0,
            advice: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn base_line(&self) -> usize {
        self.base_line
    }

    /// Set the line offset of the statement about to be walked
    pub fn set_base_line(&mut self, base_line: usize) {
        self.base_line = base_line;
    }

    /// Append a fully built advice
    pub fn add_advice(&mut self, advice: Advice) {
        self.advice.push(advice);
    }

    /// Report a finding on a statement-local line of the current statement
    pub fn report(&mut self, code: AdviceCode, message: impl Into<String>, local_line: usize) {
        let position = Position::at(self.base_line, local_line);
        self.report_at(code, message, position);
    }

    /// Report a finding at an already resolved script position
    pub fn report_at(&mut self, code: AdviceCode, message: impl Into<String>, position: Position) {
        let advice = Advice::new(self.severity, code, self.title.clone(), message, position);
        self.advice.push(advice);
    }

    /// Drain advice collected since the last call
    pub fn take_advice(&mut self) -> Vec<Advice> {
        std::mem::take(&mut self.advice)
    }
}

/// A single review check
///
/// Rules declare the event tags they care about and receive matching nodes
/// in depth-first order: `on_enter` before any descendant, `on_exit` after
/// all of them. Rules are constructed per script, so any state they keep is
/// scoped to one review.
pub trait Rule: Send {
    /// Stable identifier, equal to the rule's configuration type
    fn name(&self) -> &'static str;

    /// Event tags this rule wants to receive
    fn interests(&self) -> &'static [EventTag];

    fn on_enter(
        &mut self,
        _node: &Node<'_>,
        _tag: EventTag,
        _ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        Ok(())
    }

    fn on_exit(
        &mut self,
        _node: &Node<'_>,
        _tag: EventTag,
        _ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        Ok(())
    }

    /// Called once after every statement of the script has been walked
    fn finalize(&mut self, _catalog: Option<&Catalog>) -> Result<(), RuleError> {
        Ok(())
    }

    fn base(&self) -> &RuleBase;

    fn base_mut(&mut self) -> &mut RuleBase;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_offsets_by_base_line() {
        let mut base = RuleBase::new("Test rule", Severity::Warning);
        base.set_base_line(4);
        base.report(AdviceCode::StatementSelectAll, "uses *", 2);

        let advice = base.take_advice();
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].line(), 6);
        assert_eq!(advice[0].severity, Severity::Warning);
        assert_eq!(advice[0].title, "Test rule");
        assert!(base.take_advice().is_empty());
    }
}
