// Integration tests for the review engine
use pretty_assertions::assert_eq;
use serde_json::json;
use sqlreview_core::advice::{AdviceCode, Severity};
use sqlreview_core::dialect::SqlDialect;
use sqlreview_core::engine::{
    CancelFlag, CheckContext, EventTag, Node, ReviewReport, Reviewer, Rule, RuleBase, WalkContext,
};
use sqlreview_core::error::{CheckError, RuleError};
use sqlreview_core::rules::{build_rule, default_rule_configs, RuleConfig, RuleType};
use sqlreview_core::schema::{Catalog, SchemaBuilder};

fn setup_catalog() -> Catalog {
    let schema_sql = r#"
            CREATE TABLE users (
                id BIGINT PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                bio TEXT,
                created_at TIMESTAMP,
                updated_at TIMESTAMP
            );

            CREATE TABLE orders (
                id BIGINT PRIMARY KEY,
                user_id BIGINT NOT NULL,
                note TEXT
            );
        "#;

    let mut builder = SchemaBuilder::with_dialect(SqlDialect::MySQL);
    builder.parse(schema_sql);
    let (catalog, _) = builder.build();
    catalog
}

fn rules(configs: &[RuleConfig]) -> Vec<Box<dyn Rule>> {
    configs.iter().map(|c| build_rule(c).unwrap()).collect()
}

fn review(catalog: Option<&Catalog>, configs: &[RuleConfig], sql: &str) -> ReviewReport {
    let mut reviewer = Reviewer::new(SqlDialect::MySQL);
    if let Some(catalog) = catalog {
        reviewer = reviewer.with_catalog(catalog);
    }
    reviewer
        .check(sql, rules(configs), &CheckContext::new())
        .unwrap()
}

fn required(list: &[&str]) -> RuleConfig {
    RuleConfig::new(RuleType::ColumnRequired, Severity::Error).with_payload(json!({ "list": list }))
}

#[test]
fn test_required_columns_present() {
    let report = review(
        None,
        &[required(&["id", "created_at"])],
        "CREATE TABLE t (id INT, created_at TIMESTAMP, name TEXT)",
    );
    assert!(report.is_clean(), "{:?}", report);
}

#[test]
fn test_required_column_missing_at_create_line() {
    let sql = "CREATE TABLE a (id INT, created_at INT);\n\n\nCREATE TABLE b (\n  id INT\n);";
    let report = review(None, &[required(&["id", "created_at"])], sql);
    assert_eq!(report.advice.len(), 1);
    let advice = &report.advice[0];
    assert_eq!(advice.code, AdviceCode::NoRequiredColumn);
    assert_eq!(advice.code(), 401);
    assert_eq!(advice.severity, Severity::Error);
    assert_eq!(advice.line(), 4);
    assert!(advice.message.contains("created_at"));
}

#[test]
fn test_add_then_drop_matches_never_added() {
    let configs = [required(&["id", "created_at"])];
    let never = review(None, &configs, "CREATE TABLE t (id INT)");
    let added_dropped = review(
        None,
        &configs,
        "CREATE TABLE t (id INT); ALTER TABLE t ADD COLUMN created_at INT; ALTER TABLE t DROP COLUMN created_at",
    );
    let messages = |r: &ReviewReport| r.advice.iter().map(|a| a.message.clone()).collect::<Vec<_>>();
    assert_eq!(messages(&never), messages(&added_dropped));
}

#[test]
fn test_create_then_drop_table_is_clean() {
    let report = review(
        None,
        &[required(&["id", "created_at"])],
        "CREATE TABLE tmp (x INT);\nDROP TABLE tmp;",
    );
    assert!(report.advice.is_empty());
}

#[test]
fn test_positions_are_script_lines() {
    // The DELETE chunk starts after four line breaks and sits on its second line
    let sql = "UPDATE t SET a = 1\nWHERE id = 1\n  AND b = 2\n\n\t;\nDELETE FROM t;";
    let config = RuleConfig::new(RuleType::StatementWhereRequire, Severity::Warning);
    let report = review(None, &[config], sql);
    assert_eq!(report.advice.len(), 1);
    assert_eq!(sqlreview_core::position(4, 2), 6);
    assert_eq!(report.advice[0].line(), 6);
}

#[test]
fn test_mysql_escaped_quote_does_not_split_statement() {
    let sql = "INSERT INTO t VALUES ('it\\'s; fine');\nDELETE FROM t;";
    let config = RuleConfig::new(RuleType::StatementWhereRequire, Severity::Warning);
    let report = review(None, &[config], sql);
    let found: Vec<(AdviceCode, usize)> = report.advice.iter().map(|a| (a.code, a.line())).collect();
    assert_eq!(found, vec![(AdviceCode::StatementNoWhere, 2)]);
}

#[test]
fn test_multi_statement_lines() {
    let sql = "SELECT * FROM a;\nSELECT id FROM b;\nSELECT *\nFROM c;";
    let config = RuleConfig::new(RuleType::StatementSelectNoSelectAll, Severity::Warning);
    let report = review(None, &[config], sql);
    let lines: Vec<usize> = report.advice.iter().map(|a| a.line()).collect();
    assert_eq!(lines, vec![1, 3]);
}

#[test]
fn test_index_on_script_column_resolves_without_catalog() {
    let config = RuleConfig::new(RuleType::IndexTypeNoBlob, Severity::Warning);
    let report = review(
        None,
        &[config],
        "ALTER TABLE t ADD COLUMN x TEXT;\nCREATE INDEX i ON t(x);",
    );
    assert_eq!(report.advice.len(), 1);
    assert_eq!(report.advice[0].code, AdviceCode::IndexTypeNoBlob);
    assert_eq!(report.advice[0].line(), 2);
}

#[test]
fn test_catalog_fallback_and_script_override() {
    let catalog = setup_catalog();
    let config = RuleConfig::new(RuleType::IndexTypeNoBlob, Severity::Warning);

    let report = review(Some(&catalog), &[config.clone()], "CREATE INDEX i ON orders (note)");
    assert_eq!(report.advice.len(), 1);

    let report = review(
        Some(&catalog),
        &[config],
        "ALTER TABLE orders MODIFY COLUMN note VARCHAR(255); CREATE INDEX i ON orders (note)",
    );
    assert!(report.advice.is_empty());
}

#[test]
fn test_naming_template_index() {
    let config = RuleConfig::new(RuleType::NamingIndex, Severity::Warning)
        .with_payload(json!({ "format": "idx_{{table}}_{{column_list}}" }));
    let report = review(
        None,
        &[config],
        "CREATE INDEX idx_orders_customer_id ON orders (customer_id);\nCREATE INDEX ix_orders_customer_id ON orders (customer_id);",
    );
    assert_eq!(report.advice.len(), 1);
    assert_eq!(report.advice[0].code, AdviceCode::IndexNamingMismatch);
    assert_eq!(report.advice[0].line(), 2);
}

/// Fails on every CREATE TABLE
struct Broken {
    base: RuleBase,
}

impl Rule for Broken {
    fn name(&self) -> &'static str {
        "test.broken"
    }

    fn interests(&self) -> &'static [EventTag] {
        &[EventTag::CreateTable]
    }

    fn on_enter(
        &mut self,
        _node: &Node<'_>,
        tag: EventTag,
        _ctx: &WalkContext<'_>,
    ) -> Result<(), RuleError> {
        Err(RuleError::UnexpectedNode {
            tag,
            detail: "cannot handle tables".to_string(),
        })
    }

    fn base(&self) -> &RuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RuleBase {
        &mut self.base
    }
}

#[test]
fn test_failing_rule_does_not_stop_others() {
    let mut rules: Vec<Box<dyn Rule>> = vec![Box::new(Broken {
        base: RuleBase::new("Broken", Severity::Error),
    })];
    rules.extend(self::rules(&[
        RuleConfig::new(RuleType::NamingTable, Severity::Warning),
        required(&["id"]),
    ]));

    let report = Reviewer::new(SqlDialect::MySQL)
        .check(
            "CREATE TABLE BadName (x INT); CREATE TABLE good (id INT)",
            rules,
            &CheckContext::new(),
        )
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].rule, "test.broken");
    let codes: Vec<AdviceCode> = report.advice.iter().map(|a| a.code).collect();
    assert_eq!(
        codes,
        vec![AdviceCode::TableNamingMismatch, AdviceCode::NoRequiredColumn]
    );
}

#[test]
fn test_cancelled_check() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let ctx = CheckContext::with_cancel_flag(cancel);
    let result = Reviewer::new(SqlDialect::MySQL).check(
        "CREATE TABLE t (id INT)",
        rules(&default_rule_configs()),
        &ctx,
    );
    assert!(matches!(result, Err(CheckError::Cancelled { statement: 1 })));
}

#[test]
fn test_syntax_error_is_single_advice() {
    let sql = "CREATE TABLE t (id INT);\nSELECT FROM WHERE;";
    let report = review(None, &[required(&["id", "created_at"])], sql);
    assert_eq!(report.advice.len(), 1);
    let advice = &report.advice[0];
    assert_eq!(advice.code, AdviceCode::StatementSyntaxError);
    assert_eq!(advice.severity, Severity::Error);
    assert_eq!(advice.line(), 2);
}

#[test]
fn test_default_profile_runs_over_mixed_script() {
    let catalog = setup_catalog();
    let sql = r#"
CREATE TABLE audit_log (
    id BIGINT PRIMARY KEY,
    payload JSON,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
ALTER TABLE users ADD COLUMN Nickname VARCHAR(20);
UPDATE users SET name = 'x';
SELECT * FROM orders WHERE id = RAND();
"#;
    let report = review(Some(&catalog), &default_rule_configs(), sql);
    assert!(report.failures.is_empty());

    let codes: Vec<u32> = report.advice.iter().map(|a| a.code()).collect();
    // Advice for one node follows rule registration order
    assert_eq!(codes, vec![411, 420, 302, 202, 203, 1701]);
    let lines: Vec<usize> = report.advice.iter().map(|a| a.line()).collect();
    assert_eq!(lines, vec![4, 8, 8, 9, 10, 10]);
}
