//! Script splitting - turns a script into statement sources with base lines

use std::sync::OnceLock;

use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::parser::ParserError;

use crate::dialect::SqlDialect;

/// Source text of one statement within a script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementSource<'a> {
    /// Statement text, starting right after the previous statement's `;`
    pub text: &'a str,
    /// Byte offset of `text` within the script
    pub offset: usize,
    /// Number of line breaks in the script before `text`
    pub base_line: usize,
}

/// A parsed statement together with its source
#[derive(Debug)]
pub struct ParsedStatement<'a> {
    pub source: StatementSource<'a>,
    pub statement: Statement,
}

/// Parse failure located inside a script
#[derive(Debug)]
pub struct SyntaxError {
    /// Statement-local line reported by the parser (1-indexed, 0 if unknown)
    pub local_line: usize,
    pub base_line: usize,
    pub message: String,
}

/// Split a script and parse every statement, stopping at the first parse failure
pub fn parse_script<'a>(
    dialect: SqlDialect,
    sql: &'a str,
) -> Result<Vec<ParsedStatement<'a>>, SyntaxError> {
    let mut parsed = Vec::new();
    for source in split_statements(sql, dialect) {
        let statements = dialect.parse(source.text).map_err(|e| SyntaxError {
            local_line: parser_error_line(&e),
            base_line: source.base_line,
            message: e.to_string(),
        })?;
        // A chunk holding only comments parses to nothing
        parsed.extend(
            statements
                .into_iter()
                .map(|statement| ParsedStatement { source, statement }),
        );
    }
    Ok(parsed)
}

/// Statement-local line of a parser error, or 0 when the message has none
fn parser_error_line(error: &ParserError) -> usize {
    static LOCATION: OnceLock<Regex> = OnceLock::new();
    let re = LOCATION.get_or_init(|| {
        Regex::new(r"Line: (\d+), Column: (\d+)").expect("location pattern is valid")
    });
    re.captures(&error.to_string())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Split SQL text into individual statements by semicolons,
/// respecting string literals, comments and dollar-quoted strings.
/// Backslash escapes inside strings follow the dialect.
pub fn split_statements(sql: &str, dialect: SqlDialect) -> Vec<StatementSource<'_>> {
    let mut statements = Vec::new();
    let mut start = 0;
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let backslash_escapes = dialect.backslash_escapes();
    let mut i = 0;

    let mut push = |start: usize, end: usize| {
        let text = &sql[start..end];
        if !text.trim().is_empty() {
            statements.push(StatementSource {
                text,
                offset: start,
                base_line: count_lines(&sql[..start]),
            });
        }
    };

    while i < len {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                // Skip quoted string or identifier, handling doubled quotes
                i += 1;
                while i < len {
                    if backslash_escapes && quote != b'`' && bytes[i] == b'\\' {
                        i += 2;
                    } else if bytes[i] == quote {
                        i += 1;
                        if i < len && bytes[i] == quote {
                            i += 1;
                        } else {
                            break;
                        }
                    } else {
                        i += 1;
                    }
                }
            }
            b'$' => {
                if let Some(tag_end) = find_dollar_tag_end(sql, i) {
                    let tag = &sql[i..=tag_end];
                    i = tag_end + 1;
                    if let Some(close_pos) = sql[i..].find(tag) {
                        i += close_pos + tag.len();
                    } else {
                        i = len;
                    }
                } else {
                    i += 1;
                }
            }
            b'-' if i + 1 < len && bytes[i + 1] == b'-' => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < len {
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b';' => {
                push(start, i);
                start = i + 1;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    // Handle last statement (without trailing semicolon)
    push(start, len);

    statements
}

fn count_lines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Find the end of a dollar-quote tag starting at position `start`.
/// Returns the index of the closing `$` if a valid tag is found.
fn find_dollar_tag_end(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut i = start + 1;
    if i < len && bytes[i] == b'$' {
        return Some(i);
    }
    // $1, $2 are positional parameters, not tags
    if i < len && bytes[i].is_ascii_digit() {
        return None;
    }
    while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i < len && bytes[i] == b'$' {
        Some(i)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        let stmts = split_statements(sql, SqlDialect::PostgreSQL);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1].offset, 24);
    }

    #[test]
    fn test_split_preserves_string_literals() {
        let sql = "SELECT 'hello; world'; CREATE TABLE t (id INT);";
        let stmts = split_statements(sql, SqlDialect::PostgreSQL);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].text.contains("hello; world"));
    }

    #[test]
    fn test_split_ignores_semicolons_in_comments() {
        let sql = "-- first; still comment\nSELECT 1;\n/* a; b */ SELECT 2;";
        let stmts = split_statements(sql, SqlDialect::PostgreSQL);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_split_honours_mysql_backslash_escapes() {
        let sql = "INSERT INTO t VALUES ('it\\'s; fine');\nDELETE FROM t;";
        let stmts = split_statements(sql, SqlDialect::MySQL);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].text.contains("it\\'s; fine"));
        assert_eq!(stmts[1].base_line, 0);

        let parsed = parse_script(SqlDialect::MySQL, sql).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_split_keeps_postgres_backslash_literal() {
        // Standard strings end at the quote even after a backslash
        let sql = r"SELECT 'C:\'; SELECT 2;";
        let stmts = split_statements(sql, SqlDialect::PostgreSQL);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_base_line_counts_preceding_breaks() {
        let sql = "CREATE TABLE a (\n  id INT\n);\nSELECT 1;\n\nSELECT 2;";
        let stmts = split_statements(sql, SqlDialect::PostgreSQL);
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0].base_line, 0);
        // second chunk starts on line 3, right after `);`
        assert_eq!(stmts[1].base_line, 2);
        assert_eq!(stmts[2].base_line, 3);
    }

    #[test]
    fn test_parse_script_reports_error_line() {
        let sql = "SELECT 1;\nSELECT\n  FROM WHERE;";
        let err = parse_script(SqlDialect::PostgreSQL, sql).unwrap_err();
        assert_eq!(err.base_line, 0);
        assert!(err.local_line >= 2, "local line {}", err.local_line);
    }
}
