//! Output formatting

use miette::{IntoDiagnostic, Result};
use sqlreview_core::{Advice, ReviewReport, Severity};

use crate::args::OutputFormat;

/// Output formatter for review reports
pub struct OutputFormatter {
    format: OutputFormat,
    file_name: String,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, file_name: String) -> Self {
        Self { format, file_name }
    }

    /// Print a report in the configured format
    pub fn print_report(&self, report: &ReviewReport, source: &str) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                self.print_human(report, source);
                Ok(())
            }
            OutputFormat::Json => self.print_json(report),
            OutputFormat::Sarif => self.print_sarif(&report.advice),
        }
    }

    fn print_human(&self, report: &ReviewReport, source: &str) {
        for advice in &report.advice {
            let severity_str = match advice.severity {
                Severity::Error => "\x1b[31merror\x1b[0m",
                Severity::Warning => "\x1b[33mwarning\x1b[0m",
                Severity::Info => "\x1b[34minfo\x1b[0m",
            };

            // Print main message
            eprintln!(
                "{}[{}]: {}: {}",
                severity_str,
                advice.code(),
                advice.title,
                advice.message
            );

            let line = advice.line();
            match advice.position.column {
                Some(col) => eprintln!("  --> {}:{}:{}", self.file_name, line, col),
                None => eprintln!("  --> {}:{}", self.file_name, line),
            }

            // Print source line
            if let Some(source_line) = get_source_line(source, line) {
                eprintln!("   |");
                eprintln!("{:>3} | {}", line, source_line);
                eprintln!("   |");
            }

            eprintln!("   = note: {}", advice.code.name());
            eprintln!();
        }

        for failure in &report.failures {
            eprintln!(
                "\x1b[35mrule failure\x1b[0m: {}: {}",
                self.file_name, failure
            );
        }
    }

    fn print_json(&self, report: &ReviewReport) -> Result<()> {
        let failures: Vec<serde_json::Value> = report
            .failures
            .iter()
            .map(|f| {
                serde_json::json!({
                    "rule": f.rule,
                    "error": f.error.to_string(),
                })
            })
            .collect();
        let output = serde_json::json!({
            "file": self.file_name,
            "advice": report.advice,
            "failures": failures,
        });
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
        Ok(())
    }

    fn print_sarif(&self, advice: &[Advice]) -> Result<()> {
        let results: Vec<serde_json::Value> = advice
            .iter()
            .map(|a| {
                serde_json::json!({
                    "ruleId": a.code.name(),
                    "level": match a.severity {
                        Severity::Error => "error",
                        Severity::Warning => "warning",
                        Severity::Info => "note",
                    },
                    "message": {
                        "text": a.message
                    },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": {
                                "uri": self.file_name
                            },
                            "region": {
                                "startLine": a.line()
                            }
                        }
                    }]
                })
            })
            .collect();

        let sarif = serde_json::json!({
            "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
            "version": "2.1.0",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "sqlreview",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                },
                "results": results
            }]
        });

        println!("{}", serde_json::to_string_pretty(&sarif).into_diagnostic()?);
        Ok(())
    }
}

/// Get a specific line from source (1-indexed)
fn get_source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_source_line() {
        let source = "SELECT 1;\nDELETE FROM t;\n";
        assert_eq!(get_source_line(source, 2), Some("DELETE FROM t;"));
        assert_eq!(get_source_line(source, 5), None);
    }
}
