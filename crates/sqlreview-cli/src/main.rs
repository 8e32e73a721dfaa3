//! sqlreview CLI - SQL schema review tool

mod args;
mod config;
mod output;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use sqlreview_core::rules::{build_rules, RuleConfig, RuleType};
use sqlreview_core::schema::{Catalog, SchemaBuilder};
use sqlreview_core::{CheckContext, Reviewer, Rule, Severity, SqlDialect};
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command, OutputFormat};
use crate::config::Config;
use crate::output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing; RUST_LOG wins over -v/-q
    let level = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let quiet = args.quiet;
    match args.command {
        Command::Check {
            files,
            schema,
            schema_dir,
            config: config_path,
            dialect,
            format,
            disable,
            strict,
        } => {
            // Load configuration
            let config = if let Some(path) = config_path {
                Config::from_file(&path)?
            } else {
                Config::find_and_load()?.unwrap_or_default()
            };

            // Merge CLI args with config (CLI takes precedence)
            let config =
                config.merge_with_args(&schema, &schema_dir, &files, &dialect, &format, &disable);

            let dialect: SqlDialect = match &config.dialect {
                Some(name) => name.parse().map_err(|e: String| miette::miette!(e))?,
                None => SqlDialect::default(),
            };

            let output_format = match &config.format {
                Some(name) => name
                    .parse::<OutputFormat>()
                    .map_err(|e| miette::miette!(e))?,
                None => OutputFormat::Human,
            };

            let rule_configs = validate_rules(config.rule_configs(), strict)?;
            tracing::info!(rules = rule_configs.len(), %dialect, "rules configured");

            // The catalog is optional; without one, rules only see the script itself
            let schema_files = collect_schema_files(&config)?;
            let catalog = if schema_files.is_empty() {
                None
            } else {
                Some(load_catalog(&schema_files, dialect)?)
            };

            let query_files = expand_patterns(&config.files)?;
            if query_files.is_empty() {
                miette::bail!(
                    "No SQL files specified. Use positional arguments or configure in sqlreview.toml"
                );
            }

            let mut reviewer = Reviewer::new(dialect);
            if let Some(catalog) = &catalog {
                reviewer = reviewer.with_catalog(catalog);
            }
            let ctx = CheckContext::new();

            let mut total_errors = 0;
            let mut total_warnings = 0;
            let mut total_failures = 0;

            for query_file in &query_files {
                let content = fs::read_to_string(query_file).into_diagnostic()?;
                let report = reviewer
                    .check(&content, instantiate(&rule_configs), &ctx)
                    .map_err(miette::Report::new)?;

                for advice in &report.advice {
                    match advice.severity {
                        Severity::Error => total_errors += 1,
                        Severity::Warning => total_warnings += 1,
                        Severity::Info => {}
                    }
                }
                total_failures += report.failures.len();

                if !report.is_clean() || output_format != OutputFormat::Human {
                    let formatter =
                        OutputFormatter::new(output_format, query_file.display().to_string());
                    formatter.print_report(&report, &content)?;
                }
            }

            // Print summary
            if !quiet {
                if total_errors > 0 || total_warnings > 0 {
                    eprintln!();
                    eprintln!(
                        "Found {} error(s), {} warning(s) in {} file(s)",
                        total_errors,
                        total_warnings,
                        query_files.len()
                    );
                } else {
                    eprintln!("All {} file(s) passed review", query_files.len());
                }
                if total_failures > 0 {
                    eprintln!("{} rule(s) stopped early; see above", total_failures);
                }
            }

            Ok(total_errors > 0)
        }

        Command::Schema { files, dialect } => {
            let dialect: SqlDialect = dialect.parse().map_err(|e: String| miette::miette!(e))?;
            let catalog = load_catalog(&files, dialect)?;

            println!("Schema Information:");
            println!("==================");
            for (schema_name, schema) in &catalog.schemas {
                println!("\nSchema: {}", schema_name);
                for (table_name, table) in &schema.tables {
                    println!("  Table: {}", table_name);
                    for (col_name, col) in &table.columns {
                        let nullable = if col.nullable { "NULL" } else { "NOT NULL" };
                        println!(
                            "    - {} {} {}",
                            col_name,
                            col.data_type.display_name(),
                            nullable
                        );
                    }
                    for index in &table.indexes {
                        let kind = if index.primary {
                            "PRIMARY KEY"
                        } else if index.unique {
                            "UNIQUE"
                        } else {
                            "INDEX"
                        };
                        println!(
                            "    * {} {} ({})",
                            kind,
                            index.name.as_deref().unwrap_or("<unnamed>"),
                            index.columns.join(", ")
                        );
                    }
                }
            }

            Ok(false)
        }

        Command::Rules => {
            println!("Available rules:");
            println!("================");
            for rule_type in RuleType::ALL {
                println!("  {:<34} {}", rule_type.as_str(), rule_type.description());
            }
            Ok(false)
        }
    }
}

/// Build every rule once so configuration problems surface before any file
/// is reviewed. Invalid rules are dropped with a warning, or abort in strict mode.
fn validate_rules(configs: Vec<RuleConfig>, strict: bool) -> Result<Vec<RuleConfig>> {
    let mut valid = Vec::with_capacity(configs.len());
    for (config, (rule_type, built)) in configs.iter().zip(build_rules(&configs)) {
        match built {
            Ok(_) => valid.push(config.clone()),
            Err(err) if strict => return Err(miette::Report::new(err)),
            Err(err) => {
                tracing::warn!(rule = rule_type.as_str(), error = %err, "skipping misconfigured rule");
            }
        }
    }
    Ok(valid)
}

/// Fresh rule instances for one script
fn instantiate(configs: &[RuleConfig]) -> Vec<Box<dyn Rule>> {
    build_rules(configs)
        .into_iter()
        .filter_map(|(_, built)| built.ok())
        .collect()
}

fn collect_schema_files(config: &Config) -> Result<Vec<PathBuf>> {
    let mut schema_files = expand_patterns(&config.schema)?;
    if let Some(dir) = &config.schema_dir {
        let pattern = format!("{}/**/*.sql", dir);
        for path in glob::glob(&pattern).into_diagnostic()?.flatten() {
            schema_files.push(path);
        }
    }
    Ok(schema_files)
}

fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if pattern.contains('*') {
            for path in glob::glob(pattern).into_diagnostic()?.flatten() {
                paths.push(path);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

fn load_catalog(files: &[PathBuf], dialect: SqlDialect) -> Result<Catalog> {
    let mut builder = SchemaBuilder::with_dialect(dialect);
    for schema_file in files {
        let content = fs::read_to_string(schema_file).into_diagnostic()?;
        let skipped = builder.parse(&content);
        if skipped > 0 {
            tracing::debug!(file = %schema_file.display(), skipped, "skipped unsupported schema statements");
        }
    }
    let (catalog, warnings) = builder.build();
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    Ok(catalog)
}
