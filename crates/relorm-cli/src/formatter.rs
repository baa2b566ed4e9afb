//! Output formatting for command results.

use clap::ValueEnum;
use relorm_core::{MigrationPlan, MigrationResult};
use serde_json::json;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain SQL text, one statement per line
    Text,
    /// JSON document
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn terminate(sql: &str) -> String {
    if sql.trim_end().ends_with(';') {
        sql.to_string()
    } else {
        format!("{};", sql)
    }
}

/// Format a list of SQL statements.
pub fn format_statements(statements: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => statements
            .iter()
            .map(|s| terminate(s))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => json!({ "statements": statements }).to_string(),
    }
}

/// Format a migration plan that was not applied.
pub fn format_plan(plan: &MigrationPlan, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if plan.is_empty() {
                return format!("-- schema is at version {}", plan.to_version);
            }
            let mut lines = vec![format!(
                "-- upgrade from version {} to {}",
                plan.from_version, plan.to_version
            )];
            for (i, step) in plan.steps.iter().enumerate() {
                lines.push(format!("-- step {}: {}", i, step.description()));
                lines.extend(step.statements().into_iter().map(terminate));
            }
            lines.join("\n")
        }
        OutputFormat::Json => json!({
            "from_version": plan.from_version,
            "to_version": plan.to_version,
            "steps": plan
                .steps
                .iter()
                .map(|step| json!({
                    "description": step.description(),
                    "statements": step.statements(),
                }))
                .collect::<Vec<_>>(),
        })
        .to_string(),
    }
}

/// Format the outcome of an applied migration.
pub fn format_result(result: &MigrationResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if result.steps_executed == 0 {
                format!("schema is at version {}", result.to_version)
            } else {
                format!(
                    "upgraded from version {} to {} ({} step(s), {} statement(s))",
                    result.from_version,
                    result.to_version,
                    result.steps_executed,
                    result.statements.len()
                )
            }
        }
        OutputFormat::Json => json!({
            "from_version": result.from_version,
            "to_version": result.to_version,
            "steps_executed": result.steps_executed,
            "statements": result.statements,
        })
        .to_string(),
    }
}

/// Format a stored schema version.
pub fn format_version(version: i64, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => version.to_string(),
        OutputFormat::Json => json!({ "version": version }).to_string(),
    }
}
