//! Output formatting utilities

use crate::error::CliResult;
use colored::*;
use rigging_orchestrator::{StepLog, StepOutcome};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Table row for one pipeline step
#[derive(Debug, Serialize, Tabled)]
pub struct StepRow {
    /// Step name
    step: String,
    /// Outcome
    outcome: String,
    /// Detail
    detail: String,
}

impl StepRow {
    pub fn rows(steps: &StepLog) -> Vec<StepRow> {
        steps
            .records()
            .iter()
            .map(|r| StepRow {
                step: r.step.to_string(),
                outcome: match r.outcome {
                    StepOutcome::Completed => r.outcome.to_string().green().to_string(),
                    StepOutcome::Skipped => r.outcome.to_string().dimmed().to_string(),
                    StepOutcome::Degraded => r.outcome.to_string().yellow().to_string(),
                },
                detail: r.detail.clone().unwrap_or_default(),
            })
            .collect()
    }
}

/// Print a vector of items in the specified format
pub fn print_output<T: Serialize + Tabled>(data: Vec<T>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No results".dimmed());
            } else {
                let table = Table::new(data).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&data)?);
        }
    }
    Ok(())
}

/// Print a single item in the specified format
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigging_orchestrator::Step;

    #[test]
    fn test_output_format_default() {
        let format = OutputFormat::default();
        assert!(matches!(format, OutputFormat::Table));
    }

    #[test]
    fn test_step_rows_follow_log() {
        colored::control::set_override(false);
        let mut log = StepLog::default();
        log.completed(Step::CompilePlan);
        log.skipped(Step::ConfigureNetwork, "automated run");

        let rows = StepRow::rows(&log);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].step, "configure-network");
        assert_eq!(rows[1].outcome, "skipped");
        assert_eq!(rows[1].detail, "automated run");
    }
}
