//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gauntlet_suite::pipeline::StagedArtifact;
use gauntlet_suite::result::PlannedRun;
use gauntlet_suite::{SuiteReport, TestResult};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for TestResult {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Kind", "Status", "Time", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        let status = if self.success { "pass" } else { "FAIL" };
        let detail = if self.success { String::new() } else { self.summary() };
        vec![
            self.file.display().to_string(),
            self.category.to_string(),
            status.to_string(),
            format!("{} ms", self.duration_ms),
            detail,
        ]
    }
}

impl TableDisplay for PlannedRun {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Kind"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.file.display().to_string(), self.category.to_string()]
    }
}

impl TableDisplay for StagedArtifact {
    fn headers() -> Vec<&'static str> {
        vec!["Source", "Staged As", "Rule"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.source.display().to_string(),
            self.destination.display().to_string(),
            (self.rule + 1).to_string(),
        ]
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print the suite report: every file with its outcome, then totals
pub fn print_report(report: &SuiteReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
            return;
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(report).unwrap_or_default());
            return;
        }
        OutputFormat::Table | OutputFormat::Plain => {}
    }

    if report.dry_run {
        print_list(&report.planned, format);
    } else {
        print_list(&report.results, format);
    }

    let summary = format!(
        "{} passed, {} failed, {} total ({} ms)",
        report.passed, report.failed, report.total, report.duration_ms
    );
    if report.success() {
        print_success(&summary);
    } else {
        print_error(&summary);
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✔".green().bold(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✘".red().bold(), message);
}
