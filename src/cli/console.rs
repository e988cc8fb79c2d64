//! Terminal result sink
//!
//! Prints the run log as it is produced, keeps a spinner with the live
//! counters underneath it, and renders the results table once the run ends.

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::sink::{ResultSink, TestStatus};

/// One row of the results table
#[derive(Debug, Clone)]
struct Row {
    name: String,
    status: TestStatus,
    duration: String,
}

/// Result sink that renders to the terminal
pub struct ConsoleSink {
    bar: ProgressBar,
    status: String,
    stats: String,
    rows: Vec<Row>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            status: String::new(),
            stats: String::new(),
            rows: Vec::new(),
        }
    }

    /// Stop the spinner
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Last status text received
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Print the results table and final counters
    pub fn print_table(&self) {
        if self.rows.is_empty() {
            return;
        }

        let width = self.rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
        println!();
        println!("  {:<width$}  {:<8}  {}", "Test", "Status", "Duration", width = width + 2);
        for row in &self.rows {
            let (mark, status) = match row.status {
                TestStatus::Passed => ("✓".green(), row.status.to_string().green()),
                TestStatus::Failed => ("✗".red(), row.status.to_string().red()),
            };
            println!(
                "  {} {:<width$}  {:<8}  {}",
                mark,
                row.name,
                status,
                row.duration.dimmed(),
                width = width
            );
        }
        println!();
        if !self.stats.is_empty() {
            println!("  {}", self.stats);
        }
    }

    fn refresh(&self) {
        if self.stats.is_empty() {
            self.bar.set_message(self.status.clone());
        } else {
            self.bar.set_message(format!("{} | {}", self.status, self.stats));
        }
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("status", &self.status)
            .field("stats", &self.stats)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Colour a run log line by its level tag
fn style_line(line: &str) -> String {
    if line.starts_with("[PASS]") {
        line.green().to_string()
    } else if line.starts_with("[FAIL]") || line.starts_with("[ERROR]") {
        line.red().to_string()
    } else if line.starts_with("[WARNING]") {
        line.yellow().to_string()
    } else if line.starts_with("[DEBUG]") {
        line.dimmed().to_string()
    } else {
        line.to_string()
    }
}

impl ResultSink for ConsoleSink {
    fn notify_status(&mut self, text: &str) {
        self.status = text.to_string();
        self.refresh();
        self.bar.suspend(|| println!("{}", text.bold()));
    }

    fn append_log(&mut self, line: &str) {
        // Hidden bars still run the closure, so output survives a non-tty stderr
        let styled = style_line(line);
        self.bar.suspend(|| println!("{}", styled));
    }

    fn record_test_result(&mut self, name: &str, status: TestStatus, duration: &str) {
        self.rows.push(Row {
            name: name.to_string(),
            status,
            duration: duration.to_string(),
        });
    }

    fn update_stats(&mut self, total: usize, passed: usize, failed: usize, elapsed: &str) {
        self.stats = format!(
            "{} run, {} passed, {} failed, elapsed {}",
            total, passed, failed, elapsed
        );
        self.refresh();
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.stats.clear();
        self.refresh();
    }
}
