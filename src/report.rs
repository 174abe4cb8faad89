use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::types::Row;

/// Columns produced by the search projection, in display order.
pub const SEARCH_COLUMNS: [&str; 3] = ["sport", "event", "selection"];

/// Summary of a search run.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub rows: Vec<Row>,
    pub sports: usize,
    pub events: usize,
    pub selections: usize,
}

impl SearchReport {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let distinct = |column: &str| -> usize {
            rows.iter()
                .filter_map(|r| r.get(column).and_then(Value::as_str))
                .collect::<BTreeSet<_>>()
                .len()
        };

        let sports = distinct("sport");
        let events = distinct("event");
        let selections = distinct("selection");

        Self {
            rows,
            sports,
            events,
            selections,
        }
    }

    /// Print a formatted text report to stdout.
    pub fn print(&self) {
        let width = |column: &str| -> usize {
            self.rows
                .iter()
                .map(|r| cell(r, column).len())
                .chain(std::iter::once(column.len()))
                .max()
                .unwrap_or(column.len())
        };
        let widths: Vec<usize> = SEARCH_COLUMNS.iter().map(|c| width(c)).collect();
        let total: usize = widths.iter().sum::<usize>() + 3 * (widths.len() - 1);

        println!();
        println!("{}", "=".repeat(total.max(40)));
        println!(
            "  Search: {} rows ({} sports, {} events, {} selections)",
            self.rows.len(),
            self.sports,
            self.events,
            self.selections
        );
        println!("{}", "=".repeat(total.max(40)));
        println!();

        let header: Vec<String> = SEARCH_COLUMNS
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        println!("{}", header.join(" | "));
        println!("{}", "-".repeat(total));

        for row in &self.rows {
            let line: Vec<String> = SEARCH_COLUMNS
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<w$}", cell(row, c), w = *w))
                .collect();
            println!("{}", line.join(" | "));
        }
        println!();
    }

    /// Export the rows to a CSV file. Columns follow the first row.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create CSV at {}", path.display()))?;

        let columns: Vec<&String> = match self.rows.first() {
            Some(first) => first.keys().collect(),
            None => {
                wtr.write_record(SEARCH_COLUMNS)
                    .context("failed to write CSV header")?;
                wtr.flush().context("failed to flush CSV")?;
                return Ok(());
            }
        };

        wtr.write_record(columns.iter().map(|c| c.as_str()))
            .context("failed to write CSV header")?;
        for (i, row) in self.rows.iter().enumerate() {
            wtr.write_record(columns.iter().map(|c| cell(row, c)))
                .with_context(|| format!("failed to write CSV row {}", i))?;
        }

        wtr.flush().context("failed to flush CSV")?;
        Ok(())
    }
}

fn cell(row: &Row, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
