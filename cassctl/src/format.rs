//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use tabled::{settings::Style, Table, Tabled};

use cass_core::{Gap, TableStats};
use cass_store::{AuditResult, IngestReport};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Format a success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}

fn format_opt_ts(ts: &Option<chrono::NaiveDateTime>) -> String {
    match ts {
        Some(ts) => ts.to_string(),
        None => "-".dimmed().to_string(),
    }
}

/// Format table statistics shown by `check` and before a speciation run
pub fn format_table_stats(stats: &[TableStats], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(stats)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct StatsRow {
                #[tabled(rename = "Table")]
                table: String,
                #[tabled(rename = "First")]
                first: String,
                #[tabled(rename = "Last")]
                last: String,
                #[tabled(rename = "Rows")]
                rows: String,
                #[tabled(rename = "Resolution")]
                resolution: String,
            }

            let rows: Vec<StatsRow> = stats
                .iter()
                .map(|s| StatsRow {
                    table: s.table.clone().cyan().to_string(),
                    first: format_opt_ts(&s.min_timestamp),
                    last: format_opt_ts(&s.max_timestamp),
                    rows: if s.row_count > 0 {
                        s.row_count.to_string().green().to_string()
                    } else {
                        "0".red().to_string()
                    },
                    resolution: match s.resolution_minutes {
                        Some(m) => format!("{m} min"),
                        None => "-".dimmed().to_string(),
                    },
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Table Summary:".bold(), table))
        }
    }
}

/// Format an ingest report
pub fn format_ingest_report(report: &IngestReport, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct FileRow {
                #[tabled(rename = "File")]
                file: String,
                #[tabled(rename = "Rows Added")]
                rows: String,
            }

            let rows: Vec<FileRow> = report
                .files
                .iter()
                .map(|f| FileRow {
                    file: f.path.display().to_string(),
                    rows: if f.rows_added > 0 {
                        f.rows_added.to_string().green().to_string()
                    } else {
                        "0".dimmed().to_string()
                    },
                })
                .collect();

            let mut output = format!("{}", format!("{} ingest:", report.source).bold());
            if rows.is_empty() {
                output.push_str("\nNo files found.");
            } else {
                let table = Table::new(rows).with(Style::rounded()).to_string();
                output.push('\n');
                output.push_str(&table);
            }
            output.push('\n');
            output.push_str(&format!(
                "Total new rows: {}",
                report.rows_added.to_string().green()
            ));
            Ok(output)
        }
    }
}

fn gap_rows(gaps: &[Gap]) -> Vec<GapRow> {
    gaps.iter()
        .map(|g| GapRow {
            start: g.gap_start.to_string(),
            end: g.gap_end.to_string(),
            minutes: format!("{:.2}", g.gap_minutes).yellow().to_string(),
        })
        .collect()
}

#[derive(Tabled)]
struct GapRow {
    #[tabled(rename = "Gap Start")]
    start: String,
    #[tabled(rename = "Gap End")]
    end: String,
    #[tabled(rename = "Minutes")]
    minutes: String,
}

/// Format a gap audit result
pub fn format_audit(table: &str, audit: &AuditResult, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "table": table,
                "threshold_minutes": audit.threshold_minutes,
                "gaps": audit.gaps,
            });
            Ok(serde_json::to_string_pretty(&value)?)
        }
        OutputFormat::Table => {
            let header = format!(
                "Gaps in {} (threshold {} min):",
                table.cyan(),
                audit.threshold_minutes
            )
            .bold()
            .to_string();
            if audit.gaps.is_empty() {
                return Ok(format!("{header}\n{}", "No gaps detected.".green()));
            }
            let table = Table::new(gap_rows(&audit.gaps))
                .with(Style::rounded())
                .to_string();
            Ok(format!(
                "{header}\n{table}\n{} gap(s) found",
                audit.gaps.len().to_string().yellow()
            ))
        }
    }
}

/// Format configuration entries from one conf file
pub fn format_config_entries(
    title: &str,
    entries: &[(String, String)],
    format: &OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            Ok(serde_json::to_string_pretty(&serde_json::json!({ title: map }))?)
        }
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct EntryRow {
                #[tabled(rename = "Key")]
                key: String,
                #[tabled(rename = "Value")]
                value: String,
            }

            let rows: Vec<EntryRow> = entries
                .iter()
                .map(|(k, v)| EntryRow {
                    key: k.clone().cyan().to_string(),
                    value: v.clone(),
                })
                .collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", title.bold(), table))
        }
    }
}
