//! TCA total-carbon analyzer file ingest
//!
//! TCA exports are plain CSV with an `ID` column as primary key. Columns
//! whose name contains `Time` are normalized to `%Y-%m-%d %H:%M:%S` (invalid
//! values become NULL), the known measurement columns get REAL affinity, and
//! a derived `date` column is taken from the date part of `StartTimeLocal`.
//!
//! Unlike AE33, each file carries its own header and the table is created
//! from the first ingested file; rows with a non-integer `ID` or wrong field
//! count are skipped, and existing `ID`s are never overwritten.

use std::path::Path;

use rusqlite::types::Value;
use tracing::{info, warn};

use cass_core::{discovery, CassError, Result, Source, SourceConfig};

use crate::database::{db_err, parse_timestamp, quote_ident, Database};
use crate::ingest::IngestReport;

/// Columns stored with REAL affinity.
const NUMERIC_COLUMNS: [&str; 9] = [
    "TCcounts", "TCmass", "TCconc", "AE33_BC6", "AE33_b", "OC", "EC", "CO2", "Volume",
];

/// Discover and ingest all TCA files for the configured source.
pub fn push(db: &Database, config: &SourceConfig, table: &str) -> Result<IngestReport> {
    let files = discovery::discover(Source::Tca, config)?;
    let mut report = IngestReport::new(Source::Tca);
    if files.is_empty() {
        info!("no TCA files found under {}", config.data_location.display());
        return Ok(report);
    }

    for (idx, path) in files.iter().enumerate() {
        let added = ingest_file(db, path, table)?;
        info!(
            "TCA {}/{}: {} (+{} rows)",
            idx + 1,
            files.len(),
            path.display(),
            added
        );
        report.record(path.clone(), added);
    }
    info!("total TCA rows added: {}", report.rows_added);
    Ok(report)
}

fn create_table(db: &Database, table: &str, headers: &[String]) -> Result<()> {
    let mut columns = vec![format!("{} INTEGER PRIMARY KEY", quote_ident("ID"))];
    for h in &headers[1..] {
        let kind = if h.contains("Time") {
            "TEXT"
        } else if NUMERIC_COLUMNS.contains(&h.as_str()) {
            "REAL"
        } else {
            "TEXT"
        };
        columns.push(format!("{} {kind}", quote_ident(h)));
    }
    columns.push(format!("{} TEXT", quote_ident("date")));
    db.conn()
        .execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            quote_ident(table),
            columns.join(", ")
        ))
        .map_err(db_err)
}

fn ingest_file(db: &Database, path: &Path, table: &str) -> Result<u64> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| CassError::malformed(path, e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CassError::malformed(path, e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.first().map(String::as_str) != Some("ID") {
        warn!("missing 'ID' column in {}, skipping file", path.display());
        return Ok(0);
    }
    let start_time_idx = headers.iter().position(|h| h == "StartTimeLocal");

    create_table(db, table, &headers)?;

    let mut quoted: Vec<String> = headers.iter().map(|h| quote_ident(h)).collect();
    quoted.push(quote_ident("date"));
    let placeholders: Vec<String> = (1..=quoted.len()).map(|i| format!("?{i}")).collect();
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        quoted.join(", "),
        placeholders.join(",")
    );
    let exists_sql = format!("SELECT 1 FROM {} WHERE \"ID\" = ?1", quote_ident(table));

    let tx = db.conn().unchecked_transaction().map_err(db_err)?;
    let mut added = 0u64;
    {
        let mut insert = tx.prepare(&insert_sql).map_err(db_err)?;
        let mut exists = tx.prepare(&exists_sql).map_err(db_err)?;

        for record in reader.records() {
            let record = record.map_err(|e| CassError::malformed(path, e.to_string()))?;
            if record.is_empty() || record.len() != headers.len() {
                continue;
            }
            let Ok(id) = record[0].trim().parse::<i64>() else {
                continue;
            };
            if exists.exists([id]).map_err(db_err)? {
                continue;
            }

            let mut values: Vec<Value> = Vec::with_capacity(headers.len() + 1);
            values.push(Value::Integer(id));
            for (header, field) in headers.iter().zip(record.iter()).skip(1) {
                if header.contains("Time") {
                    values.push(match parse_timestamp(field.trim()) {
                        Some(ts) => Value::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
                        None => Value::Null,
                    });
                } else {
                    values.push(Value::Text(field.trim().to_string()));
                }
            }

            // Derived date column from the start-of-measurement timestamp.
            let date = start_time_idx
                .map(|i| &values[i])
                .and_then(|v| match v {
                    Value::Text(s) => s.split_whitespace().next().map(str::to_string),
                    _ => None,
                });
            values.push(match date {
                Some(d) => Value::Text(d),
                None => Value::Null,
            });

            insert
                .execute(rusqlite::params_from_iter(values))
                .map_err(db_err)?;
            added += 1;
        }
    }
    tx.commit().map_err(db_err)?;
    Ok(added)
}
