//! AE33 aethalometer file ingest
//!
//! AE33 exports are whitespace-delimited text files with a free-form preamble
//! followed by a header line starting with `Date`. The header names become
//! the table columns, with `Date(yyyy/MM/dd)` and `Time(hh:mm:ss)` renamed to
//! `date`/`time` and a synthetic `datetime` TEXT PRIMARY KEY prepended. The
//! schema is derived from the first discovered file of a run.
//!
//! Rows that fail date parsing or carry the wrong column count are skipped,
//! as are rows whose `datetime` is already present, so re-pushing the same
//! folder adds nothing.

use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Value;
use tracing::{debug, info};

use cass_core::{discovery, CassError, Result, Source, SourceConfig};

use crate::database::{db_err, quote_ident, Database};
use crate::ingest::IngestReport;

/// Discover and ingest all AE33 files for the configured source.
pub fn push(db: &Database, config: &SourceConfig, table: &str) -> Result<IngestReport> {
    let files = discovery::discover(Source::Ae33, config)?;
    let mut report = IngestReport::new(Source::Ae33);
    if files.is_empty() {
        info!("no AE33 files found under {}", config.data_location.display());
        return Ok(report);
    }

    let headers = extract_headers(&files[0])?;
    create_table(db, table, &headers)?;

    for (idx, path) in files.iter().enumerate() {
        let added = ingest_file(db, path, &headers, table)?;
        info!(
            "AE33 {}/{}: {} (+{} rows)",
            idx + 1,
            files.len(),
            path.display(),
            added
        );
        report.record(path.clone(), added);
    }
    info!("total AE33 rows added: {}", report.rows_added);
    Ok(report)
}

/// Read the column headers from an AE33 export.
///
/// The header line is the first line starting with `Date`, split on
/// whitespace or `;`.
pub fn extract_headers(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if line.starts_with("Date") {
            let mut headers = vec!["datetime".to_string()];
            headers.extend(
                line.split(|c: char| c.is_whitespace() || c == ';')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(|h| match h {
                        "Date(yyyy/MM/dd)" => "date".to_string(),
                        "Time(hh:mm:ss)" => "time".to_string(),
                        other => other.to_string(),
                    }),
            );
            return Ok(headers);
        }
    }
    Err(CassError::malformed(path, "no header line starting with 'Date'"))
}

fn create_table(db: &Database, table: &str, headers: &[String]) -> Result<()> {
    let mut columns = vec![format!("{} TEXT PRIMARY KEY", quote_ident("datetime"))];
    for h in &headers[1..] {
        let kind = if h == "date" || h == "time" { "TEXT" } else { "REAL" };
        columns.push(format!("{} {kind}", quote_ident(h)));
    }
    db.conn()
        .execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            quote_ident(table),
            columns.join(", ")
        ))
        .map_err(db_err)
}

fn ingest_file(db: &Database, path: &Path, headers: &[String], table: &str) -> Result<u64> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;
    let Some(start) = lines.iter().position(|l| l.starts_with("Date")) else {
        return Err(CassError::malformed(path, "no header line starting with 'Date'"));
    };

    let quoted: Vec<String> = headers.iter().map(|h| quote_ident(h)).collect();
    let placeholders: Vec<String> = (1..=headers.len()).map(|i| format!("?{i}")).collect();
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        quoted.join(", "),
        placeholders.join(",")
    );
    let exists_sql = format!(
        "SELECT 1 FROM {} WHERE \"datetime\" = ?1",
        quote_ident(table)
    );

    let tx = db.conn().unchecked_transaction().map_err(db_err)?;
    let mut added = 0u64;
    {
        let mut insert = tx.prepare(&insert_sql).map_err(db_err)?;
        let mut exists = tx.prepare(&exists_sql).map_err(db_err)?;

        for line in &lines[start + 1..] {
            let fields: Vec<&str> = line.split_whitespace().collect();
            // Trailing columns beyond the declared header are dropped.
            let fields = &fields[..fields.len().min(headers.len() - 1)];
            if fields.len() < 2 {
                continue;
            }

            let Ok(date) = NaiveDate::parse_from_str(fields[0], "%Y/%m/%d") else {
                continue;
            };
            let Ok(time) = NaiveTime::parse_from_str(fields[1], "%H:%M:%S") else {
                continue;
            };
            let date = date.format("%Y-%m-%d").to_string();
            let time = time.format("%H:%M:%S").to_string();
            let datetime = format!("{date} {time}");

            // datetime + date + time + measurements must line up exactly.
            if fields.len() + 1 != headers.len() {
                debug!("skipping short row in {}: {} fields", path.display(), fields.len());
                continue;
            }

            if exists.exists([&datetime]).map_err(db_err)? {
                continue;
            }

            let mut values: Vec<Value> = Vec::with_capacity(headers.len());
            values.push(Value::Text(datetime));
            values.push(Value::Text(date));
            values.push(Value::Text(time));
            for field in &fields[2..] {
                values.push(match field.parse::<f64>() {
                    Ok(v) => Value::Real(v),
                    Err(_) => Value::Text(field.to_string()),
                });
            }

            insert
                .execute(rusqlite::params_from_iter(values))
                .map_err(db_err)?;
            added += 1;
        }
    }
    tx.commit().map_err(db_err)?;
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SAMPLE: &str = "\
AE33 Aethalometer export
Serial: AE33-S10-01234

Date(yyyy/MM/dd); Time(hh:mm:ss); BC1 BC2 BC3 BC4 BC5 BC6 BC7
2024/06/01 00:00:00 512 498 470 455 430 410 395
2024/06/01 00:01:00 515 501 473 458 433 412 397
garbage line without dates
2024/06/01 00:02:00 518
";

    fn setup() -> (tempfile::TempDir, Database, SourceConfig) {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("rawData");
        fs::create_dir_all(&raw).unwrap();
        fs::write(raw.join("AE33_AE33-S10_20240601.dat"), SAMPLE).unwrap();
        let db = Database::install(dir.path().join("cass.db")).unwrap();
        let config = SourceConfig {
            data_location: raw,
            file_prefix: "AE33_AE33-S10".to_string(),
        };
        (dir, db, config)
    }

    #[test]
    fn test_extract_headers_renames_date_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AE33_test.dat");
        fs::write(&path, SAMPLE).unwrap();
        let headers = extract_headers(&path).unwrap();
        assert_eq!(
            headers,
            vec![
                "datetime", "date", "time", "BC1", "BC2", "BC3", "BC4", "BC5", "BC6", "BC7"
            ]
        );
    }

    #[test]
    fn test_extract_headers_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AE33_empty.dat");
        fs::write(&path, "no header here\n").unwrap();
        assert!(matches!(
            extract_headers(&path),
            Err(CassError::MalformedFile { .. })
        ));
    }

    #[test]
    fn test_push_skips_bad_rows() {
        let (_dir, db, config) = setup();
        let report = push(&db, &config, "AE33_raw").unwrap();
        // Two well-formed rows; the garbage and short rows are skipped.
        assert_eq!(report.rows_added, 2);
        assert_eq!(report.files.len(), 1);

        let dt: String = db
            .conn()
            .query_row(
                "SELECT datetime FROM AE33_raw ORDER BY datetime LIMIT 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(dt, "2024-06-01 00:00:00");

        let bc1: f64 = db
            .conn()
            .query_row(
                "SELECT BC1 FROM AE33_raw WHERE datetime = '2024-06-01 00:01:00'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(bc1, 515.0);
    }

    #[test]
    fn test_push_is_idempotent() {
        let (_dir, db, config) = setup();
        let first = push(&db, &config, "AE33_raw").unwrap();
        assert_eq!(first.rows_added, 2);
        let second = push(&db, &config, "AE33_raw").unwrap();
        assert_eq!(second.rows_added, 0);

        let count: u64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM AE33_raw", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_push_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("rawData");
        fs::create_dir_all(&raw).unwrap();
        let db = Database::install(dir.path().join("cass.db")).unwrap();
        let config = SourceConfig {
            data_location: raw,
            file_prefix: "AE33_".to_string(),
        };
        let report = push(&db, &config, "AE33_raw").unwrap();
        assert_eq!(report.rows_added, 0);
        assert!(report.files.is_empty());
    }
}
