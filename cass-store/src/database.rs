//! SQLite database access
//!
//! Open/install/health-check plumbing shared by ingest, audit, and analysis.
//! All storage errors are surfaced as [`CassError::Database`] with the
//! SQLite message attached.

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{Connection, OpenFlags};
use tracing::info;

use cass_core::{CassError, Result, TableStats};

/// Timestamp format used throughout the database (TEXT columns).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rows sampled from the head of a table when estimating its resolution.
const RESOLUTION_SAMPLE: usize = 100;

pub(crate) fn db_err(e: rusqlite::Error) -> CassError {
    CassError::Database(e.to_string())
}

/// Quote an identifier for embedding in SQL (table names come from
/// `db.conf`, not from a fixed schema).
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

/// An open CASS database.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open an existing database read-write.
    ///
    /// Fails when the file does not exist; use [`Database::install`] to
    /// create one.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CassError::Database(format!(
                "database file not found: {}",
                path.display()
            )));
        }
        let conn = Connection::open(path).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Open an existing database read-only (audit and analysis paths).
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CassError::Database(format!(
                "database file not found: {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Create the database file (and parent directories) if missing, then
    /// verify read/write access with a scratch table.
    pub fn install(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_file() {
            info!("database already exists at {}", path.display());
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            info!("creating new database at {}", path.display());
        }
        let conn = Connection::open(path).map_err(db_err)?;
        let db = Self { conn };
        db.read_write_self_test()?;
        Ok(db)
    }

    fn read_write_self_test(&self) -> Result<()> {
        let result: std::result::Result<String, rusqlite::Error> = (|| {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS _install_test (id INTEGER PRIMARY KEY, msg TEXT);",
            )?;
            self.conn.execute(
                "INSERT INTO _install_test (msg) VALUES (?1)",
                ["write test"],
            )?;
            let msg: String = self
                .conn
                .query_row("SELECT msg FROM _install_test LIMIT 1", [], |row| {
                    row.get(0)
                })?;
            self.conn.execute_batch("DROP TABLE _install_test;")?;
            Ok(msg)
        })();

        match result {
            Ok(msg) if msg == "write test" => Ok(()),
            Ok(other) => Err(CassError::Database(format!(
                "read/write self-test returned unexpected value: {other:?}"
            ))),
            Err(e) => Err(CassError::Database(format!(
                "read/write self-test failed: {e}"
            ))),
        }
    }

    /// List user tables, the connection check used by `cassctl check`.
    pub fn tables(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .map_err(db_err)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(names)
    }

    /// Summarize a raw table: timestamp range, row count, and the modal
    /// sampling interval estimated from the head of the table.
    pub fn table_stats(&self, table: &str, time_column: &str) -> Result<TableStats> {
        let t = quote_ident(table);
        let c = quote_ident(time_column);

        let (min_ts, max_ts, count): (Option<String>, Option<String>, u64) = self
            .conn
            .query_row(
                &format!("SELECT MIN({c}), MAX({c}), COUNT(*) FROM {t}"),
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(db_err)?;

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {c} FROM {t} ORDER BY {c} LIMIT {RESOLUTION_SAMPLE}"
            ))
            .map_err(db_err)?;
        let sample: Vec<NaiveDateTime> = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .filter_map(|r| r.ok())
            .filter_map(|s| parse_timestamp(&s))
            .collect();

        Ok(TableStats {
            table: table.to_string(),
            min_timestamp: min_ts.as_deref().and_then(parse_timestamp),
            max_timestamp: max_ts.as_deref().and_then(parse_timestamp),
            row_count: count,
            resolution_minutes: modal_interval_minutes(&sample),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Mode of successive intervals, in minutes. Ties resolve to the earliest
/// encountered interval.
pub(crate) fn modal_interval_minutes(timestamps: &[NaiveDateTime]) -> Option<f64> {
    if timestamps.len() < 2 {
        return None;
    }
    let diffs: Vec<i64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds())
        .collect();

    let mut counts: Vec<(i64, usize)> = Vec::new();
    for d in diffs {
        match counts.iter_mut().find(|(v, _)| *v == d) {
            Some(entry) => entry.1 += 1,
            None => counts.push((d, 1)),
        }
    }
    counts
        .iter()
        .max_by_key(|(_, n)| *n)
        .map(|(secs, _)| *secs as f64 / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SQLite").join("cass.db");
        let db = Database::install(&path).unwrap();
        assert!(path.is_file());
        // Self-test scratch table is cleaned up.
        assert!(db.tables().unwrap().is_empty());
    }

    #[test]
    fn test_install_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cass.db");
        Database::install(&path).unwrap();
        Database::install(&path).unwrap();
    }

    #[test]
    fn test_open_missing_file_fails() {
        let err = Database::open("/nonexistent/cass.db").unwrap_err();
        assert!(err.to_string().contains("not found"));
        let err = Database::open_read_only("/nonexistent/cass.db").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_table_stats() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::install(dir.path().join("cass.db")).unwrap();
        db.conn()
            .execute_batch(
                "CREATE TABLE \"AE33_raw\" (datetime TEXT PRIMARY KEY);
                 INSERT INTO \"AE33_raw\" VALUES
                   ('2024-06-01 00:00:00'),
                   ('2024-06-01 00:01:00'),
                   ('2024-06-01 00:02:00'),
                   ('2024-06-01 00:10:00');",
            )
            .unwrap();

        let stats = db.table_stats("AE33_raw", "datetime").unwrap();
        assert_eq!(stats.row_count, 4);
        assert_eq!(
            stats.min_timestamp.unwrap().to_string(),
            "2024-06-01 00:00:00"
        );
        assert_eq!(
            stats.max_timestamp.unwrap().to_string(),
            "2024-06-01 00:10:00"
        );
        assert_eq!(stats.resolution_minutes, Some(1.0));
    }

    #[test]
    fn test_modal_interval_empty_and_tied() {
        assert_eq!(modal_interval_minutes(&[]), None);

        let base = parse_timestamp("2024-06-01 00:00:00").unwrap();
        let ts: Vec<NaiveDateTime> = [0i64, 60, 180].iter().map(|&s| base + chrono::Duration::seconds(s)).collect();
        // One 1-minute and one 2-minute diff; earliest wins the tie.
        assert_eq!(modal_interval_minutes(&ts), Some(1.0));
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("AE33_raw"), "\"AE33_raw\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
