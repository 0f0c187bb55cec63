//! Time-gap detection over the raw tables
//!
//! Two flavors:
//! - [`audit`] — the interactive audit: the gap threshold is the modal
//!   interval of the whole series, so it adapts to each instrument's
//!   cadence.
//! - [`gaps_in_range`] — fixed-threshold window query used by the speciation
//!   report (AE33 > 1 minute, TCA > 60 minutes).

use chrono::NaiveDate;
use rusqlite::params;

use cass_core::{Gap, Result};

use crate::database::{db_err, modal_interval_minutes, parse_timestamp, quote_ident, Database};

/// Result of a modal-interval audit.
#[derive(Debug, Clone)]
pub struct AuditResult {
    /// Modal interval between successive rows, minutes.
    pub threshold_minutes: f64,
    pub gaps: Vec<Gap>,
}

/// Detect gaps wider than the series' own modal interval.
pub fn audit(db: &Database, table: &str, time_column: &str) -> Result<AuditResult> {
    let t = quote_ident(table);
    let c = quote_ident(time_column);

    let mut stmt = db
        .conn()
        .prepare(&format!("SELECT {c} FROM {t} WHERE {c} IS NOT NULL ORDER BY {c}"))
        .map_err(db_err)?;
    let timestamps: Vec<_> = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(db_err)?
        .filter_map(|r| r.ok())
        .filter_map(|s| parse_timestamp(&s))
        .collect();

    let Some(threshold_minutes) = modal_interval_minutes(&timestamps) else {
        return Ok(AuditResult {
            threshold_minutes: 0.0,
            gaps: Vec::new(),
        });
    };

    let gaps = timestamps
        .windows(2)
        .filter_map(|w| {
            let minutes = (w[1] - w[0]).num_seconds() as f64 / 60.0;
            (minutes > threshold_minutes).then(|| Gap {
                gap_start: w[0],
                gap_end: w[1],
                gap_minutes: (minutes * 100.0).round() / 100.0,
            })
        })
        .collect();

    Ok(AuditResult {
        threshold_minutes,
        gaps,
    })
}

/// Gaps wider than `threshold_minutes` within a date range, computed in SQL
/// with a window function.
pub fn gaps_in_range(
    db: &Database,
    table: &str,
    time_column: &str,
    start: NaiveDate,
    end: NaiveDate,
    threshold_minutes: i64,
) -> Result<Vec<Gap>> {
    let t = quote_ident(table);
    let c = quote_ident(time_column);
    let sql = format!(
        "WITH ordered AS (
            SELECT {c} AS ts,
                   LAG({c}) OVER (ORDER BY {c}) AS prev_ts
            FROM {t}
            WHERE {c} >= ?1 AND {c} <= ?2
        )
        SELECT prev_ts,
               ts,
               (strftime('%s', ts) - strftime('%s', prev_ts)) / 60.0 AS gap_minutes
        FROM ordered
        WHERE ((strftime('%s', ts) - strftime('%s', prev_ts)) / 60) > ?3
        ORDER BY prev_ts"
    );

    let mut stmt = db.conn().prepare(&sql).map_err(db_err)?;
    let rows = stmt
        .query_map(
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string(),
                threshold_minutes
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            },
        )
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(rows
        .into_iter()
        .filter_map(|(prev, ts, minutes)| {
            Some(Gap {
                gap_start: parse_timestamp(&prev)?,
                gap_end: parse_timestamp(&ts)?,
                gap_minutes: minutes,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::install(dir.path().join("cass.db")).unwrap();
        db.conn()
            .execute_batch(
                "CREATE TABLE \"AE33_raw\" (datetime TEXT PRIMARY KEY);
                 INSERT INTO \"AE33_raw\" VALUES
                   ('2024-06-01 00:00:00'),
                   ('2024-06-01 00:01:00'),
                   ('2024-06-01 00:02:00'),
                   ('2024-06-01 00:03:00'),
                   ('2024-06-01 00:10:00'),
                   ('2024-06-01 00:11:00');",
            )
            .unwrap();
        (dir, db)
    }

    #[test]
    fn test_audit_detects_gap_above_modal_interval() {
        let (_dir, db) = seeded_db();
        let result = audit(&db, "AE33_raw", "datetime").unwrap();
        assert_eq!(result.threshold_minutes, 1.0);
        assert_eq!(result.gaps.len(), 1);
        let gap = &result.gaps[0];
        assert_eq!(gap.gap_start.to_string(), "2024-06-01 00:03:00");
        assert_eq!(gap.gap_end.to_string(), "2024-06-01 00:10:00");
        assert_eq!(gap.gap_minutes, 7.0);
    }

    #[test]
    fn test_audit_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::install(dir.path().join("cass.db")).unwrap();
        db.conn()
            .execute_batch("CREATE TABLE \"TCA_raw\" (\"StartTimeLocal\" TEXT);")
            .unwrap();
        let result = audit(&db, "TCA_raw", "StartTimeLocal").unwrap();
        assert!(result.gaps.is_empty());
        assert_eq!(result.threshold_minutes, 0.0);
    }

    #[test]
    fn test_gaps_in_range_threshold() {
        let (_dir, db) = seeded_db();
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();

        let gaps = gaps_in_range(&db, "AE33_raw", "datetime", start, end, 1).unwrap();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].gap_minutes, 7.0);

        // A 7-minute gap disappears behind a 60-minute threshold.
        let gaps = gaps_in_range(&db, "AE33_raw", "datetime", start, end, 60).unwrap();
        assert!(gaps.is_empty());
    }

    #[test]
    fn test_gaps_in_range_respects_window() {
        let (_dir, db) = seeded_db();
        let start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        let gaps = gaps_in_range(&db, "AE33_raw", "datetime", start, end, 1).unwrap();
        assert!(gaps.is_empty());
    }
}
