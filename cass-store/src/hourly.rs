//! Interval-bucketed averaging across the AE33 and TCA tables
//!
//! One SQL pass buckets both tables onto a common time grid (unix-epoch
//! integer division by the averaging interval), averages each side's
//! measurement columns per bucket, and full-outer-joins the bucket sets.
//! Buckets where one instrument has no rows carry the -99 sentinel on that
//! side, matching the station's export convention.

use chrono::NaiveDate;
use rusqlite::params;

use cass_core::{DbConfig, HourlyRecord, Result};

use crate::database::{db_err, parse_timestamp, quote_ident, Database};

/// Supported averaging intervals, minutes.
pub const ALLOWED_INTERVALS_MIN: [u32; 4] = [20, 30, 60, 120];

/// Fetch interval-averaged records for `start..=end`.
///
/// `interval_seconds` must come from [`ALLOWED_INTERVALS_MIN`]; records are
/// ordered by bucket timestamp.
pub fn fetch(
    db: &Database,
    config: &DbConfig,
    start: NaiveDate,
    end: NaiveDate,
    interval_seconds: u32,
) -> Result<Vec<HourlyRecord>> {
    let tca = quote_ident(&config.tca_table);
    let ae33 = quote_ident(&config.ae33_table);

    let sql = format!(
        "WITH t AS (
            SELECT
              datetime((CAST(strftime('%s', \"StartTimeLocal\") AS INTEGER) / {iv}) * {iv}, 'unixepoch') AS bucket,
              AVG(\"TCconc\")   AS avg_tcconc,
              AVG(\"CO2\")      AS avg_co2,
              AVG(\"EC\")       AS avg_ec,
              AVG(\"OC\")       AS avg_oc,
              AVG(\"AE33_BC6\") AS avg_ae33_bc6
            FROM {tca}
            WHERE \"StartTimeLocal\" >= ?1
              AND \"StartTimeLocal\" < ?2
            GROUP BY bucket
        ), a AS (
            SELECT
              datetime((CAST(strftime('%s', datetime(\"date\" || ' ' || \"time\")) AS INTEGER) / {iv}) * {iv}, 'unixepoch') AS bucket,
              AVG(\"BC1\") AS avg_bc1,
              AVG(\"BC2\") AS avg_bc2,
              AVG(\"BC3\") AS avg_bc3,
              AVG(\"BC4\") AS avg_bc4,
              AVG(\"BC5\") AS avg_bc5,
              AVG(\"BC6\") AS avg_bc6,
              AVG(\"BC7\") AS avg_bc7
            FROM {ae33}
            WHERE \"date\" >= ?1
              AND \"date\" < ?2
            GROUP BY bucket
        ), buckets AS (
            SELECT bucket FROM t
            UNION
            SELECT bucket FROM a
        )
        SELECT
            b.bucket,
            COALESCE(t.avg_tcconc,   -99) AS tc_conc,
            COALESCE(t.avg_co2,      -99) AS co2,
            COALESCE(t.avg_ec,       -99) AS ec,
            COALESCE(t.avg_oc,       -99) AS oc,
            COALESCE(t.avg_ae33_bc6, -99) AS ae33_bc6,
            COALESCE(a.avg_bc1, -99) AS bc1,
            COALESCE(a.avg_bc2, -99) AS bc2,
            COALESCE(a.avg_bc3, -99) AS bc3,
            COALESCE(a.avg_bc4, -99) AS bc4,
            COALESCE(a.avg_bc5, -99) AS bc5,
            COALESCE(a.avg_bc6, -99) AS bc6,
            COALESCE(a.avg_bc7, -99) AS bc7
        FROM buckets b
        LEFT JOIN t ON b.bucket = t.bucket
        LEFT JOIN a ON b.bucket = a.bucket
        ORDER BY b.bucket",
        iv = interval_seconds,
    );

    let start_s = start.format("%Y-%m-%d").to_string();
    let end_exclusive = (end + chrono::Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();

    let mut stmt = db.conn().prepare(&sql).map_err(db_err)?;
    let rows = stmt
        .query_map(params![start_s, end_exclusive], |row| {
            Ok((
                row.get::<_, String>(0)?,
                [
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                ],
                [
                    row.get::<_, f64>(6)?,
                    row.get::<_, f64>(7)?,
                    row.get::<_, f64>(8)?,
                    row.get::<_, f64>(9)?,
                    row.get::<_, f64>(10)?,
                    row.get::<_, f64>(11)?,
                    row.get::<_, f64>(12)?,
                ],
            ))
        })
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(rows
        .into_iter()
        .filter_map(|(bucket, tca_cols, bc)| {
            Some(HourlyRecord {
                timestamp: parse_timestamp(&bucket)?,
                tc_conc: tca_cols[0],
                co2: tca_cols[1],
                ec: tca_cols[2],
                oc: tca_cols[3],
                ae33_bc6: tca_cols[4],
                bc,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cass_core::MISSING;

    fn seeded_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::install(dir.path().join("cass.db")).unwrap();
        db.conn()
            .execute_batch(
                "CREATE TABLE \"AE33_raw\" (
                     datetime TEXT PRIMARY KEY, date TEXT, time TEXT,
                     BC1 REAL, BC2 REAL, BC3 REAL, BC4 REAL, BC5 REAL, BC6 REAL, BC7 REAL);
                 INSERT INTO \"AE33_raw\" VALUES
                   ('2024-06-01 00:00:00','2024-06-01','00:00:00',100,200,300,400,500,600,700),
                   ('2024-06-01 00:30:00','2024-06-01','00:30:00',200,300,400,500,600,700,800),
                   ('2024-06-01 01:00:00','2024-06-01','01:00:00',300,400,500,600,700,800,900);
                 CREATE TABLE \"TCA_raw\" (
                     ID INTEGER PRIMARY KEY, \"StartTimeLocal\" TEXT,
                     TCconc REAL, CO2 REAL, EC REAL, OC REAL, AE33_BC6 REAL);
                 INSERT INTO \"TCA_raw\" VALUES
                   (1,'2024-06-01 00:00:00',3.0,420,0.4,2.0,410),
                   (2,'2024-06-01 02:00:00',3.2,421,0.5,2.1,415);",
            )
            .unwrap();
        (dir, db)
    }

    fn config() -> DbConfig {
        DbConfig {
            db_path: "unused".into(),
            ae33_table: "AE33_raw".into(),
            tca_table: "TCA_raw".into(),
        }
    }

    #[test]
    fn test_hourly_buckets_average_both_sides() {
        let (_dir, db) = seeded_db();
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let records = fetch(&db, &config(), start, end, 3600).unwrap();

        // Buckets: 00:00 (both), 01:00 (AE33 only), 02:00 (TCA only).
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.timestamp.to_string(), "2024-06-01 00:00:00");
        // Two AE33 rows average into the first hour.
        assert_eq!(first.bc[0], 150.0);
        assert_eq!(first.bc[6], 750.0);
        assert_eq!(first.tc_conc, 3.0);

        let second = &records[1];
        assert_eq!(second.bc[0], 300.0);
        assert_eq!(second.tc_conc, MISSING);

        let third = &records[2];
        assert_eq!(third.tc_conc, 3.2);
        assert_eq!(third.bc[0], MISSING);
    }

    #[test]
    fn test_finer_interval_produces_more_buckets() {
        let (_dir, db) = seeded_db();
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let records = fetch(&db, &config(), start, end, 1800).unwrap();
        // 00:00, 00:30, 01:00 from AE33 plus 02:00 from TCA.
        assert_eq!(records.len(), 4);
        assert_eq!(records[1].bc[0], 200.0);
    }

    #[test]
    fn test_range_filter_excludes_everything() {
        let (_dir, db) = seeded_db();
        let start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
        let records = fetch(&db, &config(), start, end, 3600).unwrap();
        assert!(records.is_empty());
    }
}
