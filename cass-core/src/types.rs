//! Shared types for the CASS database manager

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An instrument data source.
///
/// The CASS station records two instruments: an AE33 dual-spot aethalometer
/// (black-carbon absorption at seven wavelengths) and a TCA total-carbon
/// analyzer. Each source declares its own raw-data directory and filename
/// prefix in `data.conf`, and its own table in `db.conf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Ae33,
    Tca,
}

impl Source {
    /// All sources, in ingest order.
    pub const ALL: [Source; 2] = [Source::Ae33, Source::Tca];

    /// Key prefix used in `data.conf` (`<SOURCE>_data_Location`,
    /// `<SOURCE>_FilePrefix`) and `db.conf` (`<SOURCE>_Table`).
    /// Case-sensitive.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Source::Ae33 => "AE33",
            Source::Tca => "TCA",
        }
    }

    /// Timestamp column of the source's raw table.
    pub fn time_column(&self) -> &'static str {
        match self {
            Source::Ae33 => "datetime",
            Source::Tca => "StartTimeLocal",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_prefix())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ae33" => Ok(Source::Ae33),
            "tca" => Ok(Source::Tca),
            other => Err(format!("unknown source '{other}' (expected ae33 or tca)")),
        }
    }
}

/// A detected gap in a source's time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub gap_start: NaiveDateTime,
    pub gap_end: NaiveDateTime,
    /// Gap width in minutes.
    pub gap_minutes: f64,
}

/// Summary of one raw table, shown before an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStats {
    pub table: String,
    pub min_timestamp: Option<NaiveDateTime>,
    pub max_timestamp: Option<NaiveDateTime>,
    pub row_count: u64,
    /// Modal interval between successive rows, in minutes, sampled from the
    /// head of the table. `None` when fewer than two rows exist.
    pub resolution_minutes: Option<f64>,
}

/// Sentinel used throughout the pipeline for a missing measurement.
///
/// Inherited from the station's data conventions: bucketed averages with no
/// contributing rows are stored as -99 rather than NULL so that exported
/// files keep a numeric column type.
pub const MISSING: f64 = -99.0;

/// One interval-averaged record joining both instruments.
///
/// Produced by the bucketed fetch in `cass-store`; any side of the join with
/// no rows in the bucket carries [`MISSING`] in its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    pub timestamp: NaiveDateTime,
    /// TCA total-carbon concentration.
    pub tc_conc: f64,
    pub co2: f64,
    pub ec: f64,
    pub oc: f64,
    /// BC6 channel concentration reported by the TCA's paired AE33 feed.
    pub ae33_bc6: f64,
    /// AE33 channel averages BC1..BC7 (370..950 nm).
    pub bc: [f64; 7],
}

impl HourlyRecord {
    /// True when the value is present (not the -99 sentinel and not NaN).
    pub fn is_valid(value: f64) -> bool {
        !value.is_nan() && value != MISSING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trip() {
        for source in Source::ALL {
            let parsed: Source = source.to_string().parse().unwrap();
            assert_eq!(parsed, source);
        }
        assert_eq!("ae33".parse::<Source>().unwrap(), Source::Ae33);
        assert_eq!("TCA".parse::<Source>().unwrap(), Source::Tca);
        assert!("neph".parse::<Source>().is_err());
    }

    #[test]
    fn test_time_columns() {
        assert_eq!(Source::Ae33.time_column(), "datetime");
        assert_eq!(Source::Tca.time_column(), "StartTimeLocal");
    }

    #[test]
    fn test_missing_sentinel() {
        assert!(!HourlyRecord::is_valid(MISSING));
        assert!(!HourlyRecord::is_valid(f64::NAN));
        assert!(HourlyRecord::is_valid(0.0));
        assert!(HourlyRecord::is_valid(-98.9));
    }
}
