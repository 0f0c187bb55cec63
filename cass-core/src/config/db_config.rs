//! Database configuration (`db.conf`)
//!
//! ```text
//! dbPath=../data/SQLite/cass.db
//! AE33_Table=AE33_raw
//! TCA_Table=TCA_raw
//! ```

use std::path::PathBuf;

use crate::config::ConfFile;
use crate::error::Result;
use crate::types::Source;

/// Parsed `db.conf`: the SQLite file and the per-source raw tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Raw table for AE33 rows.
    pub ae33_table: String,
    /// Raw table for TCA rows.
    pub tca_table: String,
}

impl DbConfig {
    /// Load `db.conf` from the given path.
    ///
    /// All three keys are required; ingest, audit, and analysis all need the
    /// table names, so resolution is eager here (unlike `data.conf`).
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_conf(&ConfFile::load(path)?)
    }

    /// Resolve from an already-parsed [`ConfFile`].
    pub fn from_conf(conf: &ConfFile) -> Result<Self> {
        Ok(Self {
            db_path: PathBuf::from(conf.require("dbPath")?),
            ae33_table: conf.require("AE33_Table")?.to_string(),
            tca_table: conf.require("TCA_Table")?.to_string(),
        })
    }

    /// Raw table name for a source.
    pub fn table(&self, source: Source) -> &str {
        match source {
            Source::Ae33 => &self.ae33_table,
            Source::Tca => &self.tca_table,
        }
    }
}
