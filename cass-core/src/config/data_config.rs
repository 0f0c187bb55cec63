//! Instrument data-source configuration (`data.conf`)
//!
//! Declares, per source, the root directory of raw exports and the filename
//! prefix that identifies the source's files:
//!
//! ```text
//! # AE33 root folder
//! AE33_data_Location=../data/rawData/AE33
//! AE33_FilePrefix=AE33_AE33-S10
//! TCA_data_Location=../data/rawData/TCA
//! TCA_FilePrefix=TCA-
//! ```

use std::path::PathBuf;

use crate::config::ConfFile;
use crate::error::Result;
use crate::types::Source;

/// The resolved `(dataLocation, filePrefix)` pair for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Root directory where the source's raw files reside. Not checked for
    /// existence at load time.
    pub data_location: PathBuf,
    /// Any filename beginning with this string belongs to the source.
    pub file_prefix: String,
}

/// Parsed `data.conf`.
///
/// Accessors resolve keys on demand so that a file missing one source's keys
/// still serves the other source; a missing key surfaces as
/// [`crate::CassError::MissingKey`] naming the exact key.
#[derive(Debug, Clone)]
pub struct DataConfig {
    conf: ConfFile,
}

impl DataConfig {
    /// Load `data.conf` from the given path.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self {
            conf: ConfFile::load(path)?,
        })
    }

    /// Wrap an already-parsed [`ConfFile`].
    pub fn from_conf(conf: ConfFile) -> Self {
        Self { conf }
    }

    /// Root directory for a source's raw files (`<SOURCE>_data_Location`).
    pub fn data_location(&self, source: Source) -> Result<PathBuf> {
        let key = format!("{}_data_Location", source.key_prefix());
        Ok(PathBuf::from(self.conf.require(&key)?))
    }

    /// Filename prefix for a source (`<SOURCE>_FilePrefix`).
    pub fn file_prefix(&self, source: Source) -> Result<String> {
        let key = format!("{}_FilePrefix", source.key_prefix());
        Ok(self.conf.require(&key)?.to_string())
    }

    /// Both settings for a source.
    pub fn source(&self, source: Source) -> Result<SourceConfig> {
        Ok(SourceConfig {
            data_location: self.data_location(source)?,
            file_prefix: self.file_prefix(source)?,
        })
    }

    /// Underlying entries, for display.
    pub fn conf(&self) -> &ConfFile {
        &self.conf
    }
}
