//! Resolved CLI configuration
//!
//! All three conf files are loaded up front so a broken configuration fails
//! before any command touches the filesystem or the database.

use std::path::{Path, PathBuf};

use cass_core::{
    DataConfig, DbConfig, Result, SpeciationConstants, CONSTANTS_CONF, DATA_CONF, DB_CONF,
};

/// The fully loaded configuration for one invocation.
#[derive(Debug)]
pub struct AppConfig {
    pub conf_dir: PathBuf,
    pub data: DataConfig,
    pub db: DbConfig,
    pub constants: SpeciationConstants,
}

impl AppConfig {
    /// Load `data.conf`, `db.conf`, and `constants.conf` from `conf_dir`.
    pub fn load(conf_dir: &Path) -> Result<Self> {
        Ok(Self {
            conf_dir: conf_dir.to_path_buf(),
            data: DataConfig::load(conf_dir.join(DATA_CONF))?,
            db: DbConfig::load(conf_dir.join(DB_CONF))?,
            constants: SpeciationConstants::load(conf_dir.join(CONSTANTS_CONF))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cass_core::CassError;
    use std::fs;

    fn write_conf_dir(dir: &Path) {
        fs::write(
            dir.join(DATA_CONF),
            "AE33_data_Location=rawData/AE33\nAE33_FilePrefix=AE33_\n\
             TCA_data_Location=rawData/TCA\nTCA_FilePrefix=TCA-\n",
        )
        .unwrap();
        fs::write(
            dir.join(DB_CONF),
            "dbPath=SQLite/cass.db\nAE33_Table=AE33_raw\nTCA_Table=TCA_raw\n",
        )
        .unwrap();
        fs::write(
            dir.join(CONSTANTS_CONF),
            "BC1=18.47\nBC2=14.54\nBC3=13.14\nBC4=11.58\nBC5=10.35\nBC6=7.77\nBC7=7.19\n\
             AAE_bb=2.0\nAAE_ff=1.0\nAAE_bc=1.0\nMAC_bb=10.0\nMAC_ff=7.5\n\
             POA_POC_Ratio=1.6\nSOA_SOC_Ratio=2.1\nMAC_BrC_Prim=1.0\nMAC_BrC_Sec=1.0\n\
             Time_Delta=3\n",
        )
        .unwrap();
    }

    #[test]
    fn test_load_complete_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_conf_dir(dir.path());
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.db.ae33_table, "AE33_raw");
        assert_eq!(config.constants.time_delta_days, 3);
    }

    #[test]
    fn test_missing_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, CassError::ConfigNotFound { .. }));
    }
}
