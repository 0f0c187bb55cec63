//! CASS Core Library
//!
//! Shared types, configuration, and analysis maths for the CASS database
//! manager. This crate is used by both the storage layer (`cass-store`) and
//! the CLI (`cassctl`).

pub mod config;
pub mod discovery;
pub mod error;
pub mod speciation;
pub mod types;

// Re-export commonly used types
pub use config::{
    default_conf_dir, ConfFile, DataConfig, DbConfig, SourceConfig, SpeciationConstants,
    CONSTANTS_CONF, DATA_CONF, DB_CONF,
};
pub use error::{CassError, Result};
pub use types::{Gap, HourlyRecord, Source, TableStats, MISSING};
