//! Configuration for the CASS database manager
//!
//! Three flat `key=value` files (see [`ConfFile`] for the format) make up the
//! configuration, all loaded once at startup and passed explicitly to
//! consumers:
//!
//! - [`DataConfig`] (`data.conf`) — raw-file locations and prefixes per source
//! - [`DbConfig`] (`db.conf`) — SQLite path and raw table names
//! - [`SpeciationConstants`] (`constants.conf`) — analysis constants

mod conf_file;
mod constants;
mod data_config;
mod db_config;
mod paths;

pub use conf_file::ConfFile;
pub use constants::SpeciationConstants;
pub use data_config::{DataConfig, SourceConfig};
pub use db_config::DbConfig;
pub use paths::{default_conf_dir, CONSTANTS_CONF, DATA_CONF, DB_CONF};
