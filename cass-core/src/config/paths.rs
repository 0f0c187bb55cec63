//! Default path resolution for configuration files
//!
//! Uses the XDG config directory when available, with a sensible fallback.

use std::path::PathBuf;

/// Configuration file names inside the configuration directory.
pub const DATA_CONF: &str = "data.conf";
pub const DB_CONF: &str = "db.conf";
pub const CONSTANTS_CONF: &str = "constants.conf";

/// Returns the default configuration directory.
///
/// - Linux/macOS: `~/.config/cassdb`
/// - Fallback: `/etc/cassdb`
pub fn default_conf_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("cassdb")
}
