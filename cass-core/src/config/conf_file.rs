//! Flat `key=value` configuration file parser
//!
//! All CASS configuration files (`data.conf`, `db.conf`, `constants.conf`)
//! share one plain-text format:
//!
//! ```text
//! # comment line
//! KEY=VALUE
//! ```
//!
//! Parsing rules:
//! - each non-blank, non-comment line is split on the FIRST `=`,
//! - whitespace around key and value is insignificant,
//! - lines whose first non-whitespace character is `#` are comments,
//! - blank lines are ignored,
//! - duplicate keys: the last occurrence wins,
//! - a non-comment, non-blank line without `=` is a parse error.
//!
//! Values are never validated against the file system at load time; consumers
//! are responsible for handling missing directories or files.

use std::path::{Path, PathBuf};

use crate::error::{CassError, Result};

/// A parsed flat configuration file.
///
/// Entries keep their file order so that [`ConfFile::serialize`] round-trips
/// losslessly for values without embedded `=` or newlines. Loaded once at
/// startup and passed by reference to every consumer; never mutated after
/// load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfFile {
    path: PathBuf,
    entries: Vec<(String, String)>,
}

impl ConfFile {
    /// Load and parse a configuration file.
    ///
    /// Fails with [`CassError::ConfigNotFound`] when the path does not exist,
    /// and [`CassError::ConfigParse`] on the first malformed line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CassError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse_with_path(&content, path)
    }

    /// Parse configuration text that did not come from a file.
    ///
    /// Error messages report the path as `<inline>`.
    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_with_path(content, Path::new("<inline>"))
    }

    fn parse_with_path(content: &str, path: &Path) -> Result<Self> {
        let mut entries: Vec<(String, String)> = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(CassError::ConfigParse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    text: line.to_string(),
                });
            };

            let key = key.trim().to_string();
            let value = value.trim().to_string();

            // Last occurrence wins; the entry keeps its first position so
            // serialization stays stable.
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Path the configuration was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a key. Keys are case-sensitive.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a key, failing with [`CassError::MissingKey`] when absent.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| CassError::MissingKey {
            key: key.to_string(),
            path: self.path.clone(),
        })
    }

    /// Iterate over entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the file declared no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render entries back to `key=value` lines.
    ///
    /// Lossless for values without embedded `=` or newlines:
    /// `parse(serialize(c)) == c` up to the source path.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}
