//! Raw instrument file discovery
//!
//! Matches files under a source's `dataLocation` against its `filePrefix`.
//! The prefix applies to the file NAME, not the path. AE33 exports are nested
//! in per-period subfolders and are walked recursively; TCA exports sit flat
//! in their folder and must carry a `.csv` extension.

use std::path::{Path, PathBuf};

use crate::config::SourceConfig;
use crate::error::Result;
use crate::types::Source;

/// List the raw files belonging to a source, sorted by path.
///
/// A missing `dataLocation` directory surfaces as an I/O error; existence is
/// deliberately not checked at configuration load time.
pub fn discover(source: Source, config: &SourceConfig) -> Result<Vec<PathBuf>> {
    let mut files = match source {
        Source::Ae33 => {
            let mut out = Vec::new();
            walk(&config.data_location, &config.file_prefix, &mut out)?;
            out
        }
        Source::Tca => {
            let mut out = Vec::new();
            for entry in std::fs::read_dir(&config.data_location)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_file()
                    && name_has_prefix(&path, &config.file_prefix)
                    && path.extension().is_some_and(|e| e == "csv")
                {
                    out.push(path);
                }
            }
            out
        }
    };
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, prefix: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, prefix, out)?;
        } else if name_has_prefix(&path, prefix) {
            out.push(path);
        }
    }
    Ok(())
}

fn name_has_prefix(path: &Path, prefix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(prefix))
}
