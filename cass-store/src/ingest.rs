//! Ingest reporting types shared by the AE33 and TCA pipelines

use std::path::PathBuf;

use serde::Serialize;

use cass_core::Source;

/// Outcome of ingesting one raw file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub rows_added: u64,
}

/// Outcome of one `push` run for a source.
///
/// Re-running a push over the same files is idempotent: rows whose primary
/// key already exists are skipped, so `rows_added` counts only new rows.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: Source,
    pub files: Vec<FileResult>,
    pub rows_added: u64,
}

impl IngestReport {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            files: Vec::new(),
            rows_added: 0,
        }
    }

    pub fn record(&mut self, path: PathBuf, rows_added: u64) {
        self.rows_added += rows_added;
        self.files.push(FileResult { path, rows_added });
    }
}
