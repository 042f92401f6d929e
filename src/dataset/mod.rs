pub mod hospitals;
pub mod medicines;

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};

use crate::error::LookupError;
use crate::storage::file_present_nonempty;

/// Rows loaded from one CSV file. Immutable after load.
#[derive(Debug, Clone)]
pub struct Dataset<T> {
    path: PathBuf,
    entries: Vec<T>,
    skipped: usize,
}

impl<T> Dataset<T> {
    pub fn new(path: impl Into<PathBuf>, entries: Vec<T>, skipped: usize) -> Self {
        Self {
            path: path.into(),
            entries,
            skipped,
        }
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows dropped at load time as malformed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn log_loaded(&self, label: &str) {
        tracing::info!(
            "Loaded {} {} from {}",
            self.entries.len(),
            label,
            self.path.display()
        );
        if self.skipped > 0 {
            tracing::warn!(
                "Skipped {} malformed {} rows in {}",
                self.skipped,
                label,
                self.path.display()
            );
        }
    }
}

/// Open a CSV with headers. Missing or empty files and unreadable headers are
/// load errors.
pub(crate) fn open_csv(path: &Path) -> Result<(csv::Reader<File>, StringRecord), LookupError> {
    if !file_present_nonempty(path) {
        return Err(LookupError::data_load(path, "file not found or empty"));
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| LookupError::data_load(path, e.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|e| LookupError::data_load(path, format!("read headers: {e}")))?
        .clone();
    Ok((reader, headers))
}

/// Visit every data row. Rows the CSV layer cannot decode are counted and
/// skipped; I/O failures abort the load.
pub(crate) fn for_each_record(
    path: &Path,
    reader: &mut csv::Reader<File>,
    mut visit: impl FnMut(&StringRecord) -> bool,
) -> Result<usize, LookupError> {
    let mut skipped = 0usize;
    for record in reader.records() {
        match record {
            Ok(record) => {
                if !visit(&record) {
                    skipped += 1;
                }
            }
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(LookupError::data_load(path, e.to_string()));
            }
            Err(e) => {
                tracing::debug!("Skipping undecodable row in {}: {}", path.display(), e);
                skipped += 1;
            }
        }
    }
    Ok(skipped)
}

pub(crate) fn header_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

pub(crate) fn require_column(
    path: &Path,
    headers: &StringRecord,
    name: &str,
) -> Result<usize, LookupError> {
    header_index(headers, name).ok_or_else(|| LookupError::missing_column(path, name))
}

/// Trimmed cell value; empty cells and a missing column are `None`.
pub(crate) fn field_at(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
