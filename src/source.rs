//! Source reader for Bubble CSV exports.
//!
//! Each export is a header-bearing CSV file. Rows are loaded into [`RawRecord`]s
//! keyed by the exact header text. Loading never aborts a migration: a missing
//! file yields an empty relation and a warning, a malformed row is logged and
//! skipped, and an absent column reads as an empty string.

use crate::models::Relation;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Faults while loading a single export file.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("export file {0} not found")]
    Missing(PathBuf),
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read CSV header of {path}: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// One exported row: column header to raw value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Trimmed value of `column`, or `""` when the column is absent.
    pub fn text(&self, column: &str) -> &str {
        self.fields.get(column).map(|v| v.trim()).unwrap_or("")
    }
}

/// Parse CSV content into records. Rows that fail to parse are skipped.
///
/// `label` only appears in log messages.
pub fn read_records<R: Read>(reader: R, label: &str) -> Result<Vec<RawRecord>, csv::Error> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (index, result) in csv_reader.records().enumerate() {
        match result {
            Ok(record) => {
                let fields = headers
                    .iter()
                    .zip(record.iter())
                    .map(|(header, value)| (header.to_string(), value.to_string()))
                    .collect();
                records.push(RawRecord { fields });
            }
            Err(err) => {
                skipped += 1;
                log::warn!("{}: skipping unreadable row {}: {}", label, index + 2, err);
            }
        }
    }

    if skipped > 0 {
        log::warn!("{}: skipped {} unreadable rows", label, skipped);
    }

    Ok(records)
}

/// Loads exports from one directory.
#[derive(Debug, Clone)]
pub struct SourceReader {
    export_dir: PathBuf,
}

impl SourceReader {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn path_for(&self, relation: Relation) -> PathBuf {
        self.export_dir.join(relation.file_name())
    }

    /// Load one relation, surfacing every fault.
    pub fn try_load(&self, relation: Relation) -> Result<Vec<RawRecord>, SourceError> {
        let path = self.path_for(relation);
        let file = File::open(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => SourceError::Missing(path.clone()),
            _ => SourceError::Io {
                path: path.clone(),
                source,
            },
        })?;

        read_records(file, relation.table()).map_err(|source| SourceError::Header { path, source })
    }

    /// Load one relation; any fault degrades to an empty relation with a warning.
    pub fn load(&self, relation: Relation) -> Vec<RawRecord> {
        match self.try_load(relation) {
            Ok(rows) => {
                log::info!("{}: found {} records", relation, rows.len());
                rows
            }
            Err(err) => {
                log::warn!("{}: {}; continuing with no records", relation, err);
                Vec::new()
            }
        }
    }

    /// Load every relation once.
    pub fn load_all(&self) -> ExportSet {
        let rows = Relation::ALL
            .iter()
            .map(|&relation| (relation, self.load(relation)))
            .collect();
        ExportSet { rows }
    }
}

/// Every relation's rows for one run.
#[derive(Debug, Clone, Default)]
pub struct ExportSet {
    rows: HashMap<Relation, Vec<RawRecord>>,
}

impl ExportSet {
    /// Rows of `relation`; empty when it was never loaded.
    pub fn rows(&self, relation: Relation) -> &[RawRecord] {
        self.rows.get(&relation).map(Vec::as_slice).unwrap_or(&[])
    }
}
