use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Load errors (fatal)
// ---------------------------------------------------------------------------

/// A dataset could not be loaded at all.
///
/// Per-field problems never surface here; they become [`CoercionWarning`]s.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("dataset file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed parquet file '{}': {source}", path.display())]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },

    #[error("failed to decode record batch from '{}': {source}", path.display())]
    Arrow {
        path: PathBuf,
        #[source]
        source: arrow::error::ArrowError,
    },

    #[error("'{}' is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("unsupported dataset extension '.{ext}' for '{}'", path.display())]
    UnsupportedFormat { path: PathBuf, ext: String },

    #[error("'{}' is not a listings dataset: {detail}", path.display())]
    Malformed { path: PathBuf, detail: String },
}

// ---------------------------------------------------------------------------
// Coercion warnings (recoverable)
// ---------------------------------------------------------------------------

/// A single field that could not be coerced and was treated as missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoercionWarning {
    /// 1-based data row (header excluded).
    pub row: usize,
    pub column: &'static str,
    pub value: String,
    pub reason: &'static str,
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot create export file '{}': {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write CSV row: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush export: {0}")]
    Flush(#[source] io::Error),
}
