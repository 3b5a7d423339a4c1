//! Error types shared by ingest, storage and lookup.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::{
    ConfigError,
    ValidationError,
};
use crate::types::InvalidLocale;

/// Malformed ingest payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// JSON syntax error or schema mismatch
    #[error("Failed to decode translation payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed JSON that violates payload rules
    #[error("Translation payload is invalid:\n{}", crate::config::format_validation_errors(.0))]
    Invalid(Vec<ValidationError>),
}

/// Which filesystem step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    CreateRoot,
    CreateLocaleDir,
    WriteTable,
    ReadTable,
    Remove,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CreateRoot => "create storage root",
            Self::CreateLocaleDir => "create locale directory",
            Self::WriteTable => "write table",
            Self::ReadTable => "read table",
            Self::Remove => "remove",
        };
        f.write_str(label)
    }
}

/// Directory or file operation failure under the storage root.
#[derive(Error, Debug)]
#[error("Failed to {operation} at {}: {source}", path.display())]
pub struct StorageError {
    pub operation: StorageOperation,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl StorageError {
    #[must_use]
    pub fn new(operation: StorageOperation, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self { operation, path: path.into(), source }
    }

    /// `true` when the underlying cause is a missing file or directory.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == std::io::ErrorKind::NotFound
    }
}

/// Top-level error of the administrative operations.
#[derive(Error, Debug)]
pub enum LocalizationError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No materialized table for the requested locale/table; recovered by the selector
    #[error("No table '{table}' for locale '{locale}'")]
    NotFound { locale: String, table: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InvalidLocale(#[from] InvalidLocale),

    /// A stored table exists but cannot be parsed
    #[error("Malformed table {}: line {line}: {message}", path.display())]
    MalformedTable { path: PathBuf, line: usize, message: String },
}
