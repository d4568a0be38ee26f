//! Error type definitions.
//!
//! This module defines the error taxonomy shared by every export component and the
//! outcome categories counted during a run.

use std::io;
use std::path::{Path, PathBuf};

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error opening or configuring the warehouse backend.
    #[error("Warehouse initialization error: {0}")]
    WarehouseError(#[from] ExportError),
}

/// Errors raised by the export engine.
///
/// Every component returns the first error it hits; nothing here is retried.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The warehouse could not be reached (connect failure, timeout, rejected credentials).
    #[error("Warehouse connection error: {0}")]
    Connection(String),

    /// A statement failed to execute or a result row could not be read.
    #[error("Query error: {0}")]
    Query(String),

    /// The logical table has no registry entry.
    #[error("Unsupported table: '{0}' is not in the table registry")]
    UnsupportedTable(String),

    /// Directory creation, file creation or write failure.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being created or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A catalog, schema or table name rejected before it reached a statement.
    #[error("Invalid identifier '{0}': expected letters, digits and underscores, not starting with a digit")]
    InvalidIdentifier(String),

    /// The registry was built with the same logical name twice.
    #[error("Duplicate table in registry: {0}")]
    DuplicateTable(String),

    /// A stored document could not be decoded.
    #[error("Failed to decode {what}: {message}")]
    Decode {
        /// What was being decoded.
        what: String,
        /// Decoder message.
        message: String,
    },
}

impl ExportError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns true for failures caused by an unreachable warehouse.
    pub fn is_connection(&self) -> bool {
        matches!(self, ExportError::Connection(_))
    }
}

impl From<sqlx::Error> for ExportError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => ExportError::Connection(err.to_string()),
            _ => ExportError::Query(err.to_string()),
        }
    }
}

/// Outcomes tracked per table during an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum OutcomeType {
    /// Table written one line per source row
    RowMajorExport,
    /// Table written one line per source column
    TransposedExport,
    /// Metadata sidecar written
    MetadataWritten,
    /// No metadata rows matched the artifact prefix
    MetadataAbsent,
    /// Table export or its metadata failed
    TableFailed,
}

impl std::fmt::Display for OutcomeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OutcomeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeType::RowMajorExport => "Row-major tables",
            OutcomeType::TransposedExport => "Transposed tables",
            OutcomeType::MetadataWritten => "Metadata sidecars written",
            OutcomeType::MetadataAbsent => "Tables without metadata",
            OutcomeType::TableFailed => "Failed tables",
        }
    }
}
