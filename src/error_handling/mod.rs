//! Error handling and run statistics.
//!
//! This module provides:
//! - The export error taxonomy (connection, query, unsupported table, I/O, ...)
//! - Initialization errors for the logger, HTTP client and warehouse backend
//! - Per-table outcome statistics for an export run

mod stats;
mod types;

// Re-export public API
pub use stats::{print_export_statistics, ExportStats};
pub use types::{ExportError, InitializationError, OutcomeType};

/// Result alias used throughout the export engine.
pub type Result<T, E = ExportError> = std::result::Result<T, E>;
