//! Artifact writers.
//!
//! Turns warehouse cursors into cBioPortal staging files:
//! - [`export_rows`]: row-major data file, streamed one row at a time
//! - [`export_transposed`]: column-major data file, built from the full result
//! - [`extract_metadata`]: `meta_*` sidecar from the metadata table
//!
//! Every file is written to a temporary sibling first and moved into place only
//! once complete, so a failed export never leaves a partial artifact behind.

mod metadata;
mod rows;
mod transpose;
mod types;
mod writer;

pub use metadata::{extract_metadata, MetadataExtractor};
pub use rows::export_rows;
pub use transpose::export_transposed;
pub use types::{ExportSummary, MetadataRecord};
