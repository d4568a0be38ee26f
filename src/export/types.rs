//! Export result types.

use std::path::PathBuf;

/// What a data export wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportSummary {
    /// Final artifact path
    pub path: PathBuf,
    /// Rows read from the cursor
    pub rows: usize,
    /// Columns of the source result
    pub columns: usize,
    /// Lines written to the artifact
    pub lines: usize,
}

/// One row of the metadata table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataRecord {
    pub study_id: String,
    pub data_filename: String,
    pub key: String,
    pub value: String,
}
