//! Row-major export.

use std::path::Path;

use log::debug;

use super::types::ExportSummary;
use super::writer::StagedWriter;
use crate::error_handling::{ExportError, Result};
use crate::warehouse::{Row, RowCursor};

/// Streams `cursor` into `destination`: a header line of column names, then one
/// tab-delimited line per row in cursor order. Null cells are written as empty
/// fields.
///
/// Only the current row is held in memory.
///
/// # Errors
///
/// `ExportError::Io` when the directory or file cannot be written and
/// `ExportError::Query` when the cursor fails or yields a row of the wrong width.
/// No file exists under `destination` after a failure (an existing file is left
/// untouched).
pub async fn export_rows<C>(cursor: &mut C, destination: &Path) -> Result<ExportSummary>
where
    C: RowCursor + ?Sized,
{
    let columns = cursor.columns().to_vec();
    let mut writer = StagedWriter::create(destination)?;
    writer.write_record(&columns)?;

    let mut rows = 0;
    while let Some(row) = cursor.next_row().await? {
        check_row_width(&row, columns.len(), rows)?;
        writer.write_record(&row)?;
        rows += 1;
    }

    let lines = writer.finish()?;
    debug!("Wrote {} rows to {}", rows, destination.display());
    Ok(ExportSummary {
        path: destination.to_path_buf(),
        rows,
        columns: columns.len(),
        lines,
    })
}

/// Every row must have one cell per column.
pub(super) fn check_row_width(row: &Row, width: usize, index: usize) -> Result<()> {
    if row.len() != width {
        return Err(ExportError::Query(format!(
            "row {} has {} cells but the result has {} columns",
            index + 1,
            row.len(),
            width
        )));
    }
    Ok(())
}
