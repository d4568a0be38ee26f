//! Column-major ("transposed") export.
//!
//! Gene-by-sample matrices are stored in the warehouse one row per sample but
//! delivered one line per source column. The whole result is materialized before
//! anything is written, so memory grows with rows × columns.

use std::path::Path;

use log::debug;

use super::rows::check_row_width;
use super::types::ExportSummary;
use super::writer::StagedWriter;
use crate::error_handling::Result;
use crate::warehouse::RowCursor;

/// Writes one line per column of `cursor`: the column name followed by that
/// column's value in every row, in row order.
///
/// `first_column_label`, when given, replaces the first column's name as the
/// leading field of the first line. An empty result yields one name-only line per
/// column.
///
/// # Errors
///
/// Same as [`export_rows`](super::export_rows).
pub async fn export_transposed<C>(
    cursor: &mut C,
    destination: &Path,
    first_column_label: Option<&str>,
) -> Result<ExportSummary>
where
    C: RowCursor + ?Sized,
{
    let columns = cursor.columns().to_vec();
    let mut rows = Vec::new();
    while let Some(row) = cursor.next_row().await? {
        check_row_width(&row, columns.len(), rows.len())?;
        rows.push(row);
    }

    let mut writer = StagedWriter::create(destination)?;
    for (index, column) in columns.iter().enumerate() {
        let name = match first_column_label {
            Some(label) if index == 0 => label,
            _ => column.as_str(),
        };
        let values = rows.iter().map(|row| row[index].to_string());
        writer.write_record(std::iter::once(name.to_string()).chain(values))?;
    }

    let lines = writer.finish()?;
    debug!(
        "Wrote {} columns x {} rows transposed to {}",
        columns.len(),
        rows.len(),
        destination.display()
    );
    Ok(ExportSummary {
        path: destination.to_path_buf(),
        rows: rows.len(),
        columns: columns.len(),
        lines,
    })
}
