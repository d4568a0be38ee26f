//! Metadata sidecar extraction.
//!
//! The metadata table holds `(study_id, data_filename, meta_key, meta_value)` rows.
//! Rows whose `data_filename` starts with an artifact's base name followed by `.`
//! belong to that artifact and become its `meta_*` file.

use std::path::{Path, PathBuf};

use log::{debug, info};

use super::rows::check_row_width;
use super::types::MetadataRecord;
use super::writer::StagedWriter;
use crate::config::{
    DATA_FILENAME_KEY, DEFAULT_METADATA_TABLE, METADATA_FILENAME_COLUMN, METADATA_KEY_COLUMN,
    METADATA_STUDY_ID_COLUMN, METADATA_VALUE_COLUMN, STUDY_IDENTIFIER_KEY,
};
use crate::error_handling::Result;
use crate::registry::Registry;
use crate::warehouse::{Ident, Row, SchemaRef, Warehouse};

const METADATA_COLUMNS: [&str; 4] = [
    METADATA_STUDY_ID_COLUMN,
    METADATA_FILENAME_COLUMN,
    METADATA_KEY_COLUMN,
    METADATA_VALUE_COLUMN,
];

/// Writes metadata sidecars from a configurable metadata table.
pub struct MetadataExtractor<'a> {
    warehouse: &'a dyn Warehouse,
    registry: &'a Registry,
    metadata_table: Ident,
}

impl<'a> MetadataExtractor<'a> {
    /// # Errors
    ///
    /// `ExportError::InvalidIdentifier` if `metadata_table` is not a plain name.
    pub fn new(
        warehouse: &'a dyn Warehouse,
        registry: &'a Registry,
        metadata_table: &str,
    ) -> Result<Self> {
        Ok(Self {
            warehouse,
            registry,
            metadata_table: Ident::new(metadata_table)?,
        })
    }

    /// Writes the sidecar for `logical_table` into `output_dir`.
    ///
    /// Returns the path written, or `None` when the metadata table has no rows for
    /// the table's artifact (no file is created then).
    ///
    /// # Errors
    ///
    /// `ExportError::UnsupportedTable` before any query when `logical_table` is not
    /// registered; `Connection`/`Query` from the warehouse; `Io` from the write.
    pub async fn extract(
        &self,
        schema: &SchemaRef,
        logical_table: &str,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        let table = self.registry.require(logical_table)?;

        let records = self.fetch_records(schema, table.artifact_base_name()).await?;
        let Some(first) = records.first() else {
            debug!("No metadata rows for {}", table.artifact_filename());
            return Ok(None);
        };

        let destination = output_dir.join(table.metadata_filename());
        let mut writer = StagedWriter::create(&destination)?;
        writer.write_entry(STUDY_IDENTIFIER_KEY, &first.study_id)?;
        writer.write_entry(DATA_FILENAME_KEY, &first.data_filename)?;
        for record in &records {
            writer.write_entry(&record.key, &record.value)?;
        }
        writer.finish()?;

        info!(
            "Wrote {} metadata entries to {}",
            records.len(),
            destination.display()
        );
        Ok(Some(destination))
    }

    async fn fetch_records(
        &self,
        schema: &SchemaRef,
        base_name: &str,
    ) -> Result<Vec<MetadataRecord>> {
        let dialect = self.warehouse.dialect();
        let predicate = dialect.like_prefix_predicate(METADATA_FILENAME_COLUMN, base_name);
        let sql =
            dialect.select_where_sql(schema, &self.metadata_table, &METADATA_COLUMNS, &predicate);

        let mut cursor = self.warehouse.query(&sql).await?;
        let mut records = Vec::new();
        while let Some(row) = cursor.next_row().await? {
            check_row_width(&row, METADATA_COLUMNS.len(), records.len())?;
            records.push(to_record(row));
        }
        Ok(records)
    }
}

fn to_record(row: Row) -> MetadataRecord {
    let mut cells = row.into_iter().map(|cell| cell.to_string());
    MetadataRecord {
        study_id: cells.next().unwrap_or_default(),
        data_filename: cells.next().unwrap_or_default(),
        key: cells.next().unwrap_or_default(),
        value: cells.next().unwrap_or_default(),
    }
}

/// Writes the sidecar for `logical_table` from the default metadata table.
///
/// See [`MetadataExtractor::extract`].
pub async fn extract_metadata(
    warehouse: &dyn Warehouse,
    registry: &Registry,
    schema: &SchemaRef,
    logical_table: &str,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    MetadataExtractor::new(warehouse, registry, DEFAULT_METADATA_TABLE)?
        .extract(schema, logical_table, output_dir)
        .await
}
