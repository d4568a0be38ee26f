//! portal_export library: warehouse to cBioPortal staging file export
//!
//! This library exports the tables of a warehouse schema into the flat
//! tab-delimited files a cBioPortal study is loaded from. Which tables are
//! exported, under which filename and in which shape is decided by a
//! [`Registry`]; each data file gets a `meta_*` sidecar built from a metadata
//! table.
//!
//! # Example
//!
//! ```no_run
//! use portal_export::{run_export, Config, FailurePolicy};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     output_dir: std::path::PathBuf::from("./staging/msk_impact"),
//!     failure_policy: FailurePolicy::Continue,
//!     ..Default::default()
//! };
//!
//! let report = run_export(config).await?;
//! println!("Exported {} tables, {} failed",
//!          report.tables_exported, report.tables_failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod catalog;
pub mod config;
mod error_handling;
pub mod export;
pub mod initialization;
pub mod lookup;
pub mod registry;
pub mod warehouse;

// Re-export public API
pub use catalog::SchemaCatalog;
pub use config::{Config, FailurePolicy, LogFormat, LogLevel, WarehouseConfig, WarehouseTarget};
pub use error_handling::{
    ExportError, ExportStats, InitializationError, OutcomeType, Result as ExportResult,
};
pub use lookup::RecordLookup;
pub use registry::{ExportShape, Registry, TableDescriptor};
pub use run::{export_schema, run_export, ExportReport, TableFailure};

// Internal run module (contains the export orchestration)
mod run {
    use std::path::{Path, PathBuf};
    use std::time::Instant;

    use anyhow::{Context, Result};
    use log::{info, warn};

    use crate::catalog::SchemaCatalog;
    use crate::config::{Config, FailurePolicy};
    use crate::error_handling::{print_export_statistics, ExportError, ExportStats, OutcomeType};
    use crate::export::{export_rows, export_transposed, MetadataExtractor};
    use crate::initialization::init_warehouse;
    use crate::registry::{ExportShape, Registry};
    use crate::warehouse::{Ident, SchemaRef, Warehouse};

    /// A table that failed while the run continued past it.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct TableFailure {
        /// Logical table name
        pub table: String,
        /// Error message
        pub error: String,
    }

    /// Results of an export run.
    #[derive(Debug, Clone)]
    pub struct ExportReport {
        /// Tables whose data file was written
        pub tables_exported: usize,
        /// Tables that failed (only non-zero with `FailurePolicy::Continue`)
        pub tables_failed: usize,
        /// Metadata sidecars written
        pub metadata_written: usize,
        /// Source rows written across all data files
        pub rows_exported: usize,
        /// Failure details, in export order
        pub failures: Vec<TableFailure>,
        /// Directory holding the artifacts
        pub output_dir: PathBuf,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Connects the configured warehouse and exports every supported table of the
    /// configured schema, using the cBioPortal registry.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The warehouse cannot be initialized or reached
    /// - The catalog or schema name is not a plain identifier
    /// - A table fails and the policy is `FailurePolicy::Abort`
    pub async fn run_export(config: Config) -> Result<ExportReport> {
        let warehouse = init_warehouse(&config.warehouse)
            .await
            .context("Failed to initialize warehouse")?;
        let registry = Registry::cbioportal();
        export_schema(warehouse.as_ref(), &registry, &config).await
    }

    /// Exports every table of the configured schema that `registry` knows, one
    /// after another, each followed by its metadata sidecar.
    ///
    /// # Errors
    ///
    /// Same as [`run_export`], minus warehouse initialization.
    pub async fn export_schema(
        warehouse: &dyn Warehouse,
        registry: &Registry,
        config: &Config,
    ) -> Result<ExportReport> {
        let start_time = Instant::now();
        let schema = config
            .warehouse
            .schema_ref()
            .context("Invalid catalog or schema name")?;

        warehouse
            .ping()
            .await
            .context("Warehouse is not reachable")?;

        let catalog = SchemaCatalog::new(warehouse, registry);
        let tables = catalog
            .list_supported_tables(&schema)
            .await
            .with_context(|| format!("Failed to list tables in {schema}"))?;
        info!(
            "Exporting {} table{} from {} into {}",
            tables.len(),
            if tables.len() == 1 { "" } else { "s" },
            schema,
            config.output_dir.display()
        );

        let metadata = MetadataExtractor::new(warehouse, registry, &config.metadata_table)
            .context("Invalid metadata table name")?;
        let stats = ExportStats::new();
        let mut rows_exported = 0;
        let mut failures = Vec::new();

        for table in &tables {
            let outcome = export_table(
                warehouse,
                registry,
                &metadata,
                &schema,
                table,
                &config.output_dir,
                &stats,
            )
            .await;

            match outcome {
                Ok(rows) => rows_exported += rows,
                Err(e) => {
                    stats.increment(OutcomeType::TableFailed);
                    match config.failure_policy {
                        FailurePolicy::Abort => {
                            print_export_statistics(&stats);
                            return Err(anyhow::Error::new(e)
                                .context(format!("Failed to export table {table}")));
                        }
                        FailurePolicy::Continue => {
                            warn!("Failed to export table {}: {}", table, e);
                            failures.push(TableFailure {
                                table: table.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        print_export_statistics(&stats);

        Ok(ExportReport {
            tables_exported: stats.total_exported(),
            tables_failed: stats.total_failed(),
            metadata_written: stats.get_count(OutcomeType::MetadataWritten),
            rows_exported,
            failures,
            output_dir: config.output_dir.clone(),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }

    /// Writes one table's data file and then its sidecar. Returns the rows written.
    async fn export_table(
        warehouse: &dyn Warehouse,
        registry: &Registry,
        metadata: &MetadataExtractor<'_>,
        schema: &SchemaRef,
        table: &str,
        output_dir: &Path,
        stats: &ExportStats,
    ) -> Result<usize, ExportError> {
        let descriptor = registry.require(table)?;
        let source = Ident::new(descriptor.logical_name())?;
        let destination = output_dir.join(descriptor.artifact_filename());

        let summary = {
            let mut cursor = warehouse
                .query(&warehouse.dialect().select_all_sql(schema, &source))
                .await?;
            match descriptor.shape() {
                ExportShape::RowMajor => {
                    let summary = export_rows(cursor.as_mut(), &destination).await?;
                    stats.increment(OutcomeType::RowMajorExport);
                    summary
                }
                ExportShape::Transposed { first_column_label } => {
                    let summary = export_transposed(
                        cursor.as_mut(),
                        &destination,
                        first_column_label.as_deref(),
                    )
                    .await?;
                    stats.increment(OutcomeType::TransposedExport);
                    summary
                }
            }
        };
        info!(
            "Exported {} ({} rows) to {}",
            table,
            summary.rows,
            summary.path.display()
        );

        match metadata.extract(schema, table, output_dir).await? {
            Some(_) => stats.increment(OutcomeType::MetadataWritten),
            None => stats.increment(OutcomeType::MetadataAbsent),
        }
        Ok(summary.rows)
    }
}
