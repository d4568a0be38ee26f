//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `portal_export` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use portal_export::config::{Command, Opt, DEFAULT_REQUEST_TABLE, DEFAULT_SAMPLE_TABLE};
use portal_export::initialization::{init_logger_with, init_warehouse};
use portal_export::{run_export, RecordLookup};

#[tokio::main]
async fn main() -> Result<()> {
    // Load DATABRICKS_* settings from a .env file in the current directory, or
    // failing that, next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    let outcome = match &opt.command {
        None => export(&opt).await,
        Some(command) => lookup(&opt, command).await.map(|()| true),
    };

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("portal_export error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Runs the export. `Ok(false)` when some table failed under `--keep-going`.
async fn export(opt: &Opt) -> Result<bool> {
    let config = opt.export_config()?;
    let report = run_export(config).await?;

    println!(
        "✅ Exported {} table{} ({} rows, {} metadata file{}) in {:.1}s",
        report.tables_exported,
        if report.tables_exported == 1 { "" } else { "s" },
        report.rows_exported,
        report.metadata_written,
        if report.metadata_written == 1 { "" } else { "s" },
        report.elapsed_seconds
    );
    println!("Files saved in {}", report.output_dir.display());

    if report.failures.is_empty() {
        return Ok(true);
    }
    eprintln!(
        "❌ {} table{} failed:",
        report.tables_failed,
        if report.tables_failed == 1 { "" } else { "s" }
    );
    for failure in &report.failures {
        eprintln!("  {}: {}", failure.table, failure.error);
    }
    Ok(false)
}

/// Prints a stored request or sample document.
async fn lookup(opt: &Opt, command: &Command) -> Result<()> {
    let warehouse_config = opt.connection.warehouse_config()?;
    let schema = warehouse_config
        .schema_ref()
        .context("Invalid catalog or schema name")?;
    let warehouse = init_warehouse(&warehouse_config)
        .await
        .context("Failed to initialize warehouse")?;

    let (document, what) = match command {
        Command::Request {
            request_id,
            request_table,
        } => {
            let lookup = RecordLookup::with_tables(
                warehouse.as_ref(),
                schema,
                request_table,
                DEFAULT_SAMPLE_TABLE,
            )?;
            let document = lookup
                .get_request(request_id)
                .await
                .with_context(|| format!("Failed to look up request {request_id}"))?;
            (document, format!("request {request_id}"))
        }
        Command::Sample {
            request_id,
            sample_name,
            sample_table,
        } => {
            let lookup = RecordLookup::with_tables(
                warehouse.as_ref(),
                schema,
                DEFAULT_REQUEST_TABLE,
                sample_table,
            )?;
            let document = lookup
                .get_sample(request_id, sample_name)
                .await
                .with_context(|| {
                    format!("Failed to look up sample {sample_name} of request {request_id}")
                })?;
            (document, format!("sample {sample_name} of request {request_id}"))
        }
    };

    match document {
        Some(document) => {
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        None => println!("No document found for {what}"),
    }
    Ok(())
}
