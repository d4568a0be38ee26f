//! Configuration types and CLI options.
//!
//! `Opt` is what `clap` parses; `Config` and `WarehouseConfig` are what the
//! library consumes and can be built without any CLI involvement.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::constants::{
    DEFAULT_DATABRICKS_PORT, DEFAULT_METADATA_TABLE, DEFAULT_REQUEST_TABLE, DEFAULT_SAMPLE_TABLE,
    DEFAULT_TIMEOUT_SECS, SQLITE_MAIN_SCHEMA,
};
use crate::warehouse::SchemaRef;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// What an export run does when one table fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing table and return its error.
    #[default]
    Abort,
    /// Log and count the failure, then move on to the next table.
    Continue,
}

/// Which warehouse backend to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarehouseTarget {
    /// Databricks SQL warehouse reached over the Statement Execution API.
    Databricks {
        host: String,
        port: u16,
        http_path: String,
        token: String,
    },
    /// Local SQLite file.
    Sqlite { path: PathBuf },
}

/// Warehouse connection and addressing.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub target: WarehouseTarget,
    pub catalog: String,
    pub schema: String,
    /// HTTP request timeout in seconds (Databricks only)
    pub timeout_seconds: u64,
}

impl WarehouseConfig {
    /// Validated catalog/schema address.
    pub fn schema_ref(&self) -> crate::error_handling::Result<SchemaRef> {
        SchemaRef::new(&self.catalog, &self.schema)
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            target: WarehouseTarget::Sqlite {
                path: PathBuf::from("./warehouse.db"),
            },
            catalog: SQLITE_MAIN_SCHEMA.to_string(),
            schema: SQLITE_MAIN_SCHEMA.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Library configuration for an export run (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use portal_export::{Config, FailurePolicy};
/// use std::path::PathBuf;
///
/// let config = Config {
///     output_dir: PathBuf::from("./staging/msk_impact"),
///     failure_policy: FailurePolicy::Continue,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Warehouse connection and schema address
    pub warehouse: WarehouseConfig,

    /// Directory the artifacts are written into (created if absent)
    pub output_dir: PathBuf,

    /// Table holding the metadata key/value rows
    pub metadata_table: String,

    /// Behaviour when a table fails to export
    pub failure_policy: FailurePolicy,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            warehouse: WarehouseConfig::default(),
            output_dir: PathBuf::from("./cbioportal"),
            metadata_table: DEFAULT_METADATA_TABLE.to_string(),
            failure_policy: FailurePolicy::Abort,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

/// Command-line options.
///
/// Without a subcommand the schema is exported into `--directory`.
///
/// # Examples
///
/// ```bash
/// # Export a Databricks schema (credentials from the environment or .env)
/// portal_export --catalog cdsi_prod --schema cbioportal --directory ./staging
///
/// # Export from a local SQLite copy, continuing past failing tables
/// portal_export --sqlite ./staging.db --directory ./staging --keep-going
///
/// # Print the stored request document
/// portal_export --catalog cdsi_prod --schema smile request 12345_C
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "portal_export",
    about = "Exports warehouse tables into cBioPortal staging files.",
    subcommand_negates_reqs = true
)]
pub struct Opt {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub export: ExportArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Warehouse connection options.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Databricks personal access token
    #[arg(long, env = "DATABRICKS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Databricks workspace host name
    #[arg(long, env = "DATABRICKS_HOST")]
    pub host: Option<String>,

    /// Databricks workspace port
    #[arg(long, default_value_t = DEFAULT_DATABRICKS_PORT)]
    pub port: u16,

    /// HTTP path of the SQL warehouse (/sql/1.0/warehouses/<id>)
    #[arg(long, env = "DATABRICKS_HTTP_PATH")]
    pub path: Option<String>,

    /// Catalog holding the schema (defaults to `main` with --sqlite)
    #[arg(long)]
    pub catalog: Option<String>,

    /// Schema holding the tables (defaults to `main` with --sqlite)
    #[arg(long)]
    pub schema: Option<String>,

    /// Read from a local SQLite file instead of Databricks
    #[arg(long, value_parser)]
    pub sqlite: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_seconds: u64,
}

/// Options of the default export command.
#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Output directory for the staging files
    #[arg(long, required = true)]
    pub directory: Option<PathBuf>,

    /// Table holding the metadata key/value rows
    #[arg(long, default_value = DEFAULT_METADATA_TABLE)]
    pub metadata_table: String,

    /// Continue with the next table when one fails
    #[arg(long)]
    pub keep_going: bool,
}

/// Lookup subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the JSON document stored for a request
    Request {
        /// IGO request id
        request_id: String,

        /// Table holding request documents
        #[arg(long, default_value = DEFAULT_REQUEST_TABLE)]
        request_table: String,
    },
    /// Print the JSON document stored for a sample of a request
    Sample {
        /// IGO request id
        request_id: String,

        /// IGO sample name
        sample_name: String,

        /// Table holding sample documents
        #[arg(long, default_value = DEFAULT_SAMPLE_TABLE)]
        sample_table: String,
    },
}

impl ConnectionArgs {
    /// Resolves the backend and schema address from the given options.
    pub fn warehouse_config(&self) -> Result<WarehouseConfig> {
        let (target, default_namespace) = match &self.sqlite {
            Some(path) => (WarehouseTarget::Sqlite { path: path.clone() }, Some(SQLITE_MAIN_SCHEMA)),
            None => {
                let Some(host) = self.host.clone() else {
                    bail!("--host (or DATABRICKS_HOST) is required unless --sqlite is given");
                };
                let Some(http_path) = self.path.clone() else {
                    bail!("--path (or DATABRICKS_HTTP_PATH) is required unless --sqlite is given");
                };
                let Some(token) = self.token.clone() else {
                    bail!("--token (or DATABRICKS_TOKEN) is required unless --sqlite is given");
                };
                let target = WarehouseTarget::Databricks {
                    host,
                    port: self.port,
                    http_path,
                    token,
                };
                (target, None)
            }
        };

        let Some(catalog) = self.catalog.clone().or(default_namespace.map(str::to_string)) else {
            bail!("--catalog is required");
        };
        let Some(schema) = self.schema.clone().or(default_namespace.map(str::to_string)) else {
            bail!("--schema is required");
        };

        Ok(WarehouseConfig {
            target,
            catalog,
            schema,
            timeout_seconds: self.timeout_seconds,
        })
    }
}

impl Opt {
    /// Export configuration; fails when the connection options are incomplete.
    pub fn export_config(&self) -> Result<Config> {
        let Some(output_dir) = self.export.directory.clone() else {
            bail!("--directory is required");
        };
        Ok(Config {
            warehouse: self.connection.warehouse_config()?,
            output_dir,
            metadata_table: self.export.metadata_table.clone(),
            failure_policy: if self.export.keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            },
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
        })
    }
}
