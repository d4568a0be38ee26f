//! Configuration constants.
//!
//! Defaults for the CLI, limits enforced at the query-construction boundary, and
//! the fixed table/column names the export and lookup statements address.

use std::time::Duration;

// Connection defaults
/// Databricks SQL warehouses listen on HTTPS
pub const DEFAULT_DATABRICKS_PORT: u16 = 443;
/// Per-request HTTP timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Seconds the Statement Execution API may hold a request open before answering
/// with a pending statement (the API accepts 0 or 5-50)
pub const STATEMENT_WAIT_TIMEOUT_SECS: u64 = 30;
/// Delay between status polls of a statement that is still running
pub const STATEMENT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Connections kept open against a SQLite warehouse file
pub const SQLITE_MAX_CONNECTIONS: u32 = 4;
/// Schema addressing the SQLite file itself
pub const SQLITE_MAIN_SCHEMA: &str = "main";

// Streaming
/// Rows buffered between the SQLite reader task and the writer
pub const ROW_CHANNEL_CAPACITY: usize = 1;

// Identifiers
/// Longest catalog/schema/table name accepted
pub const MAX_IDENTIFIER_LEN: usize = 255;
/// Escape character used in LIKE patterns
pub const LIKE_ESCAPE_CHAR: char = '!';

// Metadata table
pub const DEFAULT_METADATA_TABLE: &str = "cbioportal_metadata";
pub const METADATA_STUDY_ID_COLUMN: &str = "study_id";
pub const METADATA_FILENAME_COLUMN: &str = "data_filename";
pub const METADATA_KEY_COLUMN: &str = "meta_key";
pub const METADATA_VALUE_COLUMN: &str = "meta_value";
/// Keys of the two fixed leading lines of a metadata sidecar
pub const STUDY_IDENTIFIER_KEY: &str = "cancer_study_identifier";
pub const DATA_FILENAME_KEY: &str = "data_filename";

// Request/sample lookup
pub const DEFAULT_REQUEST_TABLE: &str = "smile_request";
pub const DEFAULT_SAMPLE_TABLE: &str = "smile_sample";
pub const REQUEST_ID_COLUMN: &str = "IGO_REQUEST_ID";
pub const SAMPLE_NAME_COLUMN: &str = "IGO_SAMPLE_NAME";
pub const REQUEST_JSON_COLUMN: &str = "REQUEST_JSON";
pub const SAMPLE_JSON_COLUMN: &str = "SAMPLE_JSON";

// Output
/// Field separator of data artifacts
pub const FIELD_DELIMITER: &str = "\t";
/// Separator between key and value in metadata sidecars
pub const METADATA_SEPARATOR: &str = ": ";
