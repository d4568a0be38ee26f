//! Warehouse query capability.
//!
//! The export engine talks to a warehouse only through the [`Warehouse`] trait:
//! run a statement and pull its rows forward-only through a [`RowCursor`], fetch a
//! single row, or check liveness. Two backends implement it:
//! - [`DatabricksWarehouse`]: Databricks SQL Statement Execution API over HTTP
//! - [`SqliteWarehouse`]: a local SQLite file through sqlx
//!
//! Statements are built by [`Dialect`] from validated [`Ident`]s.

mod databricks;
mod dialect;
mod ident;
mod sqlite;

use std::fmt;

use async_trait::async_trait;

use crate::error_handling::Result;

// Re-export public API
pub use databricks::{DatabricksConfig, DatabricksWarehouse};
pub use dialect::Dialect;
pub use ident::{Ident, SchemaRef};
pub use sqlite::SqliteWarehouse;

/// A single cell as returned by the warehouse.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Canonical text form: `Null` is the empty string, everything else its default
/// string representation.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(x) => write!(f, "{x}"),
            CellValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

/// One result row, parallel-indexed with the cursor's columns.
pub type Row = Vec<CellValue>;

/// Forward-only result cursor.
///
/// Every row has one cell per entry of [`RowCursor::columns`]; each row is yielded
/// once, in the order the warehouse produced it.
#[async_trait]
pub trait RowCursor: Send {
    /// Column names established when the statement ran.
    fn columns(&self) -> &[String];

    /// Pulls the next row, or `None` once the result is exhausted.
    async fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Opaque query-execution capability of a warehouse.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Dialect used to build statements for this warehouse.
    fn dialect(&self) -> Dialect;

    /// Runs `sql` and returns a cursor over its result.
    async fn query<'a>(&'a self, sql: &str) -> Result<Box<dyn RowCursor + 'a>>;

    /// Runs `sql` and returns its first row, if any.
    async fn query_row(&self, sql: &str) -> Result<Option<Row>> {
        let mut cursor = self.query(sql).await?;
        cursor.next_row().await
    }

    /// Checks that the warehouse is reachable. Fails with `ExportError::Connection`.
    async fn ping(&self) -> Result<()>;
}

/// Cursor over rows already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: std::collections::VecDeque<Row>,
}

impl MemoryCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }
}

#[async_trait]
impl RowCursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }
}
