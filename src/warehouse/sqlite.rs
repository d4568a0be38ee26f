//! SQLite warehouse backend.
//!
//! Serves exports from a local SQLite file (offline staging copies, tests). The
//! database is opened read-only; the export never writes to it.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use log::{error, info};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row as _, SqlitePool, Statement, TypeInfo, ValueRef};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{CellValue, Dialect, Row, RowCursor, Warehouse};
use crate::config::{ROW_CHANNEL_CAPACITY, SQLITE_MAX_CONNECTIONS};
use crate::error_handling::{ExportError, Result};

/// Warehouse backed by an sqlx SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteWarehouse {
    pool: SqlitePool,
}

impl SqliteWarehouse {
    /// Opens an existing SQLite database file read-only.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to open SQLite database {}: {e}", db_path.display());
                ExportError::Connection(format!(
                    "failed to open SQLite database {}: {e}",
                    db_path.display()
                ))
            })?;

        info!("Opened SQLite warehouse at {}", db_path.display());
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query<'a>(&'a self, sql: &str) -> Result<Box<dyn RowCursor + 'a>> {
        // Columns come from the prepared statement so empty results still have a header.
        let columns: Vec<String> = {
            let statement = (&self.pool).prepare(sql).await?;
            statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        };

        let (tx, rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);
        let pool = self.pool.clone();
        let sql = sql.to_string();
        let producer = tokio::spawn(async move {
            let mut rows = sqlx::query(&sql).fetch(&pool);
            while let Some(next) = rows.next().await {
                let item = next
                    .map_err(ExportError::from)
                    .and_then(|row| decode_row(&row));
                let failed = item.is_err();
                // A closed receiver means the caller stopped reading.
                if tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(Box::new(SqliteCursor {
            columns,
            rows: rx,
            producer: Some(producer),
        }))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query(Dialect::Sqlite.ping_sql())
            .execute(&self.pool)
            .await
            .map_err(|e| ExportError::Connection(e.to_string()))?;
        Ok(())
    }
}

/// Cursor fed by a producer task through a bounded channel.
struct SqliteCursor {
    columns: Vec<String>,
    rows: mpsc::Receiver<Result<Row>>,
    producer: Option<JoinHandle<()>>,
}

#[async_trait]
impl RowCursor for SqliteCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        match self.rows.recv().await {
            Some(item) => item.map(Some),
            None => {
                // Channel closed: distinguish a finished producer from a crashed one.
                if let Some(producer) = self.producer.take() {
                    producer
                        .await
                        .map_err(|e| ExportError::Query(format!("row reader failed: {e}")))?;
                }
                Ok(None)
            }
        }
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
    (0..row.len()).map(|index| decode_cell(row, index)).collect()
}

fn decode_cell(row: &SqliteRow, index: usize) -> Result<CellValue> {
    let storage_class = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(CellValue::Null);
        }
        raw.type_info().name().to_string()
    };

    let cell = match storage_class.as_str() {
        "INTEGER" => CellValue::Integer(row.try_get::<i64, _>(index)?),
        "REAL" => CellValue::Float(row.try_get::<f64, _>(index)?),
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            CellValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => CellValue::Text(row.try_get::<String, _>(index)?),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_warehouse() -> SqliteWarehouse {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE mixed (
                id INTEGER,
                label TEXT,
                score REAL,
                payload BLOB,
                missing TEXT
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO mixed VALUES (1, 'a', 0.5, X'6869', NULL), (2, 'b', 1.25, NULL, 'x')")
            .execute(&pool)
            .await
            .unwrap();

        SqliteWarehouse::from_pool(pool)
    }

    #[tokio::test]
    async fn test_query_decodes_storage_classes() {
        let warehouse = create_test_warehouse().await;
        let mut cursor = warehouse
            .query("SELECT * FROM mixed ORDER BY id")
            .await
            .unwrap();

        assert_eq!(
            cursor.columns(),
            ["id", "label", "score", "payload", "missing"].map(String::from)
        );

        let first = cursor.next_row().await.unwrap().expect("first row");
        assert_eq!(
            first,
            vec![
                CellValue::Integer(1),
                CellValue::Text("a".to_string()),
                CellValue::Float(0.5),
                CellValue::Text("hi".to_string()),
                CellValue::Null,
            ]
        );

        let second = cursor.next_row().await.unwrap().expect("second row");
        assert_eq!(second[3], CellValue::Null);
        assert_eq!(second[4], CellValue::Text("x".to_string()));

        assert!(cursor.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_result_keeps_columns() {
        let warehouse = create_test_warehouse().await;
        let mut cursor = warehouse
            .query("SELECT id, label FROM mixed WHERE id > 100")
            .await
            .unwrap();
        assert_eq!(cursor.columns(), ["id", "label"].map(String::from));
        assert!(cursor.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_row_returns_first_row_only() {
        let warehouse = create_test_warehouse().await;
        let row = warehouse
            .query_row("SELECT label FROM mixed ORDER BY id")
            .await
            .unwrap();
        assert_eq!(row, Some(vec![CellValue::Text("a".to_string())]));
    }

    #[tokio::test]
    async fn test_malformed_sql_is_query_error() {
        let warehouse = create_test_warehouse().await;
        let err = warehouse.query("SELEC nonsense").await.err().expect("should fail");
        assert!(matches!(err, ExportError::Query(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_ping() {
        let warehouse = create_test_warehouse().await;
        warehouse.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_missing_file_is_connection_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = SqliteWarehouse::open(&dir.path().join("absent.db"))
            .await
            .unwrap_err();
        assert!(err.is_connection(), "got {err:?}");
    }
}
