//! Request and sample document lookup.
//!
//! Request and sample tables store one JSON document per IGO request (or per
//! request/sample pair). These lookups fetch and parse a single document.

use log::debug;
use serde_json::Value;

use crate::config::{
    DEFAULT_REQUEST_TABLE, DEFAULT_SAMPLE_TABLE, REQUEST_ID_COLUMN, REQUEST_JSON_COLUMN,
    SAMPLE_JSON_COLUMN, SAMPLE_NAME_COLUMN,
};
use crate::error_handling::{ExportError, Result};
use crate::warehouse::{CellValue, Ident, SchemaRef, Warehouse};

/// Point lookups of stored request and sample documents.
pub struct RecordLookup<'a> {
    warehouse: &'a dyn Warehouse,
    schema: SchemaRef,
    request_table: Ident,
    sample_table: Ident,
}

impl<'a> RecordLookup<'a> {
    /// Lookup against the default request and sample tables of `schema`.
    pub fn new(warehouse: &'a dyn Warehouse, schema: SchemaRef) -> Result<Self> {
        Self::with_tables(warehouse, schema, DEFAULT_REQUEST_TABLE, DEFAULT_SAMPLE_TABLE)
    }

    pub fn with_tables(
        warehouse: &'a dyn Warehouse,
        schema: SchemaRef,
        request_table: &str,
        sample_table: &str,
    ) -> Result<Self> {
        Ok(Self {
            warehouse,
            schema,
            request_table: Ident::new(request_table)?,
            sample_table: Ident::new(sample_table)?,
        })
    }

    /// Document stored for `request_id`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// `ExportError::Connection` when the warehouse is unreachable,
    /// `ExportError::Decode` when the stored document is not valid JSON.
    pub async fn get_request(&self, request_id: &str) -> Result<Option<Value>> {
        let dialect = self.warehouse.dialect();
        let predicate = dialect.equals_predicate(REQUEST_ID_COLUMN, request_id);
        let sql = dialect.select_where_sql(
            &self.schema,
            &self.request_table,
            &[REQUEST_JSON_COLUMN],
            &predicate,
        );
        self.fetch_document(&sql, &format!("request {request_id}"))
            .await
    }

    /// Document stored for `sample_name` of `request_id`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Same as [`RecordLookup::get_request`].
    pub async fn get_sample(&self, request_id: &str, sample_name: &str) -> Result<Option<Value>> {
        let dialect = self.warehouse.dialect();
        let predicate = format!(
            "{} AND {}",
            dialect.equals_predicate(REQUEST_ID_COLUMN, request_id),
            dialect.equals_predicate(SAMPLE_NAME_COLUMN, sample_name)
        );
        let sql = dialect.select_where_sql(
            &self.schema,
            &self.sample_table,
            &[SAMPLE_JSON_COLUMN],
            &predicate,
        );
        self.fetch_document(&sql, &format!("sample {sample_name} of request {request_id}"))
            .await
    }

    async fn fetch_document(&self, sql: &str, what: &str) -> Result<Option<Value>> {
        self.warehouse.ping().await?;

        let row = self.warehouse.query_row(sql).await?;
        let document = match row.and_then(|cells| cells.into_iter().next()) {
            None | Some(CellValue::Null) => {
                debug!("No document stored for {what}");
                return Ok(None);
            }
            Some(cell) => cell.to_string(),
        };

        serde_json::from_str(&document)
            .map(Some)
            .map_err(|e| ExportError::Decode {
                what: what.to_string(),
                message: e.to_string(),
            })
    }
}
