//! Schema catalog: which tables exist, and which of them can be exported.

use log::debug;

use crate::error_handling::Result;
use crate::registry::Registry;
use crate::warehouse::{Ident, SchemaRef, Warehouse};

/// Table discovery over one warehouse, filtered through a registry.
pub struct SchemaCatalog<'a> {
    warehouse: &'a dyn Warehouse,
    registry: &'a Registry,
}

impl<'a> SchemaCatalog<'a> {
    pub fn new(warehouse: &'a dyn Warehouse, registry: &'a Registry) -> Self {
        Self {
            warehouse,
            registry,
        }
    }

    /// Names of every table in `schema`, in the order the warehouse lists them.
    pub async fn list_tables(&self, schema: &SchemaRef) -> Result<Vec<String>> {
        let dialect = self.warehouse.dialect();
        let mut cursor = self.warehouse.query(&dialect.list_tables_sql(schema)).await?;

        // SHOW TABLES returns (database, tableName, isTemporary)
        let name_index = cursor
            .columns()
            .iter()
            .position(|c| c.eq_ignore_ascii_case(dialect.table_name_column()))
            .unwrap_or(0);

        let mut tables = Vec::new();
        while let Some(row) = cursor.next_row().await? {
            if let Some(cell) = row.get(name_index).filter(|cell| !cell.is_null()) {
                tables.push(cell.to_string());
            }
        }
        debug!("Found {} tables in {}", tables.len(), schema);
        Ok(tables)
    }

    /// Tables of `schema` that have a registry entry, in warehouse order.
    pub async fn list_supported_tables(&self, schema: &SchemaRef) -> Result<Vec<String>> {
        let supported: Vec<String> = self
            .list_tables(schema)
            .await?
            .into_iter()
            .filter(|table| self.registry.contains(table))
            .collect();
        debug!("{} of them are exportable", supported.len());
        Ok(supported)
    }

    /// Whether `table` exists in `schema`.
    pub async fn table_exists(&self, schema: &SchemaRef, table: &str) -> Result<bool> {
        let table = Ident::new(table)?;
        let sql = self.warehouse.dialect().table_exists_sql(schema, &table);
        Ok(self.warehouse.query_row(&sql).await?.is_some())
    }
}
