//! Warehouse connection setup.

use log::info;

use crate::config::{WarehouseConfig, WarehouseTarget};
use crate::error_handling::InitializationError;
use crate::warehouse::{DatabricksConfig, DatabricksWarehouse, SqliteWarehouse, Warehouse};

use super::client::init_client;

/// Connects the backend selected by `config`.
///
/// No statement is issued here; reachability is checked by the first `ping`.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if the HTTP client cannot be
/// built, or `InitializationError::WarehouseError` if the connection settings are
/// unusable or the SQLite file cannot be opened.
pub async fn init_warehouse(
    config: &WarehouseConfig,
) -> Result<Box<dyn Warehouse>, InitializationError> {
    match &config.target {
        WarehouseTarget::Sqlite { path } => {
            let warehouse = SqliteWarehouse::open(path).await?;
            Ok(Box::new(warehouse))
        }
        WarehouseTarget::Databricks {
            host,
            port,
            http_path,
            token,
        } => {
            let settings = DatabricksConfig::from_connection(host, *port, http_path, token)?;
            info!(
                "Using Databricks SQL warehouse {} at {}",
                settings.warehouse_id, settings.base_url
            );
            let client = init_client(config.timeout_seconds)?;
            Ok(Box::new(DatabricksWarehouse::new(settings, client)?))
        }
    }
}
