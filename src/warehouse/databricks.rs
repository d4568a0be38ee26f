//! Databricks SQL warehouse backend.
//!
//! Statements run through the Databricks SQL Statement Execution API
//! (`/api/2.0/sql/statements`). Results are requested as external links to JSON array
//! chunks, which lifts the inline result size cap. Chunks are read one at a time: the
//! next chunk is downloaded only once the cursor has handed out every row of the
//! current one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{CellValue, Dialect, Row, RowCursor, Warehouse};
use crate::config::{STATEMENT_POLL_INTERVAL, STATEMENT_WAIT_TIMEOUT_SECS};
use crate::error_handling::{ExportError, Result};

const STATEMENTS_PATH: &str = "/api/2.0/sql/statements/";

/// Connection settings for a Databricks SQL warehouse.
#[derive(Debug, Clone)]
pub struct DatabricksConfig {
    /// Workspace URL, e.g. `https://dbc-1234.cloud.databricks.com:443`
    pub base_url: String,
    /// Personal access token
    pub token: String,
    /// SQL warehouse id
    pub warehouse_id: String,
    /// Seconds the API may hold a statement request open (0 or 5-50)
    pub wait_timeout_secs: u64,
    /// Delay between status polls of a still-running statement
    pub poll_interval: Duration,
}

impl DatabricksConfig {
    /// Builds settings from the JDBC/ODBC style connection details.
    ///
    /// `host` may carry its own `http://` or `https://` scheme, in which case it is
    /// used verbatim and `port` is ignored. The warehouse id is the last segment of
    /// `http_path` (`/sql/1.0/warehouses/<id>`).
    pub fn from_connection(host: &str, port: u16, http_path: &str, token: &str) -> Result<Self> {
        let warehouse_id = warehouse_id_from_path(http_path).ok_or_else(|| {
            ExportError::Connection(format!(
                "HTTP path '{http_path}' does not name a SQL warehouse"
            ))
        })?;

        Ok(Self {
            base_url: base_url(host, port),
            token: token.to_string(),
            warehouse_id: warehouse_id.to_string(),
            wait_timeout_secs: STATEMENT_WAIT_TIMEOUT_SECS,
            poll_interval: STATEMENT_POLL_INTERVAL,
        })
    }
}

fn base_url(host: &str, port: u16) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}:{port}")
    }
}

fn warehouse_id_from_path(http_path: &str) -> Option<&str> {
    http_path.rsplit('/').find(|segment| !segment.is_empty())
}

/// Warehouse reached through the Databricks SQL Statement Execution API.
#[derive(Debug, Clone)]
pub struct DatabricksWarehouse {
    client: Arc<reqwest::Client>,
    base_url: Url,
    token: String,
    warehouse_id: String,
    wait_timeout: String,
    poll_interval: Duration,
}

impl DatabricksWarehouse {
    pub fn new(config: DatabricksConfig, client: Arc<reqwest::Client>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ExportError::Connection(format!("invalid workspace URL '{}': {e}", config.base_url))
        })?;
        Ok(Self {
            client,
            base_url,
            token: config.token,
            warehouse_id: config.warehouse_id,
            wait_timeout: format!("{}s", config.wait_timeout_secs),
            poll_interval: config.poll_interval,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ExportError::Query(format!("invalid API path '{path}': {e}")))
    }

    /// Submits `sql` and waits (polling) until it reaches a terminal state.
    async fn execute(&self, sql: &str) -> Result<StatementResponse> {
        debug!("Executing statement on warehouse {}: {}", self.warehouse_id, sql);

        let request = StatementRequest {
            statement: sql,
            warehouse_id: &self.warehouse_id,
            wait_timeout: &self.wait_timeout,
            on_wait_timeout: "CONTINUE",
            disposition: "EXTERNAL_LINKS",
            format: "JSON_ARRAY",
        };
        let response = self
            .client
            .post(self.endpoint(STATEMENTS_PATH)?)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let mut statement: StatementResponse = read_json(response).await?;

        loop {
            match statement.status.state {
                StatementState::Pending | StatementState::Running => {
                    debug!(
                        "Statement {} is {:?}, polling again",
                        statement.statement_id, statement.status.state
                    );
                    tokio::time::sleep(self.poll_interval).await;
                    let path = format!("{STATEMENTS_PATH}{}", statement.statement_id);
                    statement = self.get_json(&path).await?;
                }
                StatementState::Succeeded => return Ok(statement),
                _ => return Err(ExportError::Query(statement.status.describe())),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.endpoint(path)?)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    /// Downloads one presigned result chunk. The link carries its own
    /// credentials, so no bearer token is sent.
    async fn download_chunk(&self, link: &ExternalLink) -> Result<Vec<Vec<Option<String>>>> {
        debug!(
            "Downloading result chunk {} ({} rows)",
            link.chunk_index, link.row_count
        );
        let response = self
            .client
            .get(&link.external_link)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Query(format!(
                "result chunk {} download failed (HTTP {status})",
                link.chunk_index
            )));
        }
        response.json().await.map_err(|e| {
            ExportError::Query(format!("malformed result chunk {}: {e}", link.chunk_index))
        })
    }
}

#[async_trait]
impl Warehouse for DatabricksWarehouse {
    fn dialect(&self) -> Dialect {
        Dialect::Databricks
    }

    async fn query<'a>(&'a self, sql: &str) -> Result<Box<dyn RowCursor + 'a>> {
        let statement = self.execute(sql).await?;

        let columns = statement
            .manifest
            .map(|m| m.schema.columns.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();
        let mut cursor = DatabricksCursor {
            warehouse: self,
            columns,
            buffered: Vec::new().into_iter(),
            pending_links: VecDeque::new(),
            next_link: None,
        };
        if let Some(chunk) = statement.result {
            cursor.accept(chunk);
        }
        Ok(Box::new(cursor))
    }

    async fn ping(&self) -> Result<()> {
        match self.execute(Dialect::Databricks.ping_sql()).await {
            Ok(_) => Ok(()),
            Err(ExportError::Query(msg)) => Err(ExportError::Connection(msg)),
            Err(e) => Err(e),
        }
    }
}

/// Cursor over JSON_ARRAY result chunks, inline or behind external links.
struct DatabricksCursor<'a> {
    warehouse: &'a DatabricksWarehouse,
    columns: Vec<String>,
    buffered: std::vec::IntoIter<Vec<Option<String>>>,
    pending_links: VecDeque<ExternalLink>,
    next_link: Option<String>,
}

impl DatabricksCursor<'_> {
    fn accept(&mut self, chunk: ResultChunk) {
        self.next_link = chunk.next_chunk_internal_link.or_else(|| {
            chunk
                .external_links
                .iter()
                .rev()
                .find_map(|l| l.next_chunk_internal_link.clone())
        });
        self.buffered = chunk.data_array.unwrap_or_default().into_iter();
        self.pending_links = chunk.external_links.into();
    }
}

#[async_trait]
impl RowCursor for DatabricksCursor<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if let Some(raw) = self.buffered.next() {
                return Ok(Some(raw.into_iter().map(to_cell).collect()));
            }
            if let Some(link) = self.pending_links.pop_front() {
                self.buffered = self.warehouse.download_chunk(&link).await?.into_iter();
                continue;
            }
            let Some(link) = self.next_link.take() else {
                return Ok(None);
            };
            let chunk: ResultChunk = self.warehouse.get_json(&link).await?;
            self.accept(chunk);
        }
    }
}

fn to_cell(value: Option<String>) -> CellValue {
    match value {
        Some(text) => CellValue::Text(text),
        None => CellValue::Null,
    }
}

fn transport_error(err: reqwest::Error) -> ExportError {
    ExportError::Connection(err.to_string())
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ExportError::Connection(format!(
            "warehouse rejected credentials (HTTP {status})"
        )));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ExportError::Query(format!("HTTP {status}: {body}")));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ExportError::Query(format!("malformed statement response: {e}")))
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    warehouse_id: &'a str,
    wait_timeout: &'a str,
    on_wait_timeout: &'a str,
    disposition: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: String,
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<ResultManifest>,
    #[serde(default)]
    result: Option<ResultChunk>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: StatementState,
    #[serde(default)]
    error: Option<ServiceError>,
}

impl StatementStatus {
    fn describe(&self) -> String {
        match &self.error {
            Some(ServiceError {
                error_code,
                message,
            }) => format!(
                "statement {:?}: {} ({})",
                self.state,
                message.as_deref().unwrap_or("no message"),
                error_code.as_deref().unwrap_or("no error code")
            ),
            None => format!("statement {:?}", self.state),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultManifest {
    schema: ResultSchema,
}

#[derive(Debug, Deserialize)]
struct ResultSchema {
    #[serde(default)]
    columns: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize)]
struct ColumnInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResultChunk {
    #[serde(default)]
    data_array: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    external_links: Vec<ExternalLink>,
    #[serde(default)]
    next_chunk_internal_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalLink {
    #[serde(default)]
    chunk_index: u64,
    #[serde(default)]
    row_count: u64,
    external_link: String,
    #[serde(default)]
    next_chunk_internal_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn warehouse_for(server: &MockServer) -> DatabricksWarehouse {
        let config = DatabricksConfig {
            base_url: server.uri(),
            token: "dapi-test".to_string(),
            warehouse_id: "wh1".to_string(),
            wait_timeout_secs: 10,
            poll_interval: Duration::from_millis(5),
        };
        DatabricksWarehouse::new(config, Arc::new(reqwest::Client::new())).unwrap()
    }

    fn succeeded(rows: serde_json::Value, next_link: Option<&str>) -> serde_json::Value {
        json!({
            "statement_id": "s1",
            "status": {"state": "SUCCEEDED"},
            "manifest": {
                "format": "JSON_ARRAY",
                "schema": {
                    "column_count": 2,
                    "columns": [
                        {"name": "PATIENT_ID", "type_name": "STRING", "position": 0},
                        {"name": "AGE", "type_name": "INT", "position": 1}
                    ]
                }
            },
            "result": {
                "chunk_index": 0,
                "data_array": rows,
                "next_chunk_internal_link": next_link
            }
        })
    }

    async fn collect(cursor: &mut Box<dyn RowCursor + '_>) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row().await.unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_base_url_and_warehouse_id() {
        assert_eq!(
            base_url("dbc-1.cloud.databricks.com", 443),
            "https://dbc-1.cloud.databricks.com:443"
        );
        assert_eq!(base_url("http://localhost:8080/", 443), "http://localhost:8080");
        assert_eq!(
            warehouse_id_from_path("/sql/1.0/warehouses/abc123"),
            Some("abc123")
        );
        assert_eq!(warehouse_id_from_path("/sql/1.0/warehouses/abc123/"), Some("abc123"));
        assert_eq!(warehouse_id_from_path("/"), None);
    }

    #[test]
    fn test_config_requires_warehouse_in_path() {
        let err = DatabricksConfig::from_connection("host", 443, "", "tok").unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_first_chunk_rows_are_streamed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .and(header("authorization", "Bearer dapi-test"))
            .and(body_partial_json(json!({
                "warehouse_id": "wh1",
                "disposition": "EXTERNAL_LINKS",
                "format": "JSON_ARRAY"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(succeeded(json!([["P1", "61"], ["P2", null]]), None)),
            )
            .mount(&server)
            .await;

        let warehouse = warehouse_for(&server);
        let mut cursor = warehouse.query("SELECT 1").await.unwrap();
        assert_eq!(cursor.columns(), ["PATIENT_ID", "AGE"].map(String::from));
        let rows = collect(&mut cursor).await;
        assert_eq!(
            rows,
            vec![
                vec![CellValue::from("P1"), CellValue::from("61")],
                vec![CellValue::from("P2"), CellValue::Null],
            ]
        );
    }

    #[tokio::test]
    async fn test_pending_statement_is_polled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "s1",
                "status": {"state": "PENDING"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/2.0/sql/statements/s1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(succeeded(json!([["P1", "61"]]), None)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let warehouse = warehouse_for(&server);
        let mut cursor = warehouse.query("SELECT 1").await.unwrap();
        assert_eq!(collect(&mut cursor).await.len(), 1);
    }

    #[tokio::test]
    async fn test_additional_chunks_are_fetched_lazily() {
        let server = MockServer::start().await;
        let chunk_path = "/api/2.0/sql/statements/s1/result/chunks/1";
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(succeeded(json!([["P1", "61"]]), Some(chunk_path))),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(chunk_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "chunk_index": 1,
                "data_array": [["P2", "47"], ["P3", "70"]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let warehouse = warehouse_for(&server);
        let mut cursor = warehouse.query("SELECT * FROM t").await.unwrap();
        let rows = collect(&mut cursor).await;
        let ids: Vec<String> = rows.iter().map(|r| r[0].to_string()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);
    }

    fn external_chunk(
        server: &MockServer,
        index: u64,
        rows: u64,
        next_link: Option<&str>,
    ) -> serde_json::Value {
        json!({
            "chunk_index": index,
            "row_offset": 0,
            "row_count": rows,
            "external_link": format!("{}/presigned/chunk{index}.json", server.uri()),
            "next_chunk_internal_link": next_link,
            "expiration": "2026-10-19T12:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_external_link_chunks_are_downloaded_in_order() {
        let server = MockServer::start().await;
        let chunk_path = "/api/2.0/sql/statements/s1/result/chunks/1";
        let first_link = external_chunk(&server, 0, 1, Some(chunk_path));
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .and(body_partial_json(json!({"disposition": "EXTERNAL_LINKS"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "s1",
                "status": {"state": "SUCCEEDED"},
                "manifest": {
                    "format": "JSON_ARRAY",
                    "schema": {"columns": [{"name": "PATIENT_ID"}, {"name": "AGE"}]}
                },
                "result": {"external_links": [first_link]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(chunk_path))
            .and(header("authorization", "Bearer dapi-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "external_links": [external_chunk(&server, 1, 2, None)]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presigned/chunk0.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([["P1", "61"]])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presigned/chunk1.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([["P2", null], ["P3", "70"]])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let warehouse = warehouse_for(&server);
        let mut cursor = warehouse.query("SELECT * FROM t").await.unwrap();
        assert_eq!(cursor.columns(), ["PATIENT_ID", "AGE"]);
        let rows = collect(&mut cursor).await;
        let ids: Vec<String> = rows.iter().map(|r| r[0].to_string()).collect();
        assert_eq!(ids, vec!["P1", "P2", "P3"]);
        assert_eq!(rows[1][1], CellValue::Null);

        let requests = server.received_requests().await.unwrap();
        let presigned: Vec<_> = requests
            .iter()
            .filter(|r| r.url.path().starts_with("/presigned/"))
            .collect();
        assert_eq!(presigned.len(), 2);
        assert!(presigned
            .iter()
            .all(|r| !r.headers.contains_key("authorization")));
    }

    #[tokio::test]
    async fn test_expired_external_link_is_query_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "s1",
                "status": {"state": "SUCCEEDED"},
                "manifest": {"schema": {"columns": [{"name": "PATIENT_ID"}]}},
                "result": {"external_links": [external_chunk(&server, 0, 1, None)]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presigned/chunk0.json"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let warehouse = warehouse_for(&server);
        let mut cursor = warehouse.query("SELECT * FROM t").await.unwrap();
        let err = cursor.next_row().await.unwrap_err();
        assert!(matches!(err, ExportError::Query(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_failed_statement_is_query_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "s1",
                "status": {
                    "state": "FAILED",
                    "error": {
                        "error_code": "BAD_REQUEST",
                        "message": "[TABLE_OR_VIEW_NOT_FOUND] The table `x` cannot be found"
                    }
                }
            })))
            .mount(&server)
            .await;

        let warehouse = warehouse_for(&server);
        let err = warehouse.query("SELECT * FROM x").await.err().expect("should fail");
        match err {
            ExportError::Query(msg) => assert!(msg.contains("TABLE_OR_VIEW_NOT_FOUND"), "{msg}"),
            other => panic!("expected query error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejected_token_is_connection_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let warehouse = warehouse_for(&server);
        let err = warehouse.ping().await.unwrap_err();
        assert!(err.is_connection(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_error() {
        let config = DatabricksConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            token: "t".to_string(),
            warehouse_id: "wh1".to_string(),
            wait_timeout_secs: 5,
            poll_interval: Duration::from_millis(5),
        };
        let warehouse =
            DatabricksWarehouse::new(config, Arc::new(reqwest::Client::new())).unwrap();
        let err = warehouse.ping().await.unwrap_err();
        assert!(err.is_connection(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_failed_ping_is_connection_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATEMENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statement_id": "s1",
                "status": {"state": "CANCELED"}
            })))
            .mount(&server)
            .await;

        let warehouse = warehouse_for(&server);
        assert!(warehouse.ping().await.unwrap_err().is_connection());
    }
}
