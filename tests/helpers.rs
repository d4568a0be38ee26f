// Shared test helpers for building warehouse fixtures.
//
// This module provides a small cBioPortal-shaped SQLite database used by the
// integration tests in place of a live warehouse.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tempfile::TempDir;

use portal_export::{Config, FailurePolicy, WarehouseConfig, WarehouseTarget};

/// Creates (or reopens) a writable SQLite file.
///
/// Rollback journaling keeps the file readable by the read-only warehouse
/// connection once this pool is closed.
pub async fn create_test_pool_with_path(db_path: &Path) -> SqlitePool {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create test database")
}

/// Executes each statement in order.
pub async fn execute_all(pool: &SqlitePool, statements: &[&str]) {
    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .unwrap_or_else(|e| panic!("Failed to execute {statement}: {e}"));
    }
}

/// Builds a staging schema with:
/// - `data_sv` and `data_clinical_sample` (row-major tables)
/// - `data_cna` (transposed table)
/// - `scratch_notes` (not in the registry)
/// - `cbioportal_metadata` with sidecar rows for clinical sample and CNA
///
/// Tables are created in that order, which is the order SQLite lists them in.
#[allow(dead_code)] // Used by other test files
pub async fn create_staging_db(dir: &Path) -> PathBuf {
    let db_path = dir.join("staging.db");
    let pool = create_test_pool_with_path(&db_path).await;
    execute_all(
        &pool,
        &[
            "CREATE TABLE data_sv (SAMPLE_ID TEXT, SITE1_HUGO_SYMBOL TEXT, SV_STATUS TEXT)",
            "INSERT INTO data_sv VALUES ('S1', 'ALK', 'SOMATIC')",
            "CREATE TABLE data_clinical_sample (PATIENT_ID TEXT, CANCER_TYPE TEXT, SAMPLE_ID TEXT)",
            "INSERT INTO data_clinical_sample VALUES ('P1', 'LUAD', 'S1'), ('P2', 'BRCA', 'S2')",
            "CREATE TABLE data_cna (SAMPLE_ID TEXT, TP53 INTEGER, EGFR INTEGER)",
            "INSERT INTO data_cna VALUES ('S1', -2, 0), ('S2', 0, NULL)",
            "CREATE TABLE scratch_notes (note TEXT)",
            "INSERT INTO scratch_notes VALUES ('not exported')",
            "CREATE TABLE cbioportal_metadata (
                study_id TEXT, data_filename TEXT, meta_key TEXT, meta_value TEXT
            )",
            "INSERT INTO cbioportal_metadata VALUES
                ('msk_impact', 'data_clinical_sample.txt', 'genetic_alteration_type', 'CLINICAL'),
                ('msk_impact', 'data_clinical_sample.txt', 'datatype', 'SAMPLE_ATTRIBUTES'),
                ('msk_impact', 'data_CNA.txt', 'genetic_alteration_type', 'COPY_NUMBER_ALTERATION'),
                ('msk_impact', 'data_CNA.txt', 'datatype', 'DISCRETE')",
        ],
    )
    .await;
    pool.close().await;
    db_path
}

/// Export configuration reading `db_path` and writing into `output_dir`.
#[allow(dead_code)] // Used by other test files
pub fn sqlite_config(db_path: &Path, output_dir: &Path, policy: FailurePolicy) -> Config {
    Config {
        warehouse: WarehouseConfig {
            target: WarehouseTarget::Sqlite {
                path: db_path.to_path_buf(),
            },
            ..Default::default()
        },
        output_dir: output_dir.to_path_buf(),
        failure_policy: policy,
        ..Default::default()
    }
}

/// Temporary directory holding a staging database and an output directory.
#[allow(dead_code)] // Used by other test files
pub async fn staging_fixture() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = create_staging_db(temp_dir.path()).await;
    let output_dir = temp_dir.path().join("out");
    (temp_dir, db_path, output_dir)
}
