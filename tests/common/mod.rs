#![allow(dead_code)]

use std::sync::Once;

use data_structure_service::DatabaseManager;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Opens a freshly migrated catalog in its own temporary directory. The
/// directory is removed when the returned guard is dropped.
pub async fn temp_database() -> (DatabaseManager, TempDir) {
    init_test_logging();

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.db");
    let database_url = path.to_str().expect("temp path is not UTF-8").to_string();

    let database = DatabaseManager::new(&database_url, 4)
        .await
        .expect("Failed to open catalog database");

    (database, dir)
}
