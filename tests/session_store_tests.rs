//! Session store tests against a real SQLite file

use std::sync::Arc;

use tempfile::TempDir;

use framelinker::config::{DatabaseConfig, StaticConfig};
use framelinker::frame::{Button, ButtonAction};
use framelinker::storage::{
    Baseline, MemoryKvStore, SeaOrmSessionStore, SessionStore, StoreKey, create_session_store,
};

fn sqlite_config(dir: &TempDir, name: &str) -> DatabaseConfig {
    DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", dir.path().join(name).display()),
        ..DatabaseConfig::default()
    }
}

fn buttons(labels: &[&str]) -> Vec<Button> {
    labels
        .iter()
        .map(|l| Button::new(*l, ButtonAction::Post))
        .collect()
}

#[tokio::test]
async fn test_session_upsert_overwrites() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = SeaOrmSessionStore::connect(&sqlite_config(&dir, "sessions.db"))
        .await
        .expect("Failed to open session store");

    assert!(store.load_session("root0001", 7).await.unwrap().is_none());

    store.save_session("root0001", 7, &buttons(&["A", "B"])).await.unwrap();
    store.save_session("root0001", 7, &buttons(&["C"])).await.unwrap();
    store.save_session("root0001", 8, &buttons(&["D"])).await.unwrap();

    assert_eq!(
        store.load_session("root0001", 7).await.unwrap(),
        Some(buttons(&["C"]))
    );
    assert_eq!(
        store.load_session("root0001", 8).await.unwrap(),
        Some(buttons(&["D"]))
    );
    assert!(store.load_session("root0002", 7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_baseline_roundtrip_and_reload() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = sqlite_config(&dir, "baseline.db");

    {
        let store = SeaOrmSessionStore::connect(&config).await.unwrap();
        let baseline = Baseline::new(
            ["child001".to_string(), "child002".to_string()],
            buttons(&["Yes", "No"]),
        );
        store.save_baseline("root0001", &baseline).await.unwrap();
    }

    // 重新连接，迁移可重复执行
    let store = SeaOrmSessionStore::connect(&config).await.unwrap();
    let loaded = store.load_baseline("root0001").await.unwrap().unwrap();
    assert!(loaded.contains("child002"));
    assert!(!loaded.contains("root0001"));
    assert_eq!(loaded.buttons, buttons(&["Yes", "No"]));
}

#[tokio::test]
async fn test_corrupt_record_reads_as_missing() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = SeaOrmSessionStore::connect(&sqlite_config(&dir, "corrupt.db"))
        .await
        .unwrap();

    store
        .store_raw(StoreKey::Session { root: "root0001", fid: 7 }, "{not json".to_string())
        .await
        .unwrap();
    assert!(store.load_session("root0001", 7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_factory_selects_backend() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let kv = Arc::new(MemoryKvStore::default());

    let mut config = StaticConfig::default();
    config.database = sqlite_config(&dir, "factory.db");
    let store = create_session_store(&config, kv.clone()).await.unwrap();
    assert_eq!(store.backend_name(), "database");
    store.health_check().await.unwrap();

    config.session.backend = "kv".to_string();
    let store = create_session_store(&config, kv.clone()).await.unwrap();
    assert_eq!(store.backend_name(), "kv");

    config.session.backend = "files".to_string();
    assert!(create_session_store(&config, kv).await.is_err());
}
