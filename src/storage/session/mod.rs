//! Per-user button sessions and per-root baselines
//!
//! A session remembers the buttons a user last saw under a root alias so a
//! later click can be attributed to a label. The baseline is the first card
//! served under the root, used before the user has a session of their own.

mod kv;
mod sea_orm;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::StaticConfig;
use crate::errors::{FramelinkerError, Result};
use crate::frame::Button;
use crate::storage::{Baseline, KvStore, StoreKey};

pub use self::kv::KvSessionStore;
pub use self::sea_orm::SeaOrmSessionStore;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_raw(&self, key: StoreKey<'_>) -> Result<Option<String>>;

    /// Insert or replace.
    async fn store_raw(&self, key: StoreKey<'_>, value: String) -> Result<()>;

    async fn health_check(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;

    async fn load_session(&self, root: &str, fid: u64) -> Result<Option<Vec<Button>>> {
        let raw = self.load_raw(StoreKey::Session { root, fid }).await?;
        Ok(raw.and_then(|json| decode_or_warn(&json, "session")))
    }

    async fn save_session(&self, root: &str, fid: u64, buttons: &[Button]) -> Result<()> {
        let json = serde_json::to_string(buttons)?;
        self.store_raw(StoreKey::Session { root, fid }, json).await
    }

    async fn load_baseline(&self, root: &str) -> Result<Option<Baseline>> {
        let raw = self.load_raw(StoreKey::Baseline(root)).await?;
        Ok(raw.and_then(|json| decode_or_warn(&json, "baseline")))
    }

    async fn save_baseline(&self, root: &str, baseline: &Baseline) -> Result<()> {
        let json = serde_json::to_string(baseline)?;
        self.store_raw(StoreKey::Baseline(root), json).await
    }
}

/// 损坏的记录按不存在处理
fn decode_or_warn<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Option<T> {
    serde_json::from_str(json)
        .inspect_err(|e| warn!("Discarding unreadable {} record: {}", what, e))
        .ok()
}

/// Builds the configured backend: `database` or `kv`.
pub async fn create_session_store(
    config: &StaticConfig,
    kv: Arc<dyn KvStore>,
) -> Result<Arc<dyn SessionStore>> {
    match config.session.backend.as_str() {
        "database" => Ok(Arc::new(SeaOrmSessionStore::connect(&config.database).await?)),
        "kv" => Ok(Arc::new(KvSessionStore::new(kv))),
        other => Err(FramelinkerError::config(format!(
            "Unknown session backend '{}', expected 'database' or 'kv'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ButtonAction;
    use crate::storage::MemoryKvStore;

    fn store() -> KvSessionStore {
        KvSessionStore::new(Arc::new(MemoryKvStore::default()))
    }

    #[tokio::test]
    async fn test_session_roundtrip_and_overwrite() {
        let store = store();
        assert!(store.load_session("root", 7).await.unwrap().is_none());

        store
            .save_session("root", 7, &[Button::new("A", ButtonAction::Post)])
            .await
            .unwrap();
        store
            .save_session("root", 7, &[Button::new("B", ButtonAction::Link)])
            .await
            .unwrap();

        let buttons = store.load_session("root", 7).await.unwrap().unwrap();
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label, "B");
        assert!(store.load_session("root", 8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_reads_as_missing() {
        let store = store();
        store
            .store_raw(StoreKey::Baseline("root"), "{not json".to_string())
            .await
            .unwrap();
        assert!(store.load_baseline("root").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_backend_is_rejected() {
        let mut config = StaticConfig::default();
        config.session.backend = "files".to_string();
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::default());
        assert!(create_session_store(&config, kv).await.is_err());
    }
}
