//! Key-value store for aliases, owners and identify markers
//!
//! Values are opaque strings; callers serialize structured data themselves.

mod memory;
mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::KvConfig;
use crate::errors::{FramelinkerError, Result};
use crate::storage::StoreKey;

pub use self::memory::MemoryKvStore;
pub use self::redis::RedisKvStore;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: StoreKey<'_>) -> Result<Option<String>>;

    /// Unconditional overwrite.
    async fn put(&self, key: StoreKey<'_>, value: &str) -> Result<()>;

    async fn health_check(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Builds the configured backend (`memory` or `redis`).
pub async fn create_kv_store(config: &KvConfig) -> Result<Arc<dyn KvStore>> {
    let store: Arc<dyn KvStore> = match config.kv_type.as_str() {
        "memory" => Arc::new(MemoryKvStore::new()),
        "redis" => Arc::new(RedisKvStore::connect(&config.redis).await?),
        other => {
            return Err(FramelinkerError::config(format!(
                "Unknown kv type '{}', expected 'memory' or 'redis'",
                other
            )));
        }
    };
    info!("KV store initialized: {}", store.backend_name());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_factory_rejects_unknown_type() {
        let config = KvConfig {
            kv_type: "etcd".to_string(),
            ..KvConfig::default()
        };
        let err = create_kv_store(&config).await.err().unwrap();
        assert!(matches!(err, FramelinkerError::Config(_)));
    }

    #[tokio::test]
    async fn test_factory_builds_memory_store() {
        let store = create_kv_store(&KvConfig::default()).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        store.put(StoreKey::Alias("abc"), "https://x.io").await.unwrap();
        assert_eq!(
            store.get(StoreKey::Alias("abc")).await.unwrap().as_deref(),
            Some("https://x.io")
        );
    }
}
