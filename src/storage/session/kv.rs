use std::sync::Arc;

use async_trait::async_trait;

use super::SessionStore;
use crate::errors::Result;
use crate::storage::{KvStore, StoreKey};

/// Sessions kept next to aliases in the KV store
pub struct KvSessionStore {
    kv: Arc<dyn KvStore>,
}

impl KvSessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl SessionStore for KvSessionStore {
    async fn load_raw(&self, key: StoreKey<'_>) -> Result<Option<String>> {
        self.kv.get(key).await
    }

    async fn store_raw(&self, key: StoreKey<'_>, value: String) -> Result<()> {
        self.kv.put(key, &value).await
    }

    async fn health_check(&self) -> Result<()> {
        self.kv.health_check().await
    }

    fn backend_name(&self) -> &'static str {
        "kv"
    }
}
