use async_trait::async_trait;
use moka::future::Cache;
use tracing::trace;

use super::KvStore;
use crate::errors::Result;
use crate::storage::StoreKey;

/// 进程内 KV，不设容量上限
///
/// 别名一经写入就不能丢，所以这里不做任何淘汰，数据随进程结束而消失。
#[derive(Clone)]
pub struct MemoryKvStore {
    inner: Cache<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: StoreKey<'_>) -> Result<Option<String>> {
        Ok(self.inner.get(&key.encode()).await)
    }

    async fn put(&self, key: StoreKey<'_>, value: &str) -> Result<()> {
        let encoded = key.encode();
        trace!("memory kv put {}", encoded);
        self.inner.insert(encoded, value.to_string()).await;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
