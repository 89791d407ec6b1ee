use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use super::KvStore;
use crate::config::RedisConfig;
use crate::errors::{FramelinkerError, Result};
use crate::storage::StoreKey;

pub struct RedisKvStore {
    client: redis::Client,
    /// 复用的多路复用连接，出错时清空以便下次重连
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisKvStore {
    /// Opens the client and verifies the server answers PING.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            FramelinkerError::config(format!("Invalid redis url '{}': {}", config.url, e))
        })?;

        let store = Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: config.key_prefix.clone(),
        };
        store.health_check().await.inspect_err(|e| {
            error!("Redis ping failed for {}: {}", config.url, e);
        })?;

        debug!("RedisKvStore ready with prefix '{}'", store.key_prefix);
        Ok(store)
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        {
            let guard = self.connection.read().await;
            if let Some(conn) = guard.as_ref() {
                return Ok(conn.clone());
            }
        }

        let mut guard = self.connection.write().await;
        // 双重检查
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        *guard = Some(conn.clone());
        debug!("Redis connection established and cached");
        Ok(conn)
    }

    async fn reset_connection(&self) {
        *self.connection.write().await = None;
        debug!("Redis connection reset");
    }

    fn make_key(&self, key: StoreKey<'_>) -> String {
        format!("{}{}", self.key_prefix, key.encode())
    }

    /// Drops the cached connection on any redis error.
    async fn on_error<T>(&self, result: redis::RedisResult<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                self.reset_connection().await;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: StoreKey<'_>) -> Result<Option<String>> {
        let redis_key = self.make_key(key);
        let mut conn = self.get_connection().await?;
        let value: Option<String> = self.on_error(conn.get(&redis_key).await).await?;
        trace!("redis get {} -> {}", redis_key, value.is_some());
        Ok(value)
    }

    async fn put(&self, key: StoreKey<'_>, value: &str) -> Result<()> {
        let redis_key = self.make_key(key);
        let mut conn = self.get_connection().await?;
        self.on_error(conn.set::<_, _, ()>(&redis_key, value).await)
            .await
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let pong: String = self
            .on_error(redis::cmd("PING").query_async(&mut conn).await)
            .await?;
        trace!("redis ping: {}", pong);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
