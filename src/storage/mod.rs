//! Persistence: alias/owner/marker KV plus the session store

pub mod connection;
pub mod keys;
pub mod kv;
pub mod models;
pub mod retry;
pub mod session;

pub use keys::StoreKey;
pub use kv::{KvStore, MemoryKvStore, RedisKvStore, create_kv_store};
pub use models::{AliasOwner, Baseline, Region, StorageStatus};
pub use session::{KvSessionStore, SeaOrmSessionStore, SessionStore, create_session_store};
