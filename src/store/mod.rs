pub mod memory;
pub mod postgres;
pub mod redis;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Abstraction over keyed settings storage.
/// Implementations: PgStore (settings table), RedisStore, MemoryStore.
///
/// Every read reflects the latest write; none of the backends cache.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Insert or overwrite. An entry past its `ttl` reads as absent.
    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> anyhow::Result<()>;

    /// Atomically read and delete. Two concurrent callers never both get `Some`.
    async fn take(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// All entries whose key starts with `prefix`, sorted by key.
    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Value)>>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> anyhow::Result<()> {
        self.get("__ping__").await.map(|_| ())
    }
}

pub use self::memory::MemoryStore;
pub use self::postgres::PgStore;
pub use self::redis::RedisStore;
