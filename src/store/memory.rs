use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::KeyValueStore;

/// Entry stored in the DashMap with an optional expiry timestamp.
#[derive(Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-process store backed by a DashMap. TTLs are checked on read and
/// evicted lazily. Used by tests and single-node demos.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries (for tests / debugging).
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
            // expired: drop the ref before removing
            drop(entry);
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> anyhow::Result<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );
        Ok(())
    }

    async fn take(&self, key: &str) -> anyhow::Result<Option<Value>> {
        // DashMap::remove holds the shard lock, so only one caller wins.
        let removed = self.entries.remove(key);
        Ok(removed
            .map(|(_, entry)| entry)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Value)>> {
        let now = Instant::now();
        let mut rows: Vec<(String, Value)> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && e.is_live(now))
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
