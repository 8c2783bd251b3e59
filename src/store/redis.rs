use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use std::time::Duration;

use super::KeyValueStore;

/// Redis-backed keyed store. Suited to short-lived entries such as
/// anti-forgery tokens: native expiry plus `GETDEL` for atomic consumption.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
    namespace: String,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self::new(redis))
    }

    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            namespace: "publink:".to_string(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }
}

/// Escape glob metacharacters so a prefix matches literally in SCAN MATCH.
fn escape_glob(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = conn.get(self.full_key(key)).await?;
        raw.map(|s| serde_json::from_str(&s).map_err(Into::into))
            .transpose()
    }

    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> anyhow::Result<()> {
        let json = serde_json::to_string(&value)?;
        let mut conn = self.redis.clone();
        match ttl {
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(self.full_key(key), json, ttl.as_secs().max(1))
                    .await?
            }
            None => conn.set::<_, _, ()>(self.full_key(key), json).await?,
        }
        Ok(())
    }

    async fn take(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let mut conn = self.redis.clone();
        // GETDEL is a single command, so concurrent takers cannot both see the value.
        let raw: Option<String> = redis::cmd("GETDEL")
            .arg(self.full_key(key))
            .query_async(&mut conn)
            .await?;
        raw.map(|s| serde_json::from_str(&s).map_err(Into::into))
            .transpose()
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(self.full_key(key)).await?;
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> anyhow::Result<Vec<(String, Value)>> {
        let pattern = format!("{}*", escape_glob(&self.full_key(prefix)));
        let mut conn = self.redis.clone();

        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = conn.scan_match::<_, String>(pattern).await?;
            while let Some(k) = iter.next_item().await {
                keys.push(k);
            }
        }
        keys.sort();
        keys.dedup();

        let mut rows = Vec::with_capacity(keys.len());
        for full in keys {
            let raw: Option<String> = conn.get(&full).await?;
            // Key may have expired between SCAN and GET.
            if let Some(raw) = raw {
                let key = full
                    .strip_prefix(&self.namespace)
                    .unwrap_or(&full)
                    .to_string();
                rows.push((key, serde_json::from_str(&raw)?));
            }
        }
        Ok(rows)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("publink:connection:"), "publink:connection:");
        assert_eq!(escape_glob("a*b?[c]\\"), "a\\*b\\?\\[c\\]\\\\");
    }

    /// Requires Redis at REDIS_URL.
    #[tokio::test]
    #[ignore]
    async fn test_redis_take_is_single_use() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let store = RedisStore::connect(&url).await.unwrap();
        store
            .put("test:take", json!({"v": 1}), Some(Duration::from_secs(30)))
            .await
            .unwrap();
        assert_eq!(store.take("test:take").await.unwrap(), Some(json!({"v": 1})));
        assert_eq!(store.take("test:take").await.unwrap(), None);
    }
}
