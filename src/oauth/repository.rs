use std::sync::Arc;

use crate::errors::AppError;
use crate::models::{ConnectionKey, PlatformConnection};
use crate::store::KeyValueStore;

pub const CONNECTION_KEY_PREFIX: &str = "connection:";

/// One record per connection key under `connection:<key>`. Keyed storage
/// only: no caching, no business rules.
#[derive(Clone)]
pub struct ConnectionRepository {
    store: Arc<dyn KeyValueStore>,
}

fn storage_key(key: ConnectionKey) -> String {
    format!("{}{}", CONNECTION_KEY_PREFIX, key.as_str())
}

impl ConnectionRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Insert or overwrite. Concurrent writers for one key: last one wins.
    pub async fn upsert(&self, connection: &PlatformConnection) -> Result<(), AppError> {
        let value = serde_json::to_value(connection).map_err(|e| AppError::persistence(e.into()))?;
        self.store
            .put(&storage_key(connection.key()), value, None)
            .await
            .map_err(AppError::persistence)
    }

    pub async fn get(&self, key: ConnectionKey) -> Result<Option<PlatformConnection>, AppError> {
        let raw = self
            .store
            .get(&storage_key(key))
            .await
            .map_err(AppError::persistence)?;
        raw.map(|v| serde_json::from_value(v).map_err(|e| AppError::persistence(e.into())))
            .transpose()
    }

    /// Records whose key starts with `prefix` (e.g. `"meta"` matches `meta` and `meta_photo`).
    pub async fn list_by_prefix(&self, prefix: &str) -> Result<Vec<PlatformConnection>, AppError> {
        let rows = self
            .store
            .list_prefix(&format!("{}{}", CONNECTION_KEY_PREFIX, prefix))
            .await
            .map_err(AppError::persistence)?;

        let mut connections = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            match serde_json::from_value::<PlatformConnection>(value) {
                Ok(conn) => connections.push(conn),
                Err(e) => {
                    // One corrupt row must not hide the others.
                    tracing::error!(key = %key, "skipping unreadable connection record: {}", e);
                }
            }
        }
        Ok(connections)
    }

    pub async fn list_all(&self) -> Result<Vec<PlatformConnection>, AppError> {
        self.list_by_prefix("").await
    }

    /// Deleting a missing record is not an error.
    pub async fn delete(&self, key: ConnectionKey) -> Result<(), AppError> {
        self.store
            .delete(&storage_key(key))
            .await
            .map_err(AppError::persistence)
    }
}
