use crate::errors::AppError;
use crate::models::ConnectionKey;

use super::repository::ConnectionRepository;

#[derive(Clone)]
pub struct DisconnectHandler {
    repository: ConnectionRepository,
}

impl DisconnectHandler {
    pub fn new(repository: ConnectionRepository) -> Self {
        Self { repository }
    }

    /// Remove a platform's record and everything derived from it.
    /// Returns the keys that were cleared. Idempotent.
    pub async fn disconnect(&self, platform: Option<&str>) -> Result<Vec<ConnectionKey>, AppError> {
        let raw = platform
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(AppError::MissingPlatform)?;
        let key: ConnectionKey = raw
            .parse()
            .map_err(|_| AppError::UnknownPlatform(raw.to_string()))?;
        self.disconnect_key(key).await
    }

    pub async fn disconnect_key(&self, key: ConnectionKey) -> Result<Vec<ConnectionKey>, AppError> {
        let mut cleared = vec![key];
        cleared.extend_from_slice(key.dependents());

        // Dependents go first: a failure part-way leaves the primary on file
        // and a retry finishes the cascade.
        for k in cleared.iter().rev() {
            self.repository.delete(*k).await?;
        }
        tracing::info!(key = %key, cleared = cleared.len(), "connection removed");
        Ok(cleared)
    }
}
