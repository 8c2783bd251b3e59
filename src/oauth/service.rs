use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ConnectionKey, ConnectionSummary, Platform, PlatformConnection};
use crate::store::KeyValueStore;

use super::authorize::AuthUrlBuilder;
use super::disconnect::DisconnectHandler;
use super::exchange::TokenExchangeClient;
use super::repository::ConnectionRepository;
use super::state::StateTokenStore;
use super::status::{self, ConnectionStatus};

/// Entry point for the connection lifecycle: authorize, callback, status,
/// disconnect and channel refresh.
#[derive(Clone)]
pub struct ConnectionService {
    config: Arc<Config>,
    states: StateTokenStore,
    auth_urls: AuthUrlBuilder,
    exchange: TokenExchangeClient,
    repository: ConnectionRepository,
    disconnects: DisconnectHandler,
}

impl ConnectionService {
    /// `connections` holds the records; `states` holds anti-forgery tokens.
    /// Both may be the same backend.
    pub fn new(
        config: Arc<Config>,
        connections: Arc<dyn KeyValueStore>,
        states: Arc<dyn KeyValueStore>,
    ) -> anyhow::Result<Self> {
        let states = StateTokenStore::new(states);
        let repository = ConnectionRepository::new(connections);
        Ok(Self {
            auth_urls: AuthUrlBuilder::new(config.clone(), states.clone()),
            exchange: TokenExchangeClient::new(config.clone())?,
            disconnects: DisconnectHandler::new(repository.clone()),
            config,
            states,
            repository,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn repository(&self) -> &ConnectionRepository {
        &self.repository
    }

    pub async fn auth_url(&self, platform: Platform) -> Result<String, AppError> {
        self.auth_urls.build_auth_url(platform).await
    }

    /// Verify the state token, run the provider exchange and persist the
    /// result. Returns the primary record.
    pub async fn handle_callback(
        &self,
        platform: Platform,
        code: &str,
        state: &str,
    ) -> Result<PlatformConnection, AppError> {
        self.states.verify(platform, state).await?;

        let outcome = self.exchange.exchange(platform, code).await?;

        self.repository.upsert(&outcome.primary).await?;
        tracing::info!(
            platform = %platform,
            account = %outcome.primary.provider_metadata.account_label(),
            "connection established"
        );

        if let Some(derived) = &outcome.derived {
            // The primary record is already stored; a failed derived write is logged only.
            match self.repository.upsert(derived).await {
                Ok(()) => tracing::info!(
                    key = %derived.key(),
                    account = %derived.provider_metadata.account_label(),
                    "derived connection stored"
                ),
                Err(e) => tracing::error!(key = %derived.key(), "derived connection not stored: {}", e),
            }
        }

        Ok(outcome.primary)
    }

    pub async fn check_connections(
        &self,
    ) -> Result<BTreeMap<ConnectionKey, ConnectionStatus>, AppError> {
        self.check_connections_at(Utc::now()).await
    }

    pub async fn check_connections_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<ConnectionKey, ConnectionStatus>, AppError> {
        let records = self.repository.list_all().await?;
        Ok(status::evaluate_all(&records, &self.config.secrets(), now))
    }

    pub async fn disconnect(&self, platform: Option<&str>) -> Result<Vec<ConnectionKey>, AppError> {
        self.disconnects.disconnect(platform).await
    }

    /// Renew the channel platform's access token and store it.
    pub async fn refresh_channel(&self) -> Result<PlatformConnection, AppError> {
        let key = ConnectionKey::GoogleVideo;
        let current = self
            .repository
            .get(key)
            .await?
            .ok_or(AppError::NotConnected(key))?;

        let renewed = self.exchange.refresh_channel_token(&current).await?;
        self.repository.upsert(&renewed).await?;
        tracing::info!(key = %key, expires_at = ?renewed.expires_at, "channel token refreshed");
        Ok(renewed)
    }

    /// Stored records without credentials.
    pub async fn list_connections(&self) -> Result<Vec<ConnectionSummary>, AppError> {
        Ok(self
            .repository
            .list_all()
            .await?
            .iter()
            .map(PlatformConnection::summary)
            .collect())
    }
}
