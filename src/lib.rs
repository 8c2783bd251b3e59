//! Publink Connect: OAuth connection lifecycle for social publishing platforms.
//!
//! Library crate shared by the `publink` binary and the integration tests in `tests/`.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod errors;
pub mod identity;
pub mod jobs;
pub mod models;
pub mod oauth;
pub mod store;

use config::Config;
use identity::{AdminKeyAuthenticator, Authenticator};
use oauth::ConnectionService;
use store::KeyValueStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub config: Arc<Config>,
    pub service: ConnectionService,
    /// Connection store; pinged by the readiness probe.
    pub store: Arc<dyn KeyValueStore>,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    /// `states` may be the same backend as `connections`.
    pub fn new(
        config: Config,
        connections: Arc<dyn KeyValueStore>,
        states: Arc<dyn KeyValueStore>,
    ) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let auth: Arc<dyn Authenticator> =
            Arc::new(AdminKeyAuthenticator::new(config.admin_key.clone()));
        let service = ConnectionService::new(config.clone(), connections.clone(), states)?;
        Ok(Self {
            config,
            service,
            store: connections,
            auth,
        })
    }

    /// Replace the caller-identity collaborator.
    pub fn with_authenticator(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = auth;
        self
    }
}
