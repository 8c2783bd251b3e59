//! Connection status, derived from stored records and configuration facts.
//!
//! Pure functions: callers pass in `now`, the records and the secret
//! presence flags. Nothing here touches storage or the network.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::ProviderSecrets;
use crate::models::{ConnectionKey, Platform, PlatformConnection};

/// OIDC tokens closer than this to expiry get a reconnect reminder.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No client secret for the provider.
    NotConfigured,
    /// Configured, nothing stored.
    ReadyToConnect,
    Connected,
    /// A record exists but cannot be used: expired or not renewable.
    NeedsReconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub status: ConnectionState,
    pub connected: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_days: Option<i64>,
    pub expiring_soon: bool,
}

impl ConnectionStatus {
    fn bare(status: ConnectionState, message: String) -> Self {
        Self {
            status,
            connected: status == ConnectionState::Connected,
            message,
            account: None,
            connected_at: None,
            expires_at: None,
            expires_in_days: None,
            expiring_soon: false,
        }
    }
}

/// Status for a single record key.
pub fn evaluate(
    key: ConnectionKey,
    record: Option<&PlatformConnection>,
    secrets: &ProviderSecrets,
    now: DateTime<Utc>,
) -> ConnectionStatus {
    let platform = key.platform();
    let name = match key {
        ConnectionKey::MetaPhoto => "Instagram",
        _ => platform.display_name(),
    };

    if !secrets.has_client_secret(platform) {
        return ConnectionStatus::bare(
            ConnectionState::NotConfigured,
            format!("{} app credentials are not configured", platform.display_name()),
        );
    }

    let Some(record) = record else {
        return ConnectionStatus::bare(
            ConnectionState::ReadyToConnect,
            format!("{} is not connected", name),
        );
    };

    let account = record.provider_metadata.account_label();
    let mut status = ConnectionStatus {
        account: Some(account.clone()),
        connected_at: Some(record.connected_at),
        expires_at: record.expires_at,
        ..ConnectionStatus::bare(ConnectionState::Connected, format!("Connected as {}", account))
    };

    match platform {
        // Page tokens never expire.
        Platform::Meta => {}

        Platform::GoogleVideo => {
            if !record.has_refresh_token() {
                status.status = ConnectionState::NeedsReconnect;
                status.message = format!(
                    "{} connection cannot renew itself. Reconnect to restore publishing.",
                    name
                );
            }
        }

        Platform::ProfessionalNetwork => {
            if let Some(expires_at) = record.expires_at {
                if now >= expires_at {
                    status.status = ConnectionState::NeedsReconnect;
                    status.message = format!(
                        "{} access expired on {}. Reconnect to continue publishing.",
                        name,
                        expires_at.format("%Y-%m-%d")
                    );
                } else {
                    let days = (expires_at - now).num_days();
                    status.expires_in_days = Some(days);
                    if days <= EXPIRY_WARNING_DAYS {
                        status.expiring_soon = true;
                        let remaining = match days {
                            0 => "today".to_string(),
                            1 => "in 1 day".to_string(),
                            n => format!("in {} days", n),
                        };
                        status.message = format!(
                            "Connected as {}. Access expires {}; reconnect soon.",
                            account, remaining
                        );
                    }
                }
            }
        }
    }

    status.connected = status.status == ConnectionState::Connected;
    status
}

/// Status for every known key, whether or not a record exists.
pub fn evaluate_all(
    connections: &[PlatformConnection],
    secrets: &ProviderSecrets,
    now: DateTime<Utc>,
) -> BTreeMap<ConnectionKey, ConnectionStatus> {
    ConnectionKey::ALL
        .iter()
        .map(|key| {
            let record = connections.iter().find(|c| c.key() == *key);
            (*key, evaluate(*key, record, secrets, now))
        })
        .collect()
}
