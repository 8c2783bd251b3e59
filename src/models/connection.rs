use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::platform::ConnectionKey;

/// Shape of the stored credential. Drives status evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenVariant {
    /// Page-level token derived from a long-lived user token. Never expires.
    NeverExpiringPage,
    /// Short-lived access token renewable through a refresh token.
    RefreshBacked,
    /// Opaque access token with a long provider-stated lifetime.
    LongLivedOpaque,
}

/// Photo-sharing business account linked to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedPhotoAccount {
    pub id: String,
    pub username: String,
}

/// An organization the connected member administers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub urn: String,
    pub id: String,
}

/// Provider-specific identifiers, one strict schema per record key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum ProviderMetadata {
    Meta {
        page_id: String,
        page_name: String,
        linked_photo_account: Option<LinkedPhotoAccount>,
    },
    MetaPhoto {
        account_id: String,
        username: String,
        page_id: String,
    },
    GoogleVideo {
        channel_id: String,
        channel_name: String,
    },
    ProfessionalNetwork {
        profile_id: String,
        name: String,
        email: Option<String>,
        #[serde(default)]
        organizations: Vec<Organization>,
    },
}

impl ProviderMetadata {
    pub fn key(&self) -> ConnectionKey {
        match self {
            ProviderMetadata::Meta { .. } => ConnectionKey::Meta,
            ProviderMetadata::MetaPhoto { .. } => ConnectionKey::MetaPhoto,
            ProviderMetadata::GoogleVideo { .. } => ConnectionKey::GoogleVideo,
            ProviderMetadata::ProfessionalNetwork { .. } => ConnectionKey::ProfessionalNetwork,
        }
    }

    /// Human-readable account name shown next to the status.
    pub fn account_label(&self) -> String {
        match self {
            ProviderMetadata::Meta { page_name, .. } => page_name.clone(),
            ProviderMetadata::MetaPhoto { username, .. } => format!("@{}", username),
            ProviderMetadata::GoogleVideo { channel_name, .. } => channel_name.clone(),
            ProviderMetadata::ProfessionalNetwork { name, .. } => name.clone(),
        }
    }
}

/// The delegated credential currently on file for one record key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConnection {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// `None` means the credential does not expire.
    pub expires_at: Option<DateTime<Utc>>,
    pub token_variant: TokenVariant,
    pub provider_metadata: ProviderMetadata,
    pub connected_at: DateTime<Utc>,
}

impl PlatformConnection {
    pub fn key(&self) -> ConnectionKey {
        self.provider_metadata.key()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    /// Credential-free view for listings.
    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            key: self.key(),
            account: self.provider_metadata.account_label(),
            token_variant: self.token_variant,
            has_refresh_token: self.has_refresh_token(),
            expires_at: self.expires_at,
            connected_at: self.connected_at,
            provider_metadata: self.provider_metadata.clone(),
        }
    }
}

// Tokens stay out of logs and panic messages.
impl fmt::Debug for PlatformConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConnection")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("expires_at", &self.expires_at)
            .field("token_variant", &self.token_variant)
            .field("provider_metadata", &self.provider_metadata)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub key: ConnectionKey,
    pub account: String,
    pub token_variant: TokenVariant,
    pub has_refresh_token: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub connected_at: DateTime<Utc>,
    pub provider_metadata: ProviderMetadata,
}
