//! Anti-forgery (`state`) tokens.
//!
//! One live token per platform, stored under `oauth_state:<platform>`. Issuing
//! overwrites any unconsumed token for the same platform. Verification consumes
//! the stored token with an atomic take before comparing, so a token can be
//! checked at most once no matter how many callbacks race.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::errors::{AppError, StateError};
use crate::models::{AntiForgeryToken, Platform};
use crate::store::KeyValueStore;

pub const STATE_KEY_PREFIX: &str = "oauth_state:";

/// Verification window measured from issuance.
pub const STATE_TTL_SECONDS: i64 = 600;

/// Backend expiry is a little longer than the verification window so that
/// late callbacks are reported as expired rather than missing.
const STORAGE_TTL: std::time::Duration = std::time::Duration::from_secs(15 * 60);

#[derive(Clone)]
pub struct StateTokenStore {
    store: Arc<dyn KeyValueStore>,
}

fn state_key(platform: Platform) -> String {
    format!("{}{}", STATE_KEY_PREFIX, platform.as_str())
}

/// 32 bytes from the OS CSPRNG, hex encoded.
fn random_value() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl StateTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn issue(&self, platform: Platform) -> Result<AntiForgeryToken, AppError> {
        self.issue_at(platform, Utc::now()).await
    }

    pub async fn issue_at(
        &self,
        platform: Platform,
        now: DateTime<Utc>,
    ) -> Result<AntiForgeryToken, AppError> {
        let token = AntiForgeryToken {
            platform,
            value: random_value(),
            issued_at: now,
        };
        let value = serde_json::to_value(&token).map_err(|e| AppError::persistence(e.into()))?;
        self.store
            .put(&state_key(platform), value, Some(STORAGE_TTL))
            .await
            .map_err(AppError::persistence)?;
        tracing::debug!(platform = %platform, "issued state token");
        Ok(token)
    }

    pub async fn verify(&self, platform: Platform, supplied: &str) -> Result<(), AppError> {
        self.verify_at(platform, supplied, Utc::now()).await
    }

    /// Any attempt consumes the stored token, successful or not.
    pub async fn verify_at(
        &self,
        platform: Platform,
        supplied: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let stored = self
            .store
            .take(&state_key(platform))
            .await
            .map_err(AppError::persistence)?
            .ok_or(StateError::Missing)?;

        let token: AntiForgeryToken =
            serde_json::from_value(stored).map_err(|e| AppError::persistence(e.into()))?;

        if !bool::from(token.value.as_bytes().ct_eq(supplied.as_bytes())) {
            tracing::warn!(platform = %platform, "state token mismatch");
            return Err(StateError::Mismatch.into());
        }

        if now - token.issued_at > Duration::seconds(STATE_TTL_SECONDS) {
            tracing::warn!(platform = %platform, issued_at = %token.issued_at, "state token expired");
            return Err(StateError::Expired.into());
        }

        Ok(())
    }
}
