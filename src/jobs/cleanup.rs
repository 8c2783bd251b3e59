//! Background job: sweep abandoned anti-forgery tokens.
//!
//! Runs hourly. A state token is consumed on callback; one that never comes
//! back (user closed the consent tab) would otherwise sit in the settings
//! table forever. Redis-held tokens expire on their own and need no sweep.

use chrono::Utc;
use std::time::Duration;
use tokio::time;

use crate::oauth::state::STATE_KEY_PREFIX;
use crate::store::PgStore;

/// Tokens older than this are removed; well past the verification window.
pub const STALE_STATE_AGE: Duration = Duration::from_secs(3600);

/// Spawn the background cleanup task. Call this once at startup.
pub fn spawn(store: PgStore) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(3600)); // every hour
        loop {
            interval.tick().await;
            if let Err(e) = sweep_stale_state(&store).await {
                tracing::error!("cleanup job failed: {}", e);
            }
        }
    });
}

/// Delete `oauth_state:` rows last written more than an hour ago.
pub async fn sweep_stale_state(store: &PgStore) -> anyhow::Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::from_std(STALE_STATE_AGE)?;
    let removed = store.purge_stale(STATE_KEY_PREFIX, cutoff).await?;

    if removed > 0 {
        tracing::info!(rows = removed, "removed stale state tokens");
    }
    Ok(removed)
}
