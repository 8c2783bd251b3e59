use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::platform::Platform;

/// Single-use CSRF token embedded in an authorization request.
#[derive(Clone, Serialize, Deserialize)]
pub struct AntiForgeryToken {
    pub platform: Platform,
    pub value: String,
    pub issued_at: DateTime<Utc>,
}

impl std::fmt::Debug for AntiForgeryToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AntiForgeryToken")
            .field("platform", &self.platform)
            .field("value", &"[redacted]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}
