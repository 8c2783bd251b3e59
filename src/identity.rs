//! Caller identity.
//!
//! The connection flow only needs two facts about the caller: who they are and
//! whether they may administer connections. Authentication itself belongs to a
//! collaborator; `AdminKeyAuthenticator` is the built-in one.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
    pub is_admin: bool,
}

pub trait Authenticator: Send + Sync {
    /// Resolve the caller from request headers. `Unauthenticated` when no valid credential.
    fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity, AppError>;
}

/// Accepts the configured admin key via `X-Admin-Key` or `Authorization: Bearer`.
pub struct AdminKeyAuthenticator {
    admin_key: Option<String>,
}

impl AdminKeyAuthenticator {
    /// With no key configured every request is rejected.
    pub fn new(admin_key: Option<String>) -> Self {
        Self {
            admin_key: admin_key.filter(|k| !k.is_empty()),
        }
    }
}

fn provided_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| t.trim())
        })
}

// Never log the expected key or the full provided key.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    } else {
        "****".to_string()
    }
}

impl Authenticator for AdminKeyAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
        let Some(expected) = self.admin_key.as_deref() else {
            tracing::warn!("admin API: no admin key configured, rejecting request");
            return Err(AppError::Unauthenticated);
        };

        match provided_key(headers) {
            Some(k) if bool::from(k.as_bytes().ct_eq(expected.as_bytes())) => Ok(CallerIdentity {
                user_id: "admin".to_string(),
                is_admin: true,
            }),
            Some(k) => {
                tracing::warn!("admin API: invalid key (provided: '{}')", mask(k));
                Err(AppError::Unauthenticated)
            }
            None => {
                tracing::warn!("admin API: missing X-Admin-Key header");
                Err(AppError::Unauthenticated)
            }
        }
    }
}

pub fn require_admin(identity: &CallerIdentity) -> Result<(), AppError> {
    if identity.is_admin {
        Ok(())
    } else {
        tracing::warn!(user_id = %identity.user_id, "admin API: caller is not an administrator");
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(name, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn test_accepts_admin_header_and_bearer() {
        let auth = AdminKeyAuthenticator::new(Some("secret-admin-key".into()));
        let id = auth
            .authenticate(&headers("x-admin-key", "secret-admin-key"))
            .unwrap();
        assert!(id.is_admin);
        assert!(auth
            .authenticate(&headers("authorization", "Bearer secret-admin-key"))
            .is_ok());
    }

    #[test]
    fn test_rejects_wrong_or_missing_key() {
        let auth = AdminKeyAuthenticator::new(Some("secret-admin-key".into()));
        assert!(matches!(
            auth.authenticate(&headers("x-admin-key", "nope")),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            auth.authenticate(&HeaderMap::new()),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn test_unconfigured_key_rejects_everything() {
        let auth = AdminKeyAuthenticator::new(Some(String::new()));
        assert!(auth.authenticate(&headers("x-admin-key", "")).is_err());
    }

    #[test]
    fn test_require_admin() {
        let member = CallerIdentity {
            user_id: "u1".into(),
            is_admin: false,
        };
        assert!(matches!(require_admin(&member), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_mask_hides_middle() {
        assert_eq!(mask("short"), "****");
        assert_eq!(mask("abcd-1234-wxyz"), "abcd…wxyz");
    }
}
