//! Authorization-code exchange for each provider.
//!
//! Each protocol is a short sequential chain of outbound calls. A failing
//! required step aborts the whole exchange with a `ProviderExchange` error
//! carrying the upstream text; optional steps are logged and dropped where
//! they are called. Nothing here writes to storage: the caller persists the
//! returned `ExchangeOutcome` only once the chain has completed.

mod google;
mod linkedin;
mod meta;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::errors::{AppError, ConfigurationError, ExchangeStep};
use crate::models::{Platform, PlatformConnection};

/// Result of a completed exchange.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub primary: PlatformConnection,
    /// Present only when the primary account exposes a linked sub-account.
    pub derived: Option<PlatformConnection>,
}

#[derive(Clone)]
pub struct TokenExchangeClient {
    http: reqwest::Client,
    config: Arc<Config>,
}

impl TokenExchangeClient {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("Publink-Connect/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub async fn exchange(&self, platform: Platform, code: &str) -> Result<ExchangeOutcome, AppError> {
        self.exchange_at(platform, code, Utc::now()).await
    }

    /// `now` stamps `connected_at` and anchors relative expiries.
    pub async fn exchange_at(
        &self,
        platform: Platform,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ExchangeOutcome, AppError> {
        match platform {
            Platform::Meta => self.exchange_meta(code, now).await,
            Platform::GoogleVideo => self.exchange_google(code, now).await,
            Platform::ProfessionalNetwork => self.exchange_linkedin(code, now).await,
        }
    }

    /// Client id and secret for `platform`, both required for a code exchange.
    fn credentials(&self, platform: Platform) -> Result<(&str, &str), AppError> {
        let creds = self.config.providers.for_platform(platform);
        let id = creds
            .client_id
            .as_deref()
            .ok_or(ConfigurationError::MissingClientId(platform))?;
        let secret = creds
            .client_secret
            .as_deref()
            .ok_or(ConfigurationError::MissingClientSecret(platform))?;
        Ok((id, secret))
    }

    /// Send a request and decode a JSON body, mapping every failure to a
    /// provider-qualified error.
    async fn send_json<T: DeserializeOwned>(
        &self,
        platform: Platform,
        step: ExchangeStep,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        tracing::debug!(platform = %platform, step = %step, "provider call");

        // `without_url`: Graph calls carry the client secret in the query string.
        let response = request
            .send()
            .await
            .map_err(|e| AppError::provider(platform, step, e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::provider(platform, step, e.without_url().to_string()))?;

        if !status.is_success() {
            let message = upstream_error_message(&body)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::warn!(platform = %platform, step = %step, status = %status, "provider call failed");
            return Err(AppError::provider(platform, step, message));
        }

        serde_json::from_str(&body).map_err(|e| {
            AppError::provider(platform, step, format!("unexpected response: {}", e))
        })
    }
}

/// Error payload shapes returned by the providers:
/// Graph `{"error":{"message"}}`, OAuth `{"error","error_description"}`,
/// REST `{"message"}`.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<serde_json::Value>,
    error_description: Option<String>,
    message: Option<String>,
}

fn upstream_error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.error {
        Some(serde_json::Value::Object(obj)) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from),
        Some(serde_json::Value::String(code)) => Some(match parsed.error_description {
            Some(desc) => format!("{}: {}", code, desc),
            None => code,
        }),
        _ => parsed.message,
    }
}

fn expires_at(now: DateTime<Utc>, expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| now + chrono::Duration::seconds(secs))
}

/// Client with every provider configured and pointed at `base`.
#[cfg(test)]
fn mock_client(base: &str) -> TokenExchangeClient {
    use crate::config::{ClientCredentials, ProviderEndpoints};

    let mut config = Config::for_tests();
    config.endpoints = ProviderEndpoints::all_at(base);
    config.providers.meta = ClientCredentials::new(Some("meta-app".into()), Some("meta-secret".into()));
    config.providers.google = ClientCredentials::new(Some("g-client".into()), Some("g-secret".into()));
    config.providers.linkedin = ClientCredentials::new(Some("li-client".into()), Some("li-secret".into()));
    TokenExchangeClient::new(Arc::new(config)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_secret_is_configuration_error() {
        let mut config = Config::for_tests();
        config.providers.google =
            crate::config::ClientCredentials::new(Some("g-client".into()), None);
        let client = TokenExchangeClient::new(Arc::new(config)).unwrap();
        let err = client
            .exchange(Platform::GoogleVideo, "code")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Configuration(ConfigurationError::MissingClientSecret(Platform::GoogleVideo))
        ));
    }

    #[test]
    fn test_upstream_error_shapes() {
        assert_eq!(
            upstream_error_message(r#"{"error":{"message":"Invalid verification code format.","type":"OAuthException"}}"#)
                .as_deref(),
            Some("Invalid verification code format.")
        );
        assert_eq!(
            upstream_error_message(r#"{"error":"invalid_grant","error_description":"Bad Request"}"#)
                .as_deref(),
            Some("invalid_grant: Bad Request")
        );
        assert_eq!(
            upstream_error_message(r#"{"message":"Not enough permissions","status":403}"#).as_deref(),
            Some("Not enough permissions")
        );
        assert_eq!(upstream_error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_expires_at_ignores_missing_or_nonpositive() {
        let now = Utc::now();
        assert_eq!(expires_at(now, None), None);
        assert_eq!(expires_at(now, Some(0)), None);
        assert_eq!(
            expires_at(now, Some(3600)),
            Some(now + chrono::Duration::seconds(3600))
        );
    }
}
