use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{expires_at, ExchangeOutcome, TokenExchangeClient};
use crate::errors::{AppError, ExchangeStep, MissingResource};
use crate::models::{Platform, PlatformConnection, ProviderMetadata, TokenVariant};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct ChannelList {
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Deserialize)]
struct Channel {
    id: String,
    snippet: ChannelSnippet,
}

#[derive(Deserialize)]
struct ChannelSnippet {
    title: String,
}

impl TokenExchangeClient {
    pub(super) async fn exchange_google(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ExchangeOutcome, AppError> {
        let platform = Platform::GoogleVideo;
        let (client_id, client_secret) = self.credentials(platform)?;
        let redirect_uri = self.config.redirect_uri(platform);

        let token: TokenResponse = self
            .send_json(
                platform,
                ExchangeStep::CodeExchange,
                self.http.post(&self.config.endpoints.google_token_url).form(&[
                    ("code", code),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("grant_type", "authorization_code"),
                ]),
            )
            .await?;

        // A connection that cannot renew itself is not a connection.
        let refresh_token = token
            .refresh_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                tracing::warn!("google token response carried no refresh token");
                AppError::RefreshTokenMissing
            })?;

        let channels: ChannelList = self
            .send_json(
                platform,
                ExchangeStep::ChannelLookup,
                self.http
                    .get(format!(
                        "{}/youtube/v3/channels",
                        self.config.endpoints.google_api_url.trim_end_matches('/')
                    ))
                    .query(&[("part", "snippet"), ("mine", "true")])
                    .bearer_auth(&token.access_token),
            )
            .await?;

        let channel = channels
            .items
            .into_iter()
            .next()
            .ok_or(MissingResource::NoChannelFound)?;

        let primary = PlatformConnection {
            access_token: token.access_token,
            refresh_token: Some(refresh_token),
            expires_at: expires_at(now, token.expires_in),
            token_variant: TokenVariant::RefreshBacked,
            provider_metadata: ProviderMetadata::GoogleVideo {
                channel_id: channel.id,
                channel_name: channel.snippet.title,
            },
            connected_at: now,
        };

        Ok(ExchangeOutcome {
            primary,
            derived: None,
        })
    }

    /// Renew the channel access token from its stored refresh token. The
    /// original refresh token is kept when the provider does not rotate it.
    pub async fn refresh_channel_token(
        &self,
        connection: &PlatformConnection,
    ) -> Result<PlatformConnection, AppError> {
        self.refresh_channel_token_at(connection, Utc::now()).await
    }

    pub async fn refresh_channel_token_at(
        &self,
        connection: &PlatformConnection,
        now: DateTime<Utc>,
    ) -> Result<PlatformConnection, AppError> {
        let platform = Platform::GoogleVideo;
        let current_refresh = connection
            .refresh_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(AppError::RefreshTokenMissing)?;
        let (client_id, client_secret) = self.credentials(platform)?;

        let token: TokenResponse = self
            .send_json(
                platform,
                ExchangeStep::TokenRefresh,
                self.http.post(&self.config.endpoints.google_token_url).form(&[
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("refresh_token", current_refresh),
                    ("grant_type", "refresh_token"),
                ]),
            )
            .await?;

        let refresh_token = token
            .refresh_token
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| current_refresh.to_string());

        Ok(PlatformConnection {
            access_token: token.access_token,
            refresh_token: Some(refresh_token),
            expires_at: expires_at(now, token.expires_in),
            ..connection.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock_client;
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_channel(server: &MockServer, items: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/youtube/v3/channels"))
            .and(query_param("part", "snippet"))
            .and(query_param("mine", "true"))
            .and(header("authorization", "Bearer ya29.access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_exchange_writes_refresh_backed_connection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.access",
                "expires_in": 3599,
                "refresh_token": "1//refresh",
                "scope": "https://www.googleapis.com/auth/youtube.upload",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_channel(
            &server,
            json!([{ "id": "UC123", "snippet": { "title": "Launch Channel" } }]),
        )
        .await;

        let now = Utc::now();
        let outcome = mock_client(&server.uri())
            .exchange_at(Platform::GoogleVideo, "auth-code", now)
            .await
            .unwrap();

        let conn = outcome.primary;
        assert_eq!(conn.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(conn.token_variant, TokenVariant::RefreshBacked);
        assert_eq!(conn.expires_at, Some(now + chrono::Duration::seconds(3599)));
        assert_eq!(conn.provider_metadata.account_label(), "Launch Channel");
        assert!(outcome.derived.is_none());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_is_hard_stop() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.access",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;
        // Never reached.
        Mock::given(method("GET"))
            .and(path("/youtube/v3/channels"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = mock_client(&server.uri())
            .exchange(Platform::GoogleVideo, "auth-code")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RefreshTokenMissing));
    }

    #[tokio::test]
    async fn test_no_channel_is_missing_resource() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.access",
                "expires_in": 3599,
                "refresh_token": "1//refresh"
            })))
            .mount(&server)
            .await;
        mount_channel(&server, json!([])).await;

        let err = mock_client(&server.uri())
            .exchange(Platform::GoogleVideo, "auth-code")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::MissingResource(MissingResource::NoChannelFound)
        ));
    }

    #[tokio::test]
    async fn test_invalid_grant_surfaces_description() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Malformed auth code."
            })))
            .mount(&server)
            .await;

        let err = mock_client(&server.uri())
            .exchange(Platform::GoogleVideo, "bad")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "google_video code exchange failed: invalid_grant: Malformed auth code."
        );
    }

    fn stored(refresh: Option<&str>) -> PlatformConnection {
        PlatformConnection {
            access_token: "ya29.old".into(),
            refresh_token: refresh.map(String::from),
            expires_at: Some(Utc::now()),
            token_variant: TokenVariant::RefreshBacked,
            provider_metadata: ProviderMetadata::GoogleVideo {
                channel_id: "UC123".into(),
                channel_name: "Launch Channel".into(),
            },
            connected_at: Utc::now() - chrono::Duration::days(3),
        }
    }

    #[tokio::test]
    async fn test_refresh_keeps_original_refresh_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=1%2F%2Frefresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.new",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let old = stored(Some("1//refresh"));
        let now = Utc::now();
        let renewed = mock_client(&server.uri())
            .refresh_channel_token_at(&old, now)
            .await
            .unwrap();

        assert_eq!(renewed.access_token, "ya29.new");
        assert_eq!(renewed.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(renewed.expires_at, Some(now + chrono::Duration::seconds(3599)));
        assert_eq!(renewed.connected_at, old.connected_at);
        assert_eq!(renewed.provider_metadata, old.provider_metadata);
    }

    #[tokio::test]
    async fn test_refresh_without_stored_token_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = mock_client(&server.uri())
            .refresh_channel_token(&stored(None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RefreshTokenMissing));
    }
}
