use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::{ConnectionKey, Platform};

/// Anti-forgery verification failures. Distinct internally, one message to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no state token on file")]
    Missing,
    #[error("state token does not match")]
    Mismatch,
    #[error("state token expired")]
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{0} client id is not configured")]
    MissingClientId(Platform),
    #[error("{0} client secret is not configured")]
    MissingClientSecret(Platform),
    #[error("{0} authorization endpoint is not a valid URL")]
    InvalidEndpoint(Platform),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingResource {
    #[error("no manageable pages found for this account")]
    NoPageFound,
    #[error("no channel found for this account")]
    NoChannelFound,
    #[error("no profile returned for this account")]
    NoProfileFound,
}

/// Step of a provider exchange, carried in `ProviderExchange` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStep {
    CodeExchange,
    LongLivedToken,
    PageLookup,
    ChannelLookup,
    ProfileLookup,
    LinkedAccountLookup,
    OrganizationLookup,
    TokenRefresh,
}

impl std::fmt::Display for ExchangeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ExchangeStep::CodeExchange => "code exchange",
            ExchangeStep::LongLivedToken => "long-lived token exchange",
            ExchangeStep::PageLookup => "page lookup",
            ExchangeStep::ChannelLookup => "channel lookup",
            ExchangeStep::ProfileLookup => "profile lookup",
            ExchangeStep::LinkedAccountLookup => "linked account lookup",
            ExchangeStep::OrganizationLookup => "organization lookup",
            ExchangeStep::TokenRefresh => "token refresh",
        })
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("administrator access required")]
    Forbidden,

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("state verification failed: {0}")]
    State(#[from] StateError),

    #[error("{platform} {step} failed: {message}")]
    ProviderExchange {
        platform: Platform,
        step: ExchangeStep,
        message: String,
    },

    #[error("no refresh token was issued; remove the app's access in your Google account and connect again")]
    RefreshTokenMissing,

    #[error("{0}")]
    MissingResource(#[from] MissingResource),

    #[error("platform parameter is required")]
    MissingPlatform,

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("{0} is not connected")]
    NotConnected(ConnectionKey),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("authorization was not granted: {0}")]
    AuthorizationDenied(String),

    #[error("persistence error: {0}")]
    Persistence(anyhow::Error),
}

impl AppError {
    pub fn provider(platform: Platform, step: ExchangeStep, message: impl Into<String>) -> Self {
        AppError::ProviderExchange {
            platform,
            step,
            message: message.into(),
        }
    }

    pub fn persistence(err: anyhow::Error) -> Self {
        AppError::Persistence(err)
    }

    /// Text shown to a browser returning from a provider.
    pub fn user_message(&self) -> String {
        match self {
            AppError::State(_) => "Your session expired. Please start the connection again.".to_string(),
            AppError::Persistence(_) => "Could not save the connection. Please try again.".to_string(),
            other => other.to_string(),
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "unauthenticated",
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "permission_error", "forbidden"),
            AppError::Configuration(_) => (
                StatusCode::FORBIDDEN,
                "configuration_error",
                "provider_not_configured",
            ),
            AppError::State(StateError::Missing) => {
                (StatusCode::BAD_REQUEST, "state_error", "state_missing")
            }
            AppError::State(StateError::Mismatch) => {
                (StatusCode::BAD_REQUEST, "state_error", "state_mismatch")
            }
            AppError::State(StateError::Expired) => {
                (StatusCode::BAD_REQUEST, "state_error", "state_expired")
            }
            AppError::MissingPlatform => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "missing_platform",
            ),
            AppError::UnknownPlatform(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "unknown_platform",
            ),
            AppError::UnknownAction(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "unknown_action",
            ),
            AppError::MissingParameter(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "missing_parameter",
            ),
            AppError::AuthorizationDenied(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "authorization_denied",
            ),
            AppError::NotConnected(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "not_connected",
            ),
            AppError::ProviderExchange { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "provider_error",
                "provider_exchange_failed",
            ),
            AppError::RefreshTokenMissing => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "provider_error",
                "refresh_token_missing",
            ),
            AppError::MissingResource(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "provider_error",
                "missing_resource",
            ),
            AppError::Persistence(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal_server_error",
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = self.parts();

        let msg = match &self {
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
