use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::errors::{AppError, StateError};
use crate::identity::require_admin;
use crate::models::Platform;
use crate::AppState;

/// Parameters of the social-auth endpoint. Read from the query string; a
/// POST may carry `action` and `platform` in a JSON body instead.
#[derive(Debug, Default, Deserialize)]
pub struct SocialAuthParams {
    pub action: Option<String>,
    pub platform: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl SocialAuthParams {
    /// Query values win over body values.
    fn merge(self, body: SocialAuthParams) -> Self {
        Self {
            action: self.action.or(body.action),
            platform: self.platform.or(body.platform),
            code: self.code.or(body.code),
            state: self.state.or(body.state),
            error: self.error.or(body.error),
            error_description: self.error_description.or(body.error_description),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_platform(raw: Option<&str>) -> Result<Platform, AppError> {
    let raw = non_empty(raw).ok_or(AppError::MissingPlatform)?;
    raw.parse()
        .map_err(|_| AppError::UnknownPlatform(raw.to_string()))
}

// ── Dispatcher ───────────────────────────────────────────────

/// GET|POST /api/v1/social-auth?action=…
pub async fn social_auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SocialAuthParams>,
    body: Bytes,
) -> Response {
    let body_params = if body.is_empty() {
        SocialAuthParams::default()
    } else {
        match serde_json::from_slice::<SocialAuthParams>(&body) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("ignoring unparseable social-auth body: {}", e);
                SocialAuthParams::default()
            }
        }
    };
    let params = query.merge(body_params);

    // Providers redirect the browser here directly; no admin credential.
    if non_empty(params.action.as_deref()) == Some("callback") {
        return callback(&state, &params).await;
    }

    match admin_action(&state, &headers, &params).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

async fn admin_action(
    state: &AppState,
    headers: &HeaderMap,
    params: &SocialAuthParams,
) -> Result<Response, AppError> {
    let identity = state.auth.authenticate(headers)?;
    require_admin(&identity)?;

    let action = non_empty(params.action.as_deref()).unwrap_or_default();
    match action {
        "get-auth-url" => {
            let platform = parse_platform(params.platform.as_deref())?;
            let auth_url = state.service.auth_url(platform).await?;
            tracing::info!(platform = %platform, user_id = %identity.user_id, "authorization url issued");
            Ok(Json(json!({ "authUrl": auth_url })).into_response())
        }
        "check-connections" => {
            let connections = state.service.check_connections().await?;
            Ok(Json(json!({ "connections": connections })).into_response())
        }
        "disconnect" => {
            let cleared = state.service.disconnect(params.platform.as_deref()).await?;
            let names: Vec<&str> = cleared.iter().map(|k| k.as_str()).collect();
            Ok(Json(json!({
                "message": format!("{} disconnected", names.join(", ")),
                "disconnected": names,
            }))
            .into_response())
        }
        other => Err(AppError::UnknownAction(other.to_string())),
    }
}

// ── Callback ─────────────────────────────────────────────────

async fn callback(state: &AppState, params: &SocialAuthParams) -> Response {
    let outcome = complete_callback(state, params).await;
    if let Err(e) = &outcome {
        tracing::warn!(platform = ?params.platform, "connection callback failed: {}", e);
    }
    Redirect::to(&callback_redirect(&state.config.return_url, &outcome)).into_response()
}

async fn complete_callback(state: &AppState, params: &SocialAuthParams) -> Result<Platform, AppError> {
    let platform = parse_platform(params.platform.as_deref())?;

    // Consent denied at the provider: leave the state token for a retry.
    if let Some(error) = non_empty(params.error.as_deref()) {
        let reason = non_empty(params.error_description.as_deref()).unwrap_or(error);
        return Err(AppError::AuthorizationDenied(reason.to_string()));
    }

    let state_value = non_empty(params.state.as_deref()).ok_or(StateError::Missing)?;
    let code = non_empty(params.code.as_deref()).ok_or(AppError::MissingParameter("code"))?;

    state
        .service
        .handle_callback(platform, code, state_value)
        .await?;
    Ok(platform)
}

/// Browser target after a callback.
pub fn callback_redirect(return_url: &str, outcome: &Result<Platform, AppError>) -> String {
    let sep = if return_url.contains('?') { '&' } else { '?' };
    match outcome {
        Ok(platform) => format!(
            "{}{}connected={}&status=success",
            return_url,
            sep,
            platform.as_str()
        ),
        Err(e) => format!(
            "{}{}status=error&message={}",
            return_url,
            sep,
            urlencoding::encode(&e.user_message())
        ),
    }
}
