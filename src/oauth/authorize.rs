use std::sync::Arc;
use url::Url;

use crate::config::Config;
use crate::errors::{AppError, ConfigurationError};
use crate::models::Platform;

use super::state::StateTokenStore;

/// Graph API version used for the dialog and every Graph call.
pub const META_GRAPH_VERSION: &str = "v19.0";

const META_SCOPES: &[&str] = &[
    "pages_show_list",
    "pages_read_engagement",
    "pages_manage_posts",
    "instagram_basic",
    "instagram_content_publish",
    "business_management",
];

const GOOGLE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube.readonly",
];

const LINKEDIN_SCOPES: &[&str] = &[
    "openid",
    "profile",
    "email",
    "w_member_social",
    "r_organization_social",
    "w_organization_social",
    "rw_organization_admin",
];

pub fn scopes(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Meta => META_SCOPES,
        Platform::GoogleVideo => GOOGLE_SCOPES,
        Platform::ProfessionalNetwork => LINKEDIN_SCOPES,
    }
}

/// Builds provider consent URLs. Every call mints a fresh state token.
#[derive(Clone)]
pub struct AuthUrlBuilder {
    config: Arc<Config>,
    states: StateTokenStore,
}

impl AuthUrlBuilder {
    pub fn new(config: Arc<Config>, states: StateTokenStore) -> Self {
        Self { config, states }
    }

    pub async fn build_auth_url(&self, platform: Platform) -> Result<String, AppError> {
        let client_id = self
            .config
            .providers
            .for_platform(platform)
            .client_id
            .clone()
            .ok_or(ConfigurationError::MissingClientId(platform))?;

        let endpoints = &self.config.endpoints;
        let authorize_url = match platform {
            Platform::Meta => format!(
                "{}/{}/dialog/oauth",
                endpoints.meta_dialog_url.trim_end_matches('/'),
                META_GRAPH_VERSION
            ),
            Platform::GoogleVideo => endpoints.google_auth_url.clone(),
            Platform::ProfessionalNetwork => format!(
                "{}/oauth/v2/authorization",
                endpoints.linkedin_oauth_url.trim_end_matches('/')
            ),
        };
        let mut url = Url::parse(&authorize_url).map_err(|e| {
            tracing::error!(platform = %platform, "invalid authorization endpoint: {}", e);
            ConfigurationError::InvalidEndpoint(platform)
        })?;

        // Graph takes a comma-separated scope list; the others are space-separated.
        let separator = match platform {
            Platform::Meta => ",",
            _ => " ",
        };
        let scope = scopes(platform).join(separator);

        let token = self.states.issue(platform).await?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri(platform))
                .append_pair("scope", &scope)
                .append_pair("state", &token.value)
                .append_pair("response_type", "code");
            if platform == Platform::GoogleVideo {
                // Without both, Google omits the refresh token on re-consent.
                query
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent");
            }
        }

        tracing::debug!(platform = %platform, "built authorization url");
        Ok(url.to_string())
    }
}
