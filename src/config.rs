use crate::models::Platform;

/// One provider's OAuth client registration. Empty values are treated as unset.
#[derive(Clone, Default)]
pub struct ClientCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl ClientCredentials {
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            client_id: client_id.filter(|s| !s.trim().is_empty()),
            client_secret: client_secret.filter(|s| !s.trim().is_empty()),
        }
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub meta: ClientCredentials,
    pub google: ClientCredentials,
    pub linkedin: ClientCredentials,
}

impl ProviderCredentials {
    pub fn for_platform(&self, platform: Platform) -> &ClientCredentials {
        match platform {
            Platform::Meta => &self.meta,
            Platform::GoogleVideo => &self.google,
            Platform::ProfessionalNetwork => &self.linkedin,
        }
    }

    pub fn secrets(&self) -> ProviderSecrets {
        ProviderSecrets {
            meta: self.meta.client_secret.is_some(),
            google_video: self.google.client_secret.is_some(),
            professional_network: self.linkedin.client_secret.is_some(),
        }
    }
}

/// Presence flags only; the evaluator never sees the secrets themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderSecrets {
    pub meta: bool,
    pub google_video: bool,
    pub professional_network: bool,
}

impl ProviderSecrets {
    pub fn has_client_secret(&self, platform: Platform) -> bool {
        match platform {
            Platform::Meta => self.meta,
            Platform::GoogleVideo => self.google_video,
            Platform::ProfessionalNetwork => self.professional_network,
        }
    }
}

/// Provider hosts. Defaults are the production endpoints; tests point these at a mock server.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    /// Host serving the Meta consent dialog.
    pub meta_dialog_url: String,
    /// Graph API host (token exchange, pages, linked accounts).
    pub meta_graph_url: String,
    /// Full Google authorization endpoint.
    pub google_auth_url: String,
    /// Full Google token endpoint.
    pub google_token_url: String,
    /// Google API host (YouTube Data API).
    pub google_api_url: String,
    /// LinkedIn host serving /oauth/v2/*.
    pub linkedin_oauth_url: String,
    /// LinkedIn REST API host.
    pub linkedin_api_url: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            meta_dialog_url: "https://www.facebook.com".into(),
            meta_graph_url: "https://graph.facebook.com".into(),
            google_auth_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            google_token_url: "https://oauth2.googleapis.com/token".into(),
            google_api_url: "https://www.googleapis.com".into(),
            linkedin_oauth_url: "https://www.linkedin.com".into(),
            linkedin_api_url: "https://api.linkedin.com".into(),
        }
    }
}

impl ProviderEndpoints {
    /// Every endpoint rooted at one base URL. Used with `wiremock::MockServer::uri()`.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            meta_dialog_url: base.to_string(),
            meta_graph_url: base.to_string(),
            google_auth_url: format!("{}/o/oauth2/v2/auth", base),
            google_token_url: format!("{}/token", base),
            google_api_url: base.to_string(),
            linkedin_oauth_url: base.to_string(),
            linkedin_api_url: base.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// When set, anti-forgery tokens are kept in Redis instead of the settings table.
    pub redis_url: Option<String>,
    pub admin_key: Option<String>,
    /// Public base URL of this service; the provider callback target hangs off it.
    pub public_url: String,
    /// Where the browser lands after a callback, success or failure.
    pub return_url: String,
    pub providers: ProviderCredentials,
    pub endpoints: ProviderEndpoints,
}

impl Config {
    /// Callback target registered with every provider.
    pub fn redirect_uri(&self, platform: Platform) -> String {
        format!(
            "{}/api/v1/social-auth?action=callback&platform={}",
            self.public_url.trim_end_matches('/'),
            platform.as_str()
        )
    }

    pub fn secrets(&self) -> ProviderSecrets {
        self.providers.secrets()
    }

    /// Configuration suitable for tests: no admin key, no providers, real endpoints.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: String::new(),
            redis_url: None,
            admin_key: None,
            public_url: "http://localhost:8080".into(),
            return_url: "http://localhost:3000/settings/connections".into(),
            providers: ProviderCredentials::default(),
            endpoints: ProviderEndpoints::default(),
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|name| std::env::var(name).ok())
}

/// Build a `Config` from an arbitrary variable source.
pub fn from_lookup<F>(var: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

    let admin_key = non_empty("PUBLINK_ADMIN_KEY");
    if admin_key.is_none() {
        let env_mode = non_empty("PUBLINK_ENV")
            .or_else(|| non_empty("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "PUBLINK_ADMIN_KEY is not set. \
                 Set an admin key before running in production."
            );
        }
        eprintln!("⚠️  PUBLINK_ADMIN_KEY is not set; admin actions will be rejected.");
    }

    let defaults = ProviderEndpoints::default();
    let endpoint = |name: &str, default: String| non_empty(name).unwrap_or(default);

    Ok(Config {
        port: non_empty("PUBLINK_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080),
        database_url: non_empty("DATABASE_URL")
            .unwrap_or_else(|| "postgres://localhost/publink".into()),
        redis_url: non_empty("REDIS_URL"),
        admin_key,
        public_url: non_empty("PUBLINK_PUBLIC_URL")
            .unwrap_or_else(|| "http://localhost:8080".into()),
        return_url: non_empty("PUBLINK_RETURN_URL")
            .unwrap_or_else(|| "http://localhost:3000/settings/connections".into()),
        providers: ProviderCredentials {
            meta: ClientCredentials::new(var("META_APP_ID"), var("META_APP_SECRET")),
            google: ClientCredentials::new(var("GOOGLE_CLIENT_ID"), var("GOOGLE_CLIENT_SECRET")),
            linkedin: ClientCredentials::new(
                var("LINKEDIN_CLIENT_ID"),
                var("LINKEDIN_CLIENT_SECRET"),
            ),
        },
        endpoints: ProviderEndpoints {
            meta_dialog_url: endpoint("META_DIALOG_URL", defaults.meta_dialog_url),
            meta_graph_url: endpoint("META_GRAPH_URL", defaults.meta_graph_url),
            google_auth_url: endpoint("GOOGLE_OAUTH_URL", defaults.google_auth_url),
            google_token_url: endpoint("GOOGLE_TOKEN_URL", defaults.google_token_url),
            google_api_url: endpoint("GOOGLE_API_URL", defaults.google_api_url),
            linkedin_oauth_url: endpoint("LINKEDIN_OAUTH_URL", defaults.linkedin_oauth_url),
            linkedin_api_url: endpoint("LINKEDIN_API_URL", defaults.linkedin_api_url),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.redis_url.is_none());
        assert!(cfg.admin_key.is_none());
        assert_eq!(cfg.endpoints.meta_graph_url, "https://graph.facebook.com");
        assert_eq!(cfg.secrets(), ProviderSecrets::default());
    }

    #[test]
    fn test_production_requires_admin_key() {
        let err = from_lookup(lookup(&[("PUBLINK_ENV", "production")])).unwrap_err();
        assert!(err.to_string().contains("PUBLINK_ADMIN_KEY"));

        let cfg = from_lookup(lookup(&[
            ("PUBLINK_ENV", "production"),
            ("PUBLINK_ADMIN_KEY", "k"),
        ]))
        .unwrap();
        assert_eq!(cfg.admin_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_empty_secret_counts_as_not_configured() {
        let cfg = from_lookup(lookup(&[
            ("META_APP_ID", "123"),
            ("META_APP_SECRET", ""),
            ("GOOGLE_CLIENT_SECRET", "s"),
        ]))
        .unwrap();
        let secrets = cfg.secrets();
        assert!(!secrets.has_client_secret(Platform::Meta));
        assert!(secrets.has_client_secret(Platform::GoogleVideo));
        assert!(!secrets.has_client_secret(Platform::ProfessionalNetwork));
        assert_eq!(cfg.providers.meta.client_id.as_deref(), Some("123"));
    }

    #[test]
    fn test_redirect_uri_per_platform() {
        let cfg = from_lookup(lookup(&[("PUBLINK_PUBLIC_URL", "https://app.example.com/")])).unwrap();
        assert_eq!(
            cfg.redirect_uri(Platform::GoogleVideo),
            "https://app.example.com/api/v1/social-auth?action=callback&platform=google_video"
        );
    }

    #[test]
    fn test_endpoint_overrides() {
        let cfg = from_lookup(lookup(&[("GOOGLE_TOKEN_URL", "http://127.0.0.1:9/token")])).unwrap();
        assert_eq!(cfg.endpoints.google_token_url, "http://127.0.0.1:9/token");
        assert_eq!(cfg.endpoints.google_api_url, "https://www.googleapis.com");
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let creds = ClientCredentials::new(Some("id".into()), Some("hunter2".into()));
        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("id"));
        assert!(!dbg.contains("hunter2"));
    }
}
