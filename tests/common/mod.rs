//! Shared helpers for the HTTP integration tests.
//!
//! The app runs over a `MemoryStore`; provider endpoints point at a
//! `wiremock::MockServer` so no test leaves the machine.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use connect::config::{ClientCredentials, Config, ProviderEndpoints};
use connect::store::MemoryStore;
use connect::{api, AppState};

pub const ADMIN_KEY: &str = "test-admin-key";
pub const RETURN_URL: &str = "https://app.example.com/settings/connections";

pub struct TestApp {
    pub router: Router,
    pub mem: MemoryStore,
    pub state: Arc<AppState>,
}

pub fn test_config(provider_base: &str) -> Config {
    let mut config = Config::for_tests();
    config.admin_key = Some(ADMIN_KEY.into());
    config.return_url = RETURN_URL.into();
    config.public_url = "https://connect.example.com".into();
    config.endpoints = ProviderEndpoints::all_at(provider_base);
    config.providers.meta = ClientCredentials::new(Some("meta-app".into()), Some("meta-secret".into()));
    config.providers.google = ClientCredentials::new(Some("g-client".into()), Some("g-secret".into()));
    config.providers.linkedin = ClientCredentials::new(Some("li-client".into()), Some("li-secret".into()));
    config
}

pub fn build_test_app(config: Config) -> TestApp {
    let mem = MemoryStore::new();
    let state = AppState::new(config, Arc::new(mem.clone()), Arc::new(mem.clone())).unwrap();
    from_state(state, mem)
}

pub fn from_state(state: AppState, mem: MemoryStore) -> TestApp {
    let state = Arc::new(state);
    TestApp {
        router: api::app(state.clone()),
        mem,
        state,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn admin_get(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header("x-admin-key", ADMIN_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn anon_get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Request an auth URL through the API and return the state it carries.
    pub async fn start_flow(&self, platform: &str) -> String {
        let resp = self
            .admin_get(&format!(
                "/api/v1/social-auth?action=get-auth-url&platform={}",
                platform
            ))
            .await;
        assert_eq!(resp.status(), 200);
        let body = body_json(resp).await;
        let auth_url = body["authUrl"].as_str().unwrap().to_string();
        query_value(&auth_url, "state").expect("state in auth url")
    }

    /// Simulate the provider redirecting the browser back.
    pub async fn callback(&self, platform: &str, code: &str, state: &str) -> Response<Body> {
        self.anon_get(&format!(
            "/api/v1/social-auth?action=callback&platform={}&code={}&state={}",
            platform, code, state
        ))
        .await
    }

    pub async fn connections(&self) -> Value {
        let resp = self
            .admin_get("/api/v1/social-auth?action=check-connections")
            .await;
        assert_eq!(resp.status(), 200);
        body_json(resp).await["connections"].clone()
    }
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(resp: &Response<Body>) -> String {
    resp.headers()
        .get("location")
        .expect("redirect location")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn query_value(url: &str, name: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

// ── Provider mocks ───────────────────────────────────────────

/// Google token endpoint for `code` plus the channel lookup for the issued token.
pub async fn mount_google(
    server: &MockServer,
    code: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    channel: Option<(&str, &str)>,
) {
    let mut token = json!({
        "access_token": access_token,
        "expires_in": 3599,
        "token_type": "Bearer"
    });
    if let Some(refresh) = refresh_token {
        token["refresh_token"] = json!(refresh);
    }
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(format!("code={}", code)))
        .respond_with(ResponseTemplate::new(200).set_body_json(token))
        .mount(server)
        .await;

    let items = match channel {
        Some((id, title)) => json!([{ "id": id, "snippet": { "title": title } }]),
        None => json!([]),
    };
    Mock::given(method("GET"))
        .and(path("/youtube/v3/channels"))
        .and(header("authorization", format!("Bearer {}", access_token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

/// Graph token exchange, long-lived upgrade and page listing.
pub async fn mount_meta(server: &MockServer, pages: Value) {
    Mock::given(method("GET"))
        .and(path("/v19.0/oauth/access_token"))
        .and(wiremock::matchers::query_param("grant_type", "fb_exchange_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "long-user-token",
            "token_type": "bearer"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v19.0/oauth/access_token"))
        .and(wiremock::matchers::query_param("code", "meta-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "short-user-token",
            "token_type": "bearer"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v19.0/me/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": pages })))
        .mount(server)
        .await;
}

/// LinkedIn token + userinfo; organizations answer with `orgs_status`.
pub async fn mount_linkedin(server: &MockServer, orgs_status: u16) {
    Mock::given(method("POST"))
        .and(path("/oauth/v2/accessToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "AQV-li-token",
            "expires_in": 31536000
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "782bbtaQ",
            "name": "Ada Lovelace",
            "email": "ada@example.com"
        })))
        .mount(server)
        .await;

    let orgs = if orgs_status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "elements": [{ "organization": "urn:li:organization:2414183" }]
        }))
    } else {
        ResponseTemplate::new(orgs_status).set_body_json(json!({
            "message": "Not enough permissions to access: GET /organizationAcls",
            "status": orgs_status
        }))
    };
    Mock::given(method("GET"))
        .and(path("/v2/organizationAcls"))
        .respond_with(orgs)
        .mount(server)
        .await;
}
