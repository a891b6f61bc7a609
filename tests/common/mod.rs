//! Common test utilities for E2E tests

use std::sync::Once;

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::net::TcpListener;
use wicketgate::{AppState, config};

static INIT_METRICS: Once = Once::new();

/// Test server instance
///
/// Runs the application against a stub Google provider served from a
/// second local listener, so login flows complete without the network.
pub struct TestServer {
    pub addr: String,
    pub provider_addr: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        INIT_METRICS.call_once(wicketgate::metrics::init_metrics);

        // Spawn the stub provider first; its address goes into the
        // app configuration.
        let provider_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let provider_addr = provider_listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            axum::serve(provider_listener, stub_provider_router())
                .await
                .unwrap();
        });

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
                sweep_interval_seconds: 300,
                failure_redirect: "/login".to_string(),
                google: config::GoogleOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    auth_url: format!("http://{provider_addr}/authorize"),
                    token_url: format!("http://{provider_addr}/token"),
                    userinfo_url: format!("http://{provider_addr}/userinfo"),
                    redirect_uri: None,
                },
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = wicketgate::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            provider_addr,
            state,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Run a full login handshake against the stub provider
    ///
    /// # Returns
    /// The session cookie pair ("session=...") of the now-authenticated
    /// client
    pub async fn login(&self) -> String {
        let client = no_redirect_client();

        let response = client
            .get(self.url("/auth/google"))
            .send()
            .await
            .expect("begin-login request succeeds");
        assert!(response.status().is_redirection());

        let cookie = session_cookie(&response).expect("session cookie set");
        let location = location_header(&response).expect("location header");
        let state = state_param(&location).expect("state param in authorize URL");

        let response = client
            .get(self.url(&format!(
                "/auth/google/callback?code=good-code&state={state}"
            )))
            .header("Cookie", &cookie)
            .send()
            .await
            .expect("callback request succeeds");
        assert!(response.status().is_redirection());
        assert_eq!(location_header(&response).as_deref(), Some("/user"));

        cookie
    }
}

/// Client that surfaces redirects instead of following them
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// The `session=...` cookie pair from a response, if one was set
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}

/// The Location header of a redirect response
pub fn location_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// The `state` query parameter of an authorize URL
pub fn state_param(location: &str) -> Option<String> {
    let url = url::Url::parse(location).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
}

// =============================================================================
// Stub Google provider
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenForm {
    code: String,
}

fn stub_provider_router() -> Router {
    Router::new()
        .route("/authorize", get(stub_authorize))
        .route("/token", post(stub_token))
        .route("/userinfo", get(stub_userinfo))
}

async fn stub_authorize() -> &'static str {
    "stub provider authorize page"
}

/// Token endpoint: accepts any code except "bad-code"
async fn stub_token(Form(form): Form<TokenForm>) -> Response {
    if form.code == "bad-code" {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "invalid_grant"})),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "access_token": "stub-access-token",
        "token_type": "bearer",
        "expires_in": 3600,
        "scope": "profile email",
    }))
    .into_response()
}

/// Userinfo endpoint: requires the stub access token
async fn stub_userinfo(headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer stub-access-token");

    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(serde_json::json!({
        "sub": "10769150350006150715113082367",
        "name": "Test User",
        "email": "testuser@example.com",
    }))
    .into_response()
}
