//! Wicketgate - a session-backed Google sign-in gate
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - HTML pages (home, user)                                  │
//! │  - Login routes (begin, callback, logout)                   │
//! │  - Metrics endpoint                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Authentication Gate                         │
//! │  - anonymous vs. authenticated per request                  │
//! │  - handshake state, verify hook                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Collaborators                            │
//! │  - Session store (in-memory, TTL)                           │
//! │  - Google OAuth client (oauth2 + reqwest)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for pages and metrics
//! - `auth`: Authentication gate, Google OAuth flow, sessions
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the session store and the gate.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session store (in-memory, TTL-bound)
    pub sessions: Arc<auth::SessionStore>,

    /// Authentication gate
    pub gate: Arc<auth::AuthGate>,
}

impl AppState {
    /// Initialize application state
    ///
    /// Construction order matters: the session store must exist before
    /// the gate, and the gate before any routes are registered.
    ///
    /// # Errors
    /// Returns error if the provider client cannot be built from the
    /// configuration
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Session store
        let sessions = Arc::new(auth::SessionStore::new(config.auth.session_max_age));

        // 2. HTTP client for the userinfo fetch
        let http_client = reqwest::Client::builder()
            .user_agent("Wicketgate/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        // 3. Google provider client
        let provider = auth::GoogleProvider::new(
            &config.auth.google,
            config.callback_url(),
            http_client,
        )?;
        tracing::info!(callback_url = %config.callback_url(), "Google provider initialized");

        // 4. Authentication gate
        let gate = Arc::new(auth::AuthGate::new(
            sessions.clone(),
            Arc::new(provider),
            auth::default_verify,
            config.auth.session_secret.clone(),
            config.should_use_secure_cookies(),
        ));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            sessions,
            gate,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .merge(api::pages_router(state.clone()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
