//! Google login routes
//!
//! Routes:
//! - GET /login - Login page (default handshake-failure target)
//! - GET /auth/google - Redirect to Google
//! - GET /auth/google/callback - OAuth callback
//! - GET /logout - Logout

use axum::{
    Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;
use crate::metrics::LOGINS_TOTAL;

/// Route that starts the login handshake
pub const BEGIN_LOGIN_PATH: &str = "/auth/google";

/// Create authentication router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page))
        .route(BEGIN_LOGIN_PATH, get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        .route("/logout", get(logout))
}

/// GET /login
///
/// Renders a simple login page with a Google sign-in link.
async fn login_page() -> impl IntoResponse {
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Login - Wicketgate</title></head>
        <body>
            <h1>Wicketgate</h1>
            <p>Please sign in with Google</p>
            <a href="/auth/google">Sign in with Google</a>
        </body>
        </html>
    "#,
    )
}

/// GET /auth/google
///
/// Unconditionally redirects to Google's authorization page with the
/// `profile` and `email` scopes; the CSRF state lands in the session.
async fn google_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let (jar, authorize_url) = state.gate.begin_login(jar).await?;
    Ok((jar, Redirect::to(authorize_url.as_str())))
}

/// Query parameters from the Google callback
///
/// All optional: the provider omits `code` when the user denies access
/// and sends `error` instead.
#[derive(Debug, Deserialize)]
struct GoogleCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Provider error code (e.g. access_denied)
    error: Option<String>,
}

/// GET /auth/google/callback
///
/// Completes the handshake. Success redirects to /user; any failure
/// redirects to the configured failure route without touching the
/// session. Failures never surface as error responses here.
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
    jar: CookieJar,
) -> Redirect {
    let failure = Redirect::to(&state.config.auth.failure_redirect);

    if let Some(provider_error) = query.error {
        tracing::warn!(error = %provider_error, "Google reported an authorization error");
        LOGINS_TOTAL.with_label_values(&["failure"]).inc();
        return failure;
    }

    let (code, csrf_state) = match (query.code, query.state) {
        (Some(code), Some(csrf_state)) => (code, csrf_state),
        _ => {
            tracing::warn!("Callback missing code or state parameter");
            LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            return failure;
        }
    };

    match state.gate.complete_login(&jar, &code, &csrf_state).await {
        Ok(_) => Redirect::to("/user"),
        Err(error) => {
            tracing::warn!(%error, "Google login failed");
            LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            failure
        }
    }
}

/// GET /logout
///
/// Clears the session and redirects home. A no-op for anonymous
/// clients.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = state.gate.logout(jar).await;
    (jar, Redirect::to("/"))
}
