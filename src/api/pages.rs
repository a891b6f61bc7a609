//! HTML pages
//!
//! The public home page and the protected user page.

use axum::{
    Router, middleware,
    response::{Html, IntoResponse},
    routing::get,
};

use crate::AppState;
use crate::auth::{CurrentUser, require_auth};

/// Create pages router
///
/// `/user` sits behind the authentication gate: anonymous requests are
/// redirected to the login flow by the middleware.
pub fn pages_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/user", get(user_page))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/", get(home_page))
        .merge(protected_routes)
}

/// GET /
async fn home_page() -> impl IntoResponse {
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Wicketgate</title></head>
        <body>
            <h1>Home Page</h1>
            <a href="/user">Your account</a>
        </body>
        </html>
    "#,
    )
}

/// GET /user
///
/// Renders the current identity's display name and primary email.
/// Both fields may be absent in the provider profile; the page falls
/// back rather than failing.
async fn user_page(CurrentUser(identity): CurrentUser) -> Html<String> {
    let name = identity
        .display_name
        .as_deref()
        .unwrap_or(&identity.subject);
    let email_line = match &identity.primary_email {
        Some(email) => format!("<p>Email: {}</p>", html_escape::encode_text(email)),
        None => "<p>No email on file</p>".to_string(),
    };

    Html(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Your account - Wicketgate</title></head>
        <body>
            <h1>Welcome, {}</h1>
            {}
            <a href="/logout">Logout</a>
        </body>
        </html>
    "#,
        html_escape::encode_text(name),
        email_line,
    ))
}
