//! Authentication middleware
//!
//! Guards routes that require an identity. Anonymous requests are
//! redirected to the start-login route rather than rejected with 401.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::routes::BEGIN_LOGIN_PATH;
use super::session::SessionIdentity;
use crate::AppState;

/// Middleware to require authentication
///
/// Resolves the session identity from the cookie and adds it to the
/// request extensions. Anonymous requests get a redirect to the
/// start-login route.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/user", ...)
///     .route_layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match state.gate.current_identity(&jar).await {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => Redirect::to(BEGIN_LOGIN_PATH).into_response(),
    }
}

/// Extractor for the current authenticated identity
///
/// Use in handlers behind [`require_auth`]; also resolves the session
/// directly when used without the middleware. Anonymous requests are
/// redirected, never 401'd.
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(identity): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {:?}", identity.display_name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<SessionIdentity>().cloned() {
            return Ok(CurrentUser(identity));
        }

        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        match state.gate.current_identity(&jar).await {
            Some(identity) => {
                parts.extensions.insert(identity.clone());
                Ok(CurrentUser(identity))
            }
            None => Err(Redirect::to(BEGIN_LOGIN_PATH).into_response()),
        }
    }
}
