//! Authentication gate
//!
//! Maps each request to exactly one of anonymous or
//! authenticated(identity), based on the session cookie. The credential
//! exchange itself is delegated to the [`IdentityProvider`]
//! collaborator; attaching the returned profile to the session goes
//! through an injected verify hook.

use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use url::Url;

use super::google::{Identity, IdentityProvider};
use super::session::{
    PendingHandshake, SessionId, SessionIdentity, SessionRecord, SessionStore, sign_session_id,
    verify_session_token,
};
use crate::error::AppError;
use crate::metrics::LOGINS_TOTAL;

/// Session cookie name
pub const SESSION_COOKIE: &str = "session";

/// Verify/attach hook invoked on every completed login
///
/// Pure function from the provider profile to the identity stored in
/// the session. The default keeps the minimal display projection; a
/// future hook could look up a local user record by subject ID instead.
pub type VerifyIdentity = fn(Identity) -> Result<SessionIdentity, AppError>;

/// Default verify hook: keep subject, display name and first email
pub fn default_verify(identity: Identity) -> Result<SessionIdentity, AppError> {
    Ok(SessionIdentity {
        subject: identity.subject,
        display_name: identity.display_name,
        primary_email: identity.emails.into_iter().next(),
    })
}

/// The authentication gate
///
/// Constructed after the session store and before route registration.
pub struct AuthGate {
    sessions: Arc<SessionStore>,
    provider: Arc<dyn IdentityProvider>,
    verify: VerifyIdentity,
    session_secret: String,
    secure_cookies: bool,
}

impl AuthGate {
    pub fn new(
        sessions: Arc<SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        verify: VerifyIdentity,
        session_secret: String,
        secure_cookies: bool,
    ) -> Self {
        Self {
            sessions,
            provider,
            verify,
            session_secret,
            secure_cookies,
        }
    }

    /// Session ID from the request cookie, if the signature checks out
    fn session_id_from_jar(&self, jar: &CookieJar) -> Option<SessionId> {
        let cookie = jar.get(SESSION_COOKIE)?;
        match verify_session_token(cookie.value(), &self.session_secret) {
            Ok(id) => Some(id),
            Err(error) => {
                tracing::debug!(%error, "Rejected session cookie");
                None
            }
        }
    }

    async fn record_from_jar(&self, jar: &CookieJar) -> Option<(SessionId, SessionRecord)> {
        let id = self.session_id_from_jar(jar)?;
        let record = self.sessions.get(&id).await?;
        Some((id, record))
    }

    /// True iff the request's session has an identity attached
    ///
    /// Pure read; a session without an identity is anonymous.
    pub async fn is_authenticated(&self, jar: &CookieJar) -> bool {
        self.current_identity(jar).await.is_some()
    }

    /// The attached identity, if any
    ///
    /// Absent is not an error.
    pub async fn current_identity(&self, jar: &CookieJar) -> Option<SessionIdentity> {
        let (_, record) = self.record_from_jar(jar).await?;
        record.identity
    }

    /// Start the login handshake
    ///
    /// Stores fresh CSRF state in the session (creating one if the
    /// client has none) and returns the provider authorization URL to
    /// redirect to, along with the jar carrying the session cookie.
    pub async fn begin_login(&self, jar: CookieJar) -> Result<(CookieJar, Url), AppError> {
        let (session_id, mut record) = match self.record_from_jar(&jar).await {
            Some(existing) => existing,
            None => self.sessions.create().await,
        };

        let (authorize_url, state) = self.provider.authorization_redirect_url();
        record.handshake = Some(PendingHandshake {
            state,
            started_at: Utc::now(),
        });
        self.sessions.set(&session_id, record).await;

        let jar = jar.add(self.session_cookie(&session_id)?);
        Ok((jar, authorize_url))
    }

    /// Complete the login handshake from the provider callback
    ///
    /// Validates the CSRF state, exchanges the code, runs the verify
    /// hook and attaches the result to the session, replacing any prior
    /// identity. On any failure the session is left untouched.
    pub async fn complete_login(
        &self,
        jar: &CookieJar,
        code: &str,
        state: &str,
    ) -> Result<SessionIdentity, AppError> {
        let (session_id, record) = self
            .record_from_jar(jar)
            .await
            .ok_or_else(|| AppError::Handshake("no login in progress".to_string()))?;

        let handshake = record
            .handshake
            .as_ref()
            .ok_or_else(|| AppError::Handshake("no login in progress".to_string()))?;

        if handshake.state != state {
            return Err(AppError::Handshake("state mismatch".to_string()));
        }

        let identity = self.provider.exchange_code_for_identity(code).await?;
        let session_identity = (self.verify)(identity)?;

        let mut record = record;
        record.identity = Some(session_identity.clone());
        record.handshake = None;
        self.sessions.set(&session_id, record).await;

        LOGINS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!(subject = %session_identity.subject, "Login completed");

        Ok(session_identity)
    }

    /// Clear the session
    ///
    /// Destroys the record and removes the cookie. Safe to call with no
    /// session or an already-anonymous one.
    pub async fn logout(&self, jar: CookieJar) -> CookieJar {
        if let Some(id) = self.session_id_from_jar(&jar) {
            self.sessions.destroy(&id).await;
        }

        jar.remove(Cookie::build(SESSION_COOKIE).path("/").build())
    }

    fn session_cookie(&self, id: &SessionId) -> Result<Cookie<'static>, AppError> {
        let token = sign_session_id(id, &self.session_secret)?;
        Ok(Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .build())
    }
}
