//! Google OAuth identity provider client
//!
//! Wraps the authorization-code flow: building the authorization
//! redirect, exchanging the callback code for an access token (via the
//! `oauth2` crate) and fetching the OpenID Connect userinfo profile.

use axum::async_trait;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;
use url::Url;

use crate::config::GoogleOAuthConfig;
use crate::error::AppError;

/// Verified user attributes from the identity provider
///
/// Externally sourced and never mutated here; the gate projects it into
/// a [`SessionIdentity`](crate::auth::session::SessionIdentity) before
/// storing anything.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Provider-assigned subject identifier
    pub subject: String,
    /// Display name, if the profile carries one
    pub display_name: Option<String>,
    /// Email addresses; may be empty
    pub emails: Vec<String>,
}

/// Identity provider client seam
///
/// The two operations the gate needs from a provider. Kept as a trait
/// so gate tests can run against a stub without a network round trip.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the authorization redirect URL with a fresh CSRF state
    ///
    /// # Returns
    /// The URL to redirect the user to, and the state token to hold
    /// across the round trip.
    fn authorization_redirect_url(&self) -> (Url, String);

    /// Exchange a callback authorization code for the user's identity
    async fn exchange_code_for_identity(&self, code: &str) -> Result<Identity, AppError>;
}

/// Userinfo response from Google's OpenID Connect endpoint
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

impl From<GoogleUserInfo> for Identity {
    fn from(info: GoogleUserInfo) -> Self {
        Self {
            subject: info.sub,
            display_name: info.name,
            // Google returns at most one address here; keep the list
            // shape so display code never assumes presence.
            emails: info.email.into_iter().collect(),
        }
    }
}

/// Google OAuth client
pub struct GoogleProvider {
    client: BasicClient,
    http_client: reqwest::Client,
    userinfo_url: Url,
}

impl GoogleProvider {
    /// Build the provider client from configuration
    ///
    /// # Errors
    /// Returns error if any configured endpoint URL is invalid
    pub fn new(
        config: &GoogleOAuthConfig,
        redirect_uri: String,
        http_client: reqwest::Client,
    ) -> Result<Self, AppError> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(config.auth_url.clone())
                .map_err(|e| AppError::Config(format!("auth.google.auth_url: {e}")))?,
            Some(
                TokenUrl::new(config.token_url.clone())
                    .map_err(|e| AppError::Config(format!("auth.google.token_url: {e}")))?,
            ),
        )
        .set_redirect_uri(
            RedirectUrl::new(redirect_uri)
                .map_err(|e| AppError::Config(format!("auth.google.redirect_uri: {e}")))?,
        );

        let userinfo_url = Url::parse(&config.userinfo_url)
            .map_err(|e| AppError::Config(format!("auth.google.userinfo_url: {e}")))?;

        Ok(Self {
            client,
            http_client,
            userinfo_url,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_redirect_url(&self) -> (Url, String) {
        let (url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .url();

        (url, csrf_token.secret().clone())
    }

    async fn exchange_code_for_identity(&self, code: &str) -> Result<Identity, AppError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| AppError::Handshake(format!("token exchange failed: {e}")))?;

        let info: GoogleUserInfo = self
            .http_client
            .get(self.userinfo_url.clone())
            .bearer_auth(token.access_token().secret())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(subject = %info.sub, "Fetched userinfo profile");

        Ok(Identity::from(info))
    }
}
