//! Session store and signed session cookies
//!
//! Sessions are server-side records addressed by a random session ID.
//! The client only ever holds the ID, delivered as an HMAC-signed cookie
//! token. Records live in an in-memory map; swapping in a persistent
//! backend means replacing [`SessionStore`] behind the same interface.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::metrics::{SESSIONS_ACTIVE, SESSIONS_CREATED_TOTAL, SESSIONS_DESTROYED_TOTAL};

/// Random, unguessable session identifier
///
/// 32 random bytes, URL-safe base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random session ID
    pub fn generate() -> Self {
        use base64::{Engine as _, engine::general_purpose};
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimal identity projection stored in the session
///
/// Only the fields needed for display are kept; the raw provider
/// profile is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Provider-assigned subject identifier
    pub subject: String,
    /// Display name from the provider profile
    pub display_name: Option<String>,
    /// First email address from the provider profile
    pub primary_email: Option<String>,
}

/// Transient CSRF state held across the login redirect round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingHandshake {
    /// CSRF state token embedded in the authorization URL
    pub state: String,
    /// When the handshake was started
    pub started_at: DateTime<Utc>,
}

/// Server-side session record
///
/// A record with no identity attached is equivalent to no session at
/// all: both resolve to anonymous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Attached identity, if the login handshake has completed
    pub identity: Option<SessionIdentity>,
    /// In-flight login handshake, if any
    pub handshake: Option<PendingHandshake>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session expires
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    fn new(max_age: Duration) -> Self {
        let now = Utc::now();
        Self {
            identity: None,
            handshake: None,
            created_at: now,
            expires_at: now + max_age,
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// In-memory session store
///
/// Addressed by session ID; all mutation is scoped to a single record,
/// so the RwLock only guards the map itself.
pub struct SessionStore {
    max_age: Duration,
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl SessionStore {
    pub fn new(max_age_seconds: i64) -> Self {
        Self {
            max_age: Duration::seconds(max_age_seconds),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a fresh, anonymous session
    pub async fn create(&self) -> (SessionId, SessionRecord) {
        let id = SessionId::generate();
        let record = SessionRecord::new(self.max_age);

        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), record.clone());
        SESSIONS_CREATED_TOTAL.inc();
        SESSIONS_ACTIVE.set(sessions.len() as i64);

        (id, record)
    }

    /// Look up a session record
    ///
    /// Expired records are treated as absent.
    pub async fn get(&self, id: &SessionId) -> Option<SessionRecord> {
        let sessions = self.sessions.read().await;
        sessions.get(id).filter(|record| !record.is_expired()).cloned()
    }

    /// Replace a session record
    pub async fn set(&self, id: &SessionId, record: SessionRecord) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), record);
    }

    /// Destroy a session record
    ///
    /// Safe to call on an unknown ID.
    pub async fn destroy(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id).is_some();
        if removed {
            SESSIONS_DESTROYED_TOTAL.inc();
        }
        SESSIONS_ACTIVE.set(sessions.len() as i64);
        removed
    }

    /// Drop all expired records
    ///
    /// # Returns
    /// Number of records removed
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired());
        let purged = before - sessions.len();
        if purged > 0 {
            SESSIONS_DESTROYED_TOTAL.inc_by(purged as u64);
        }
        SESSIONS_ACTIVE.set(sessions.len() as i64);
        purged
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Create a signed session cookie token
///
/// Token format: {session_id}.base64(hmac_sha256(session_id))
///
/// # Arguments
/// * `id` - Session ID to sign
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn sign_session_id(id: &SessionId, secret: &str) -> Result<String, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(id.as_str().as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", id.as_str(), signature_b64))
}

/// Verify a signed session cookie token
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
///
/// # Returns
/// The session ID if the signature is valid
///
/// # Errors
/// Returns error if signature is invalid or token is malformed
pub fn verify_session_token(
    token: &str,
    secret: &str,
) -> Result<SessionId, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(crate::error::AppError::Unauthorized);
    }

    let id = parts[0];
    let signature_b64 = parts[1];

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(id.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| crate::error::AppError::InvalidSignature)?;

    Ok(SessionId(id.to_string()))
}
