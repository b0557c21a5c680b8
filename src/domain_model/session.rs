use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a refresh session. Always equal to the `jti` of the refresh
/// token that created it; this binding is what makes refresh tokens
/// revocable while access tokens stay stateless.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        SessionId(s)
    }
}

/// Server-side record backing one refresh token.
///
/// The record lives exactly as long as its refresh token: the store TTL
/// tracks `expires_at`, and once the backing record is gone the session is
/// non-existent regardless of `is_revoked`. `is_revoked` flips false -> true
/// once and never back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    /// Opaque third-party refresh credential; empty for password logins.
    pub provider_refresh_token: String,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
