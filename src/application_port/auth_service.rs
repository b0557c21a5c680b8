use crate::domain_model::{Session, SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Collapsed external outcome for every rejected authentication branch.
    /// Which internal check failed (malformed credential, expired token,
    /// revoked or unknown session, missing user) is deliberately not
    /// distinguishable from outside.
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("session not found")]
    SessionNotFound,
    #[error("token invalid")]
    TokenInvalid,
    #[error("malformed session credential")]
    MalformedCredential,
    #[error("invalid request: {0}")]
    InvalidData(String),
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Claims carried by every signed token. For refresh tokens the `jti`
/// doubles as the backing Session's id.
#[derive(Debug, Clone)]
pub struct Claims {
    pub subject: UserId,
    pub jti: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies signed, self-contained tokens. Access and refresh
/// tokens use the same mechanism with different lifetimes.
#[async_trait::async_trait]
pub trait TokenMinter: Send + Sync {
    /// Generate a fresh jti and sign claims for `subject` expiring `ttl`
    /// from now. Callers need the returned claims to bind a Session to the
    /// token's jti and expiry. A zero `ttl` is a contract violation and is
    /// rejected.
    async fn create_token(
        &self,
        subject: UserId,
        ttl: Duration,
    ) -> Result<(String, Claims), AuthError>;

    /// Validate signature, algorithm and expiry (`expires_at` exactly equal
    /// to now counts as expired). Every failure collapses to
    /// `AuthError::TokenInvalid` so callers probing revocation state learn
    /// nothing from the error shape.
    async fn verify_token(&self, token: &str) -> Result<Claims, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// What the `session` cookie carries. The cookie codec signs this so
/// tampering is caught without a store lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<&AuthTokens> for SessionTokens {
    fn from(tokens: &AuthTokens) -> Self {
        SessionTokens {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
        }
    }
}

/// Resolved identity attached to a request after authentication. When the
/// refresh path rotated the session, `renewed` holds the replacement pair
/// that must overwrite the outbound cookie.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: UserId,
    pub renewed: Option<AuthTokens>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub picture_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user_id: UserId,
    pub tokens: AuthTokens,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, input: RegisterInput) -> Result<LoginResult, AuthError>;

    async fn login(&self, input: LoginInput) -> Result<LoginResult, AuthError>;

    /// Exchange an OAuth authorization code, fetch the profile, and log the
    /// user in, creating the account on first sight of the email.
    async fn login_with_provider(&self, code: &str) -> Result<LoginResult, AuthError>;

    /// The per-request guard: access-token fast path, refresh-token
    /// rotation slow path. Every rejected branch returns
    /// `AuthError::Unauthorized`; store failures during rotation propagate
    /// as `AuthError::Store` (fail closed, not unauthorized).
    async fn authenticate(&self, tokens: &SessionTokens) -> Result<AuthContext, AuthError>;

    /// Verify the refresh token and delete its session outright.
    async fn logout(&self, tokens: &SessionTokens) -> Result<(), AuthError>;

    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<Session>, AuthError>;

    /// Revoke one of the caller's own sessions (e.g. "log out that other
    /// device"). Revoking an already-revoked session is a no-op.
    async fn revoke_session(&self, user_id: UserId, id: &SessionId) -> Result<(), AuthError>;
}
