use crate::domain_model::{Session, SessionId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// Key absent: never written, TTL-expired, or deleted. Absence encodes
    /// expiry, so there is no separate "expired" case.
    #[error("session not found")]
    NotFound,
    /// Lost the revocation race: some other caller flipped the flag first.
    #[error("session already revoked")]
    AlreadyRevoked,
    /// Transient store failure (connectivity, timeout). Never to be conflated
    /// with NotFound; the fail-open/fail-closed call belongs to the caller.
    #[error("store error: {0}")]
    Store(String),
}

/// Registry of revocable refresh sessions, keyed by the refresh token jti,
/// with a secondary per-user index.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Write the session record with TTL = time until `expires_at` and add
    /// its id to the owning user's index as one pipelined unit. A dangling
    /// index entry (crash between the writes) is handled like a naturally
    /// expired one by `find_by_user_id`.
    async fn create(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Authoritative lookup. `NotFound` covers never-written and TTL-expired
    /// alike.
    async fn find_by_id(&self, id: &SessionId) -> Result<Session, SessionStoreError>;

    /// Read the user's index and batch-fetch every member. Only resolvable
    /// records are returned; stale index entries are pruned by a detached
    /// best-effort task that never fails or delays the caller.
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Session>, SessionStoreError>;

    /// Conditional one-way transition to revoked, preserving the TTL. Only
    /// the first caller to revoke an unrevoked session wins; later callers
    /// get `AlreadyRevoked`. Immediately visible to subsequent reads.
    async fn revoke(&self, id: &SessionId) -> Result<(), SessionStoreError>;

    /// Unconditional removal, used for explicit logout. Unlike `revoke` this
    /// drops the record instead of keeping it around for replay auditing.
    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError>;
}
