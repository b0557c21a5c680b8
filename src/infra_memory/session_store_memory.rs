use crate::domain_model::{Session, SessionId, UserId};
use crate::domain_port::{SessionStore, SessionStoreError};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;

/// In-memory `SessionStore` used by tests and the `memory` backend. Expiry
/// is enforced on read: a record whose `expires_at` has passed behaves
/// exactly like an absent key.
#[derive(Default)]
pub struct MemorySessionStore {
    records: DashMap<SessionId, Session>,
    index: DashMap<UserId, HashSet<SessionId>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self, id: &SessionId) -> Option<Session> {
        let session = self.records.get(id)?.clone();
        if session.expires_at <= Utc::now() {
            self.records.remove(id);
            return None;
        }
        Some(session)
    }

    #[cfg(test)]
    pub fn index_size(&self, user_id: UserId) -> usize {
        self.index.get(&user_id).map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &Session) -> Result<(), SessionStoreError> {
        self.records.insert(session.id.clone(), session.clone());
        self.index
            .entry(session.user_id)
            .or_default()
            .insert(session.id.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Session, SessionStoreError> {
        self.live(id).ok_or(SessionStoreError::NotFound)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Session>, SessionStoreError> {
        let ids: Vec<SessionId> = match self.index.get(&user_id) {
            Some(set) => set.iter().cloned().collect(),
            None => return Ok(Vec::new()),
        };

        let mut sessions = Vec::new();
        let mut stale = Vec::new();
        for id in ids {
            match self.live(&id) {
                Some(session) => sessions.push(session),
                None => stale.push(id),
            }
        }

        // No I/O here, so the lazy prune runs inline instead of detached.
        if !stale.is_empty() {
            if let Some(mut set) = self.index.get_mut(&user_id) {
                for id in &stale {
                    set.remove(id);
                }
            }
        }

        Ok(sessions)
    }

    async fn revoke(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        let mut entry = self.records.get_mut(id).ok_or(SessionStoreError::NotFound)?;
        if entry.expires_at <= Utc::now() {
            drop(entry);
            self.records.remove(id);
            return Err(SessionStoreError::NotFound);
        }
        if entry.is_revoked {
            return Err(SessionStoreError::AlreadyRevoked);
        }
        // The entry guard holds the shard lock, so this check-then-set is
        // atomic: exactly one concurrent revoker wins.
        entry.is_revoked = true;
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        self.records.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use uuid::Uuid;

    fn session(id: &str, user_id: UserId, ttl: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: SessionId(id.to_string()),
            user_id,
            provider_refresh_token: String::new(),
            is_revoked: false,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    #[tokio::test]
    async fn revoke_is_terminal_and_rejects_replay() {
        let store = MemorySessionStore::new();
        let user = UserId(Uuid::new_v4());
        let id = SessionId("r1".to_string());
        store
            .create(&session("r1", user, Duration::hours(1)))
            .await
            .unwrap();

        let found = store.find_by_id(&id).await.unwrap();
        assert!(!found.is_revoked);

        store.revoke(&id).await.unwrap();
        assert!(store.find_by_id(&id).await.unwrap().is_revoked);

        // Second revocation of the same session must lose.
        assert!(matches!(
            store.revoke(&id).await,
            Err(SessionStoreError::AlreadyRevoked)
        ));
    }

    #[tokio::test]
    async fn concurrent_revoke_has_one_winner() {
        let store = Arc::new(MemorySessionStore::new());
        let user = UserId(Uuid::new_v4());
        store
            .create(&session("r1", user, Duration::hours(1)))
            .await
            .unwrap();

        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.revoke(&SessionId("r1".to_string())).await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.revoke(&SessionId("r1".to_string())).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!(1, [&a, &b].iter().filter(|r| r.is_ok()).count());
    }

    #[tokio::test]
    async fn expired_record_reads_as_absent() {
        let store = MemorySessionStore::new();
        let user = UserId(Uuid::new_v4());
        store
            .create(&session("r1", user, Duration::seconds(-1)))
            .await
            .unwrap();

        assert!(matches!(
            store.find_by_id(&SessionId("r1".to_string())).await,
            Err(SessionStoreError::NotFound)
        ));
        assert!(matches!(
            store.revoke(&SessionId("r1".to_string())).await,
            Err(SessionStoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn stale_index_entries_are_pruned() {
        let store = MemorySessionStore::new();
        let user = UserId(Uuid::new_v4());
        store
            .create(&session("r1", user, Duration::hours(1)))
            .await
            .unwrap();
        store
            .create(&session("r2", user, Duration::hours(1)))
            .await
            .unwrap();

        // Delete r2's record directly, bypassing revoke: the index entry is
        // now dangling.
        store.delete(&SessionId("r2".to_string())).await.unwrap();

        let sessions = store.find_by_user_id(user).await.unwrap();
        assert_eq!(1, sessions.len());
        assert_eq!("r1", sessions[0].id.as_str());
        assert_eq!(1, store.index_size(user));
    }

    #[tokio::test]
    async fn delete_leaves_no_readable_record() {
        let store = MemorySessionStore::new();
        let user = UserId(Uuid::new_v4());
        store
            .create(&session("r1", user, Duration::hours(1)))
            .await
            .unwrap();
        store.revoke(&SessionId("r1".to_string())).await.unwrap();

        // Delete removes even a revoked record; absence wins over the flag.
        store.delete(&SessionId("r1".to_string())).await.unwrap();
        assert!(matches!(
            store.find_by_id(&SessionId("r1".to_string())).await,
            Err(SessionStoreError::NotFound)
        ));
    }
}
