use crate::domain_model::{Session, SessionId, UserId};
use crate::domain_port::{SessionStore, SessionStoreError};
use chrono::DateTime;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use tracing::debug;

const SESSION_REVOKE: &str = include_str!("session_revoke.lua");

/// Session records live in a hash per session, expired by Redis itself via
/// EXPIREAT on the refresh token's expiry. A per-user set indexes session
/// ids for enumeration; set members whose hash has expired are pruned
/// lazily on read.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn session_key(&self, id: &SessionId) -> String {
        format!("{}:session:{}", self.prefix, id)
    }

    fn user_key(&self, user_id: UserId) -> String {
        format!("{}:user_sessions:{}", self.prefix, user_id)
    }
}

fn field<'a>(map: &'a HashMap<String, String>, name: &str) -> Result<&'a str, SessionStoreError> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| SessionStoreError::Store(format!("session record missing field {name}")))
}

fn timestamp_field(
    map: &HashMap<String, String>,
    name: &str,
) -> Result<chrono::DateTime<chrono::Utc>, SessionStoreError> {
    let secs = field(map, name)?
        .parse::<i64>()
        .map_err(|e| SessionStoreError::Store(format!("bad {name}: {e}")))?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| SessionStoreError::Store(format!("bad {name}: out of range")))
}

fn parse_session(map: HashMap<String, String>) -> Result<Session, SessionStoreError> {
    Ok(Session {
        id: SessionId(field(&map, "id")?.to_string()),
        user_id: field(&map, "user_id")?
            .parse::<UserId>()
            .map_err(|e| SessionStoreError::Store(format!("bad user_id: {e}")))?,
        provider_refresh_token: field(&map, "provider_refresh_token")?.to_string(),
        is_revoked: field(&map, "is_revoked")? == "1",
        created_at: timestamp_field(&map, "created_at")?,
        expires_at: timestamp_field(&map, "expires_at")?,
    })
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, session: &Session) -> Result<(), SessionStoreError> {
        let key = self.session_key(&session.id);
        let mut conn = self.conn.clone();

        let user_id = session.user_id.to_string();
        let created_at = session.created_at.timestamp().to_string();
        let expires_at = session.expires_at.timestamp().to_string();

        // Record, TTL, and user index land in one atomic MULTI/EXEC: no
        // reader can observe the record without its expiry, or an indexed
        // id without its record.
        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(
                &key,
                &[
                    ("id", session.id.as_str()),
                    ("user_id", user_id.as_str()),
                    ("provider_refresh_token", session.provider_refresh_token.as_str()),
                    ("is_revoked", if session.is_revoked { "1" } else { "0" }),
                    ("created_at", created_at.as_str()),
                    ("expires_at", expires_at.as_str()),
                ],
            )
            .expire_at(&key, session.expires_at.timestamp())
            .sadd(self.user_key(session.user_id), session.id.as_str())
            .query_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Session, SessionStoreError> {
        let mut conn = self.conn.clone();
        let map: HashMap<String, String> = conn
            .hgetall(self.session_key(id))
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        if map.is_empty() {
            return Err(SessionStoreError::NotFound);
        }
        parse_session(map)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Session>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .smembers(self.user_key(user_id))
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hgetall(self.session_key(&SessionId(id.clone())));
        }
        let maps: Vec<HashMap<String, String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;

        let mut sessions = Vec::new();
        let mut stale = Vec::new();
        for (id, map) in ids.into_iter().zip(maps) {
            if map.is_empty() {
                stale.push(id);
            } else {
                sessions.push(parse_session(map)?);
            }
        }

        // Expired hashes leave dangling set members; prune them off the
        // request path, best effort.
        if !stale.is_empty() {
            let user_key = self.user_key(user_id);
            let mut conn = self.conn.clone();
            tokio::spawn(async move {
                let result: redis::RedisResult<()> = conn.srem(&user_key, &stale).await;
                if let Err(e) = result {
                    debug!("pruning stale session index entries failed: {e}");
                }
            });
        }

        Ok(sessions)
    }

    async fn revoke(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let status: i64 = Script::new(SESSION_REVOKE)
            .key(self.session_key(id))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;

        match status {
            1 => Ok(()),
            0 => Err(SessionStoreError::AlreadyRevoked),
            -1 => Err(SessionStoreError::NotFound),
            other => Err(SessionStoreError::Store(format!(
                "unknown revoke script status {other}"
            ))),
        }
    }

    async fn delete(&self, id: &SessionId) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        // The index entry is left for the lazy prune in find_by_user_id.
        let _: () = conn
            .del(self.session_key(id))
            .await
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        Ok(())
    }
}
