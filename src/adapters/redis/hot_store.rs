//! Redis-backed hot tier for production deployments.
//!
//! Key layout:
//! - `session:{id}`       serialized snapshot, TTL-bound
//! - `lock:session:{id}`  per-session mutex with lease and fencing token
//! - `cooldown:session:{id}` existence key with millisecond TTL
//! - `start_rate:{ip}`    fixed-window counter (INCR + EXPIRE)
//!
//! Lock acquisition is a single SET NX PX with a random token; release
//! runs a compare-and-delete script so only the holder can free it.
//! Every operation runs under the hot-tier deadline.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::negotiation::NegotiationSession;
use crate::ports::{HotStore, LockToken};

/// Compare-and-delete: release the lock only when the token matches.
const RELEASE_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
"#;

/// Redis implementation of [`HotStore`].
#[derive(Clone)]
pub struct RedisHotStore {
    conn: MultiplexedConnection,
    op_timeout: Duration,
}

impl RedisHotStore {
    /// Creates the store over an established multiplexed connection.
    pub fn new(conn: MultiplexedConnection, op_timeout: Duration) -> Self {
        Self { conn, op_timeout }
    }

    fn session_key(id: &SessionId) -> String {
        format!("session:{}", id)
    }

    fn lock_key(id: &SessionId) -> String {
        format!("lock:session:{}", id)
    }

    fn cooldown_key(id: &SessionId) -> String {
        format!("cooldown:session:{}", id)
    }

    fn rate_key(ip: &str) -> String {
        format!("start_rate:{}", ip)
    }

    /// Runs a hot-tier operation under the configured deadline.
    async fn bounded<T, F>(&self, op: F) -> Result<T, DomainError>
    where
        F: std::future::Future<Output = Result<T, redis::RedisError>>,
    {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DomainError::degraded(format!("hot store error: {}", e))),
            Err(_) => Err(DomainError::degraded(format!(
                "hot store deadline of {:?} exceeded",
                self.op_timeout
            ))),
        }
    }
}

#[async_trait]
impl HotStore for RedisHotStore {
    async fn put_session(
        &self,
        session: &NegotiationSession,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        let payload = serde_json::to_string(session)
            .map_err(|e| DomainError::internal(format!("session serialize: {}", e)))?;
        let key = Self::session_key(&session.session_id);
        let mut conn = self.conn.clone();
        self.bounded(async move {
            conn.set_ex::<_, _, ()>(&key, payload, ttl.as_secs().max(1))
                .await
        })
        .await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<NegotiationSession>, DomainError> {
        let key = Self::session_key(id);
        let mut conn = self.conn.clone();
        let raw: Option<String> = self.bounded(async move { conn.get(&key).await }).await?;
        match raw {
            Some(json) => {
                let session = serde_json::from_str(&json).map_err(|e| {
                    DomainError::internal(format!("corrupt session snapshot: {}", e))
                })?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), DomainError> {
        let key = Self::session_key(id);
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.del::<_, ()>(&key).await })
            .await
    }

    async fn acquire_lock(
        &self,
        id: &SessionId,
        lease: Duration,
    ) -> Result<Option<LockToken>, DomainError> {
        let key = Self::lock_key(id);
        let token = Uuid::new_v4().simple().to_string();
        let mut conn = self.conn.clone();
        let token_arg = token.clone();
        let acquired: bool = self
            .bounded(async move {
                redis::cmd("SET")
                    .arg(&key)
                    .arg(&token_arg)
                    .arg("NX")
                    .arg("PX")
                    .arg(lease.as_millis() as u64)
                    .query_async::<_, Option<String>>(&mut conn)
                    .await
                    .map(|reply| reply.is_some())
            })
            .await?;
        Ok(acquired.then_some(LockToken(token)))
    }

    async fn release_lock(&self, id: &SessionId, token: &LockToken) -> Result<bool, DomainError> {
        let key = Self::lock_key(id);
        let mut conn = self.conn.clone();
        let token = token.0.clone();
        let released: i64 = self
            .bounded(async move {
                Script::new(RELEASE_SCRIPT)
                    .key(&key)
                    .arg(&token)
                    .invoke_async(&mut conn)
                    .await
            })
            .await?;
        Ok(released == 1)
    }

    async fn in_cooldown(&self, id: &SessionId) -> Result<bool, DomainError> {
        let key = Self::cooldown_key(id);
        let mut conn = self.conn.clone();
        self.bounded(async move { conn.exists(&key).await }).await
    }

    async fn set_cooldown(&self, id: &SessionId, window: Duration) -> Result<(), DomainError> {
        let key = Self::cooldown_key(id);
        let mut conn = self.conn.clone();
        self.bounded(async move {
            redis::cmd("SET")
                .arg(&key)
                .arg("1")
                .arg("PX")
                .arg(window.as_millis() as u64)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn incr_start_rate(&self, ip: &str, window: Duration) -> Result<u64, DomainError> {
        let key = Self::rate_key(ip);
        let mut conn = self.conn.clone();
        let window_secs = window.as_secs().max(1) as i64;
        self.bounded(async move {
            let count: i64 = conn.incr(&key, 1_i64).await?;
            // First request in the window starts the expiry clock.
            if count == 1 {
                conn.expire::<_, ()>(&key, window_secs).await?;
            }
            Ok(count as u64)
        })
        .await
    }
}

impl std::fmt::Debug for RedisHotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisHotStore")
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}
