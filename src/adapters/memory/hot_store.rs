//! In-memory hot store for tests and single-node development.
//!
//! Honours the same contract as the Redis tier: TTL expiry, fenced lock
//! acquisition, token-verified release, fixed-window rate counters.
//! Not suitable for multi-server deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::negotiation::NegotiationSession;
use crate::ports::{HotStore, LockToken};

#[derive(Debug, Default)]
struct HotState {
    sessions: HashMap<SessionId, (NegotiationSession, Instant)>,
    locks: HashMap<SessionId, (String, Instant)>,
    cooldowns: HashMap<SessionId, Instant>,
    rate_windows: HashMap<String, (u64, Instant)>,
}

/// In-memory implementation of [`HotStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryHotStore {
    state: Arc<Mutex<HotState>>,
}

impl InMemoryHotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HotStore for InMemoryHotStore {
    async fn put_session(
        &self,
        session: &NegotiationSession,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state
            .sessions
            .insert(session.session_id, (session.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<NegotiationSession>, DomainError> {
        let mut state = self.state.lock().await;
        match state.sessions.get(id) {
            Some((session, expiry)) if *expiry > Instant::now() => Ok(Some(session.clone())),
            Some(_) => {
                state.sessions.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), DomainError> {
        self.state.lock().await.sessions.remove(id);
        Ok(())
    }

    async fn acquire_lock(
        &self,
        id: &SessionId,
        lease: Duration,
    ) -> Result<Option<LockToken>, DomainError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        if let Some((_, expiry)) = state.locks.get(id) {
            if *expiry > now {
                return Ok(None);
            }
        }
        let token = Uuid::new_v4().simple().to_string();
        state.locks.insert(*id, (token.clone(), now + lease));
        Ok(Some(LockToken(token)))
    }

    async fn release_lock(&self, id: &SessionId, token: &LockToken) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        match state.locks.get(id) {
            Some((owner, _)) if *owner == token.0 => {
                state.locks.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn in_cooldown(&self, id: &SessionId) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        match state.cooldowns.get(id) {
            Some(expiry) if *expiry > Instant::now() => Ok(true),
            Some(_) => {
                state.cooldowns.remove(id);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn set_cooldown(&self, id: &SessionId, window: Duration) -> Result<(), DomainError> {
        self.state
            .lock()
            .await
            .cooldowns
            .insert(*id, Instant::now() + window);
        Ok(())
    }

    async fn incr_start_rate(&self, ip: &str, window: Duration) -> Result<u64, DomainError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let entry = state
            .rate_windows
            .entry(ip.to_string())
            .or_insert((0, now + window));
        if entry.1 <= now {
            *entry = (0, now + window);
        }
        entry.0 += 1;
        Ok(entry.0)
    }
}
