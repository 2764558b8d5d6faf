//! Hot tier port - TTL-bound session state, locks, cooldowns, rate counters.
//!
//! The hot tier is the source of truth for active play. Implementations
//! must honour the contract, not the technology: write-if-absent lock
//! acquisition with a fencing token, token-verified release, and TTL
//! expiry on every key.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::negotiation::NegotiationSession;

/// Fencing token proving lock ownership. Release is a no-op unless the
/// stored token matches, so a crashed holder's lease cannot be freed by
/// a stranger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(pub String);

/// TTL-bound key-value tier for active sessions.
#[async_trait]
pub trait HotStore: Send + Sync {
    /// Writes the session snapshot under `session:{id}` with the given TTL.
    async fn put_session(
        &self,
        session: &NegotiationSession,
        ttl: Duration,
    ) -> Result<(), DomainError>;

    /// Reads the snapshot, `None` once the TTL elapsed.
    async fn get_session(&self, id: &SessionId) -> Result<Option<NegotiationSession>, DomainError>;

    /// Removes the snapshot.
    async fn delete_session(&self, id: &SessionId) -> Result<(), DomainError>;

    /// Single-write-if-absent acquisition of `lock:session:{id}` with a
    /// lease. `None` means another writer holds the lock.
    async fn acquire_lock(
        &self,
        id: &SessionId,
        lease: Duration,
    ) -> Result<Option<LockToken>, DomainError>;

    /// Releases the lock only if `token` still owns it. Returns whether
    /// a release happened.
    async fn release_lock(&self, id: &SessionId, token: &LockToken) -> Result<bool, DomainError>;

    /// Whether `cooldown:session:{id}` currently exists.
    async fn in_cooldown(&self, id: &SessionId) -> Result<bool, DomainError>;

    /// Sets the cooldown key with a millisecond TTL.
    async fn set_cooldown(&self, id: &SessionId, window: Duration) -> Result<(), DomainError>;

    /// Atomically increments `start_rate:{ip}`, creating it with the
    /// window TTL on first use. Returns the count after increment.
    async fn incr_start_rate(&self, ip: &str, window: Duration) -> Result<u64, DomainError>;
}
