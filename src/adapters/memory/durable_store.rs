//! In-memory durable store for tests and single-node development.
//!
//! Mirrors the PostgreSQL tier's semantics: append-only events with
//! idempotency on `(session_id, round, actor)` and write-once summaries.
//! A failure toggle lets tests drive the degraded path.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::negotiation::Actor;
use crate::ports::{DurableStore, OfferEvent, SessionSummary};

#[derive(Debug, Default)]
struct DurableState {
    events: Vec<OfferEvent>,
    seen: HashSet<(SessionId, u32, Actor)>,
    summaries: HashMap<SessionId, SessionSummary>,
}

/// In-memory implementation of [`DurableStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryDurableStore {
    state: Arc<Mutex<DurableState>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, for degraded-path tests.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::degraded("durable store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn append_offer_event(&self, event: &OfferEvent) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let key = (event.session_id, event.round, event.actor);
        if state.seen.contains(&key) {
            return Ok(());
        }
        state.seen.insert(key);
        state.events.push(event.clone());
        Ok(())
    }

    async fn write_summary(&self, summary: &SessionSummary) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        state
            .summaries
            .entry(summary.session_id)
            .or_insert_with(|| summary.clone());
        Ok(())
    }

    async fn load_summary(&self, id: &SessionId) -> Result<Option<SessionSummary>, DomainError> {
        Ok(self.state.lock().await.summaries.get(id).cloned())
    }

    async fn list_events(&self, id: &SessionId) -> Result<Vec<OfferEvent>, DomainError> {
        let state = self.state.lock().await;
        let mut events: Vec<OfferEvent> = state
            .events
            .iter()
            .filter(|e| e.session_id == *id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.round);
        Ok(events)
    }
}
