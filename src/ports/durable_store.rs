//! Durable tier port - append-only audit history.
//!
//! Writes are append-only and idempotent on `(session_id, round, actor)`;
//! the session summary is written once, on terminal state. A durable
//! outage must never take active play down - the orchestrator degrades
//! and keeps serving from the hot tier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ProductId, Rupees, SessionId, Timestamp};
use crate::domain::negotiation::{Actor, NegotiationSession, NegotiationState, Offer, Tactic};

/// One immutable offer event row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferEvent {
    pub session_id: SessionId,
    pub buyer_ref: String,
    pub round: u32,
    pub actor: Actor,
    pub price: Rupees,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tactic: Option<Tactic>,
    pub bot_score: f64,
    pub timestamp: Timestamp,
}

impl OfferEvent {
    /// Builds the event row for an offer in a session.
    pub fn from_offer(session: &NegotiationSession, offer: &Offer) -> Self {
        Self {
            session_id: session.session_id,
            buyer_ref: session.buyer_ref.clone(),
            round: offer.round,
            actor: offer.actor,
            price: offer.price,
            message: offer.message.clone(),
            tactic: offer.tactic,
            bot_score: session.bot_score,
            timestamp: offer.timestamp,
        }
    }
}

/// Final session summary, written once when a session closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub product_id: ProductId,
    pub buyer_ref: String,
    pub state: NegotiationState,
    pub rounds: u32,
    #[serde(default)]
    pub agreed_price: Option<Rupees>,
    pub bot_score: f64,
    /// True when one or more offer events failed to persist.
    pub degraded: bool,
    pub created_at: Timestamp,
    pub closed_at: Timestamp,
}

impl SessionSummary {
    /// Builds the summary for a terminal session.
    pub fn from_session(session: &NegotiationSession, closed_at: Timestamp) -> Self {
        Self {
            session_id: session.session_id,
            product_id: session.product_id.clone(),
            buyer_ref: session.buyer_ref.clone(),
            state: session.state,
            rounds: session.round,
            agreed_price: session.agreed_price,
            bot_score: session.bot_score,
            degraded: session.degraded,
            created_at: session.created_at,
            closed_at,
        }
    }
}

/// Document store for the audit trail.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Appends an offer event. Replaying the same `(session_id, round,
    /// actor)` is a no-op, which is what makes orchestrator retries safe.
    async fn append_offer_event(&self, event: &OfferEvent) -> Result<(), DomainError>;

    /// Writes the final summary. Only the first write for a session id
    /// takes effect.
    async fn write_summary(&self, summary: &SessionSummary) -> Result<(), DomainError>;

    /// Loads a session summary, if the session has closed.
    async fn load_summary(&self, id: &SessionId) -> Result<Option<SessionSummary>, DomainError>;

    /// Lists a session's offer events ordered by round.
    async fn list_events(&self, id: &SessionId) -> Result<Vec<OfferEvent>, DomainError>;
}
