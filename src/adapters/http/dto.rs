//! HTTP DTOs for the negotiation API.
//!
//! These types decouple the wire format from domain types. Buyer-facing
//! responses never carry cost, margin, or floor data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::application::SessionReply;
use crate::domain::catalog::Product;
use crate::domain::foundation::{DomainError, ProductId, Rupees};
use crate::domain::negotiation::{NegotiationState, Sentiment, Tactic};

// ════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════

/// Body of `POST /negotiate/start`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    pub product_id: String,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Body of `POST /negotiate/{session_id}/offer`.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferBody {
    pub price: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Optional echo of the round this offer answers; a stale echo gets
    /// `out_of_order` instead of silently consuming a round.
    #[serde(default)]
    pub round: Option<u32>,
}

/// Body of `POST /products` (admin).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub anchor_price: Rupees,
    pub cost_price: Rupees,
    pub min_margin: f64,
    pub target_margin: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CreateProductRequest {
    /// Validates into a domain product.
    pub fn into_product(self) -> Result<Product, DomainError> {
        let id = ProductId::new(self.id)?;
        Ok(Product::new(
            id,
            self.name,
            self.category,
            self.anchor_price,
            self.cost_price,
            self.min_margin,
            self.target_margin,
            self.metadata.into_iter().collect(),
        )?)
    }
}

// ════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════

/// The session_response wire object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub session_token: String,
    pub message: String,
    pub current_price: Rupees,
    pub anchor_price: Rupees,
    pub state: NegotiationState,
    pub tactic: Tactic,
    pub sentiment: Sentiment,
    pub round: u32,
    pub max_rounds: u32,
    pub quote_ttl_seconds: u64,
    pub agreed_price: Option<Rupees>,
    pub metadata: Map<String, Value>,
}

impl From<SessionReply> for SessionResponse {
    fn from(reply: SessionReply) -> Self {
        Self {
            session_id: reply.session_id,
            session_token: reply.session_token,
            message: reply.message,
            current_price: reply.current_price,
            anchor_price: reply.anchor_price,
            state: reply.state,
            tactic: reply.tactic,
            sentiment: reply.sentiment,
            round: reply.round,
            max_rounds: reply.max_rounds,
            quote_ttl_seconds: reply.quote_ttl_seconds,
            agreed_price: reply.agreed_price,
            metadata: reply.metadata,
        }
    }
}

/// Admin view of a product. Carries cost and margins; only ever behind
/// the admin key.
#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub category: String,
    pub anchor_price: Rupees,
    pub cost_price: Rupees,
    pub min_margin: f64,
    pub target_margin: f64,
    pub metadata: Map<String, Value>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name,
            category: p.category,
            anchor_price: p.anchor_price,
            cost_price: p.cost_price,
            min_margin: p.min_margin,
            target_margin: p.target_margin,
            metadata: p.metadata.into_iter().collect(),
        }
    }
}

/// One entry of the negotiation history. Bot scores and other detector
/// internals stay server-side.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub round: u32,
    pub actor: String,
    pub price: Rupees,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tactic: Option<Tactic>,
    pub timestamp: crate::domain::foundation::Timestamp,
}

impl From<crate::ports::OfferEvent> for HistoryEntry {
    fn from(event: crate::ports::OfferEvent) -> Self {
        Self {
            round: event.round,
            actor: event.actor.as_str().to_string(),
            price: event.price,
            message: event.message,
            tactic: event.tactic,
            timestamp: event.timestamp,
        }
    }
}

/// Wire error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: code.into(),
            message: message.into(),
        }
    }
}
