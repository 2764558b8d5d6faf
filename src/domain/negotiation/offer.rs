//! Offers and the append-only offer history.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Rupees, Timestamp};

use super::Tactic;

/// Maximum stored length of a buyer message, in bytes.
pub const MAX_STORED_MESSAGE_BYTES: usize = 2048;

/// Who placed an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    Buyer,
    Seller,
}

impl Actor {
    /// Wire tag for this actor.
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Buyer => "buyer",
            Actor::Seller => "seller",
        }
    }
}

/// Timing and pattern deltas recorded with each offer, consumed by the
/// bot detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferFeatures {
    /// Milliseconds since the same actor's previous offer, if any.
    pub gap_ms: Option<i64>,
    /// Price movement relative to the same actor's previous offer.
    /// Positive means the buyer raised (or the seller dropped) their price.
    pub concession_delta: Rupees,
}

/// A single immutable entry in the offer history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub actor: Actor,
    pub price: Rupees,
    /// Sanitised free text; empty for most seller entries.
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tactic: Option<Tactic>,
    pub timestamp: Timestamp,
    pub round: u32,
    #[serde(default)]
    pub features: OfferFeatures,
}

impl Offer {
    /// Creates an offer, truncating the message to the storage cap on a
    /// char boundary.
    pub fn new(
        actor: Actor,
        price: Rupees,
        message: impl Into<String>,
        tactic: Option<Tactic>,
        timestamp: Timestamp,
        round: u32,
        features: OfferFeatures,
    ) -> Self {
        let mut message = message.into();
        if message.len() > MAX_STORED_MESSAGE_BYTES {
            let mut cut = MAX_STORED_MESSAGE_BYTES;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        Self {
            actor,
            price,
            message,
            tactic,
            timestamp,
            round,
            features,
        }
    }
}

/// Append-only sequence of offers for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferHistory {
    offers: Vec<Offer>,
}

impl OfferHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an offer. Entries are never mutated or removed.
    pub fn push(&mut self, offer: Offer) {
        self.offers.push(offer);
    }

    /// All offers in arrival order.
    pub fn as_slice(&self) -> &[Offer] {
        &self.offers
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Most recent buyer offer, if any.
    pub fn last_buyer(&self) -> Option<&Offer> {
        self.offers.iter().rev().find(|o| o.actor == Actor::Buyer)
    }

    /// Most recent seller offer, if any.
    pub fn last_seller(&self) -> Option<&Offer> {
        self.offers.iter().rev().find(|o| o.actor == Actor::Seller)
    }

    /// Buyer offers in arrival order.
    pub fn buyer_offers(&self) -> impl Iterator<Item = &Offer> {
        self.offers.iter().filter(|o| o.actor == Actor::Buyer)
    }

    /// Per-round buyer concession deltas (positive = buyer moved up).
    pub fn buyer_deltas(&self) -> Vec<Rupees> {
        let prices: Vec<Rupees> = self.buyer_offers().map(|o| o.price).collect();
        prices.windows(2).map(|w| w[1] - w[0]).collect()
    }
}
