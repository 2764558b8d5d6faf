//! Deterministic price validation gate.
//!
//! Final gate between any proposed counter price and the session state.
//! Whatever the curve, the reciprocity mirror, a coupon, or the LLM
//! suggested, the price that reaches the buyer passed through here.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorKind, Rupees};

/// Outcome of validating a candidate counter price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPrice {
    /// The clamped, safe-to-publish price.
    pub price: Rupees,
    /// True when any clamp fired.
    pub overridden: bool,
    /// Human-readable clamp reasons, for audit logs and metadata.
    pub reasons: Vec<String>,
}

/// Bounds a candidate price must respect.
#[derive(Debug, Clone, Copy)]
pub struct PriceBounds {
    pub floor: Rupees,
    pub anchor: Rupees,
    /// The seller's previous counter; monotonicity ceiling.
    pub previous_seller_price: Rupees,
    /// The engine's last deterministic candidate, used as the recovery
    /// value when a proposal lands below the floor.
    pub last_candidate: Option<Rupees>,
}

/// Validates a proposed counter price against the session bounds.
///
/// Non-finite, zero, or negative proposals are rejected outright; the
/// caller retries with a deterministic price. Everything else is clamped:
/// below floor recovers to `max(floor, last_candidate)`, above anchor
/// clamps to anchor, and a price above the previous seller counter clamps
/// back down to preserve monotonicity.
pub fn validate_price(proposed: f64, bounds: &PriceBounds) -> Result<ValidatedPrice, DomainError> {
    if !proposed.is_finite() || proposed <= 0.0 {
        return Err(DomainError::new(
            ErrorKind::ValidationFailed,
            format!("proposed price {} is not a positive finite number", proposed),
        ));
    }

    let mut price = proposed.round() as Rupees;
    let mut reasons = Vec::new();

    if price < bounds.floor {
        let recovered = bounds.last_candidate.unwrap_or(bounds.floor).max(bounds.floor);
        reasons.push(format!(
            "proposed {} below floor; raised to {}",
            price, recovered
        ));
        price = recovered;
    }
    if price > bounds.anchor {
        reasons.push(format!(
            "proposed {} above anchor; clamped to {}",
            price, bounds.anchor
        ));
        price = bounds.anchor;
    }
    if price > bounds.previous_seller_price {
        reasons.push(format!(
            "proposed {} above previous counter; clamped to {}",
            price, bounds.previous_seller_price
        ));
        price = bounds.previous_seller_price;
    }

    Ok(ValidatedPrice {
        price,
        overridden: !reasons.is_empty(),
        reasons,
    })
}
