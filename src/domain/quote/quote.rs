//! Quote payloads.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProductId, QuoteId, Rupees, SessionId, Timestamp};

/// Unsigned quote payload for an agreed negotiation.
///
/// The canonical JSON form of this struct (sorted keys) is what gets
/// signed; adding a field is a signature-breaking change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: QuoteId,
    pub session_id: SessionId,
    pub product_id: ProductId,
    pub price: Rupees,
    pub currency: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Quote {
    /// Builds a quote for an agreed price, valid for `ttl_seconds`.
    pub fn issue(
        session_id: SessionId,
        product_id: ProductId,
        price: Rupees,
        ttl_seconds: u64,
        now: Timestamp,
    ) -> Self {
        Self {
            quote_id: QuoteId::new(),
            session_id,
            product_id,
            price,
            currency: "INR".to_string(),
            issued_at: now,
            expires_at: now.plus(std::time::Duration::from_secs(ttl_seconds)),
        }
    }

    /// An expired quote is not redeemable; the buyer renegotiates.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }
}

/// A quote with its HMAC signature attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedQuote {
    #[serde(flatten)]
    pub quote: Quote,
    /// Lowercase hex HMAC-SHA256 over the canonical quote JSON.
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_sets_expiry_from_ttl() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let q = Quote::issue(
            SessionId::new(),
            ProductId::new("p1").unwrap(),
            9800,
            60,
            now,
        );
        assert_eq!(q.currency, "INR");
        assert_eq!(q.expires_at.as_unix_secs() - q.issued_at.as_unix_secs(), 60);
        assert!(!q.is_expired(now));
        assert!(q.is_expired(now.plus(std::time::Duration::from_secs(61))));
    }
}
