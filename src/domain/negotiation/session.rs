//! The negotiation session aggregate.
//!
//! A session is a value: it is loaded from the hot tier, mutated under the
//! per-session lock, and written back whole. All invariants are enforced
//! here so no storage tier can observe an inconsistent snapshot:
//!
//! - `floor_price <= current_price <= anchor_price` at all times
//! - seller prices are monotonically non-increasing
//! - `round` advances by exactly 1 per accepted buyer offer
//! - terminal states are absorbing
//! - the offer list is append-only

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::catalog::Product;
use crate::domain::foundation::{
    DomainError, ProductId, Rupees, SessionId, SessionToken, StateMachine, Timestamp,
};

use super::{
    Actor, Language, NegotiationState, Offer, OfferFeatures, OfferHistory, Sentiment, Tactic,
};

/// Tunables fixed at session start.
#[derive(Debug, Clone, Copy)]
pub struct SessionParams {
    /// Concession curve exponent (>1 Boulware, 1 linear, <1 conceder).
    pub beta: f64,
    /// Reciprocity damping factor in (0, 1).
    pub alpha: f64,
    /// Round budget T.
    pub max_rounds: u32,
    /// Hot-tier lifetime; refreshed on every accepted offer.
    pub ttl: Duration,
    /// Lifetime of a quote issued on agreement.
    pub quote_ttl_seconds: u64,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            beta: 5.0,
            alpha: 0.6,
            max_rounds: 15,
            ttl: Duration::from_secs(300),
            quote_ttl_seconds: 60,
        }
    }
}

/// One buyer-seller haggling session over a single product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationSession {
    pub session_id: SessionId,
    pub session_token: SessionToken,
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub product_category: String,
    pub buyer_ref: String,
    #[serde(default)]
    pub language: Language,

    pub anchor_price: Rupees,
    pub floor_price: Rupees,
    pub current_price: Rupees,
    #[serde(default)]
    pub last_buyer_price: Option<Rupees>,

    pub round: u32,
    pub max_rounds: u32,
    pub state: NegotiationState,
    pub tactic: Tactic,
    #[serde(default)]
    pub sentiment: Sentiment,

    pub beta: f64,
    pub alpha: f64,
    #[serde(default)]
    pub offers: OfferHistory,
    #[serde(default)]
    pub bot_score: f64,
    #[serde(default)]
    pub flounce_used: bool,
    #[serde(default)]
    pub coupons_applied: Vec<String>,
    #[serde(default)]
    pub degraded: bool,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub expires_at: Timestamp,
    #[serde(default)]
    pub agreed_price: Option<Rupees>,
    pub quote_ttl_seconds: u64,
}

impl NegotiationSession {
    /// Starts a session: seller opens at the anchor price.
    pub fn start(
        product: &Product,
        buyer_ref: impl Into<String>,
        language: Language,
        params: SessionParams,
        now: Timestamp,
    ) -> Self {
        let mut offers = OfferHistory::new();
        offers.push(Offer::new(
            Actor::Seller,
            product.anchor_price,
            "",
            Some(Tactic::OpeningAnchor),
            now,
            0,
            OfferFeatures::default(),
        ));

        Self {
            session_id: SessionId::new(),
            session_token: SessionToken::issue(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            product_category: product.category.clone(),
            buyer_ref: buyer_ref.into(),
            language,
            anchor_price: product.anchor_price,
            floor_price: product.floor_price(),
            current_price: product.anchor_price,
            last_buyer_price: None,
            round: 0,
            max_rounds: params.max_rounds,
            state: NegotiationState::Proposing,
            tactic: Tactic::OpeningAnchor,
            sentiment: Sentiment::Neutral,
            beta: params.beta,
            alpha: params.alpha,
            offers,
            bot_score: 0.0,
            flounce_used: false,
            coupons_applied: Vec::new(),
            degraded: false,
            created_at: now,
            updated_at: now,
            expires_at: now.plus(params.ttl),
            agreed_price: None,
            quote_ttl_seconds: params.quote_ttl_seconds,
        }
    }

    /// True once the session reached agreed, broken, or timed_out.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// True once the session TTL elapsed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }

    /// Normalised progress through the round budget, 0.0 at start and
    /// 1.0 at the deadline.
    pub fn relative_time(&self) -> f64 {
        if self.max_rounds == 0 {
            return 1.0;
        }
        (self.round as f64 / self.max_rounds as f64).clamp(0.0, 1.0)
    }

    /// Records an incoming buyer offer, advancing the round by exactly one.
    pub fn record_buyer_offer(
        &mut self,
        price: Rupees,
        message: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;

        let features = OfferFeatures {
            gap_ms: self
                .offers
                .last_buyer()
                .map(|prev| now.millis_since(&prev.timestamp)),
            concession_delta: self
                .last_buyer_price
                .map(|prev| price - prev)
                .unwrap_or_default(),
        };

        self.round += 1;
        self.offers.push(Offer::new(
            Actor::Buyer,
            price,
            message,
            None,
            now,
            self.round,
            features,
        ));
        self.last_buyer_price = Some(price);
        if self.state == NegotiationState::Proposing {
            self.state = self.state.transition_to(NegotiationState::Responding)?;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Applies the seller's counter for the current round.
    ///
    /// The price must already have passed the validation gate; this method
    /// still refuses anything that would break the floor/anchor band or
    /// seller monotonicity.
    pub fn apply_counter(
        &mut self,
        price: Rupees,
        tactic: Tactic,
        sentiment: Sentiment,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        if price < self.floor_price || price > self.anchor_price {
            return Err(DomainError::internal(format!(
                "counter {} outside [{}, {}]",
                price, self.floor_price, self.anchor_price
            )));
        }
        if price > self.current_price {
            return Err(DomainError::internal(format!(
                "counter {} above previous seller price {}",
                price, self.current_price
            )));
        }

        let delta = self.current_price - price;
        self.offers.push(Offer::new(
            Actor::Seller,
            price,
            "",
            Some(tactic),
            now,
            self.round,
            OfferFeatures {
                gap_ms: None,
                concession_delta: delta,
            },
        ));
        self.current_price = price;
        self.tactic = tactic;
        self.sentiment = sentiment;
        self.state = self.state.transition_to(NegotiationState::Responding)?;
        self.updated_at = now;
        Ok(())
    }

    /// Freezes the deal at the buyer's price.
    ///
    /// The closing entry is still a seller offer, so it obeys the same
    /// ceiling as `apply_counter`: a buyer bidding above the last counter
    /// (or the anchor) closes at that counter, never above it. The
    /// agreed price, the quoted price, and the final `current_price` are
    /// all the same number.
    pub fn accept(&mut self, buyer_price: Rupees, now: Timestamp) -> Result<Rupees, DomainError> {
        self.ensure_open()?;
        let agreed = buyer_price
            .min(self.anchor_price)
            .min(self.current_price)
            .max(self.floor_price);
        self.offers.push(Offer::new(
            Actor::Seller,
            agreed,
            "",
            Some(Tactic::Accept),
            now,
            self.round,
            OfferFeatures::default(),
        ));
        self.agreed_price = Some(agreed);
        self.current_price = agreed;
        self.tactic = Tactic::Accept;
        self.state = self.state.transition_to(NegotiationState::Agreed)?;
        self.updated_at = now;
        Ok(agreed)
    }

    /// Breaks the session (bot block or deadline).
    pub fn break_off(&mut self, tactic: Tactic, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.tactic = tactic;
        self.state = self.state.transition_to(NegotiationState::Broken)?;
        self.updated_at = now;
        Ok(())
    }

    /// Times the session out after TTL expiry.
    pub fn time_out(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.tactic = Tactic::Timeout;
        self.state = self.state.transition_to(NegotiationState::TimedOut)?;
        self.updated_at = now;
        Ok(())
    }

    /// Consumes the one-shot walk-away concession.
    pub fn mark_flounce_used(&mut self) {
        self.flounce_used = true;
    }

    /// Records an applied invisible coupon.
    pub fn record_coupon(&mut self, coupon_id: impl Into<String>) {
        self.coupons_applied.push(coupon_id.into());
    }

    /// Flags the session as audit-incomplete after durable write failures.
    pub fn mark_degraded(&mut self) {
        self.degraded = true;
    }

    /// Extends the hot-tier lifetime after an accepted offer.
    pub fn refresh_expiry(&mut self, ttl: Duration, now: Timestamp) {
        self.expires_at = now.plus(ttl);
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.is_terminal() {
            return Err(DomainError::session_closed(self.state.as_str()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ProductId;
    use std::collections::HashMap;

    fn product() -> Product {
        Product::new(
            ProductId::new("p1").unwrap(),
            "Jaipuri razai",
            "home",
            12999,
            9000,
            0.05,
            0.30,
            HashMap::new(),
        )
        .unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    fn session() -> NegotiationSession {
        NegotiationSession::start(&product(), "203.0.113.7", Language::En, SessionParams::default(), now())
    }

    #[test]
    fn start_opens_at_anchor_in_proposing() {
        let s = session();
        assert_eq!(s.state, NegotiationState::Proposing);
        assert_eq!(s.round, 0);
        assert_eq!(s.current_price, 12999);
        assert_eq!(s.floor_price, 9450);
        assert_eq!(s.offers.len(), 1);
        assert_eq!(s.offers.last_seller().unwrap().price, 12999);
    }

    #[test]
    fn buyer_offer_advances_round_by_one() {
        let mut s = session();
        s.record_buyer_offer(9000, "kitna?", now()).unwrap();
        assert_eq!(s.round, 1);
        assert_eq!(s.state, NegotiationState::Responding);
        assert_eq!(s.last_buyer_price, Some(9000));

        s.record_buyer_offer(9200, "", now()).unwrap();
        assert_eq!(s.round, 2);
        assert_eq!(
            s.offers.last_buyer().unwrap().features.concession_delta,
            200
        );
    }

    #[test]
    fn counter_must_stay_in_band_and_monotone() {
        let mut s = session();
        s.record_buyer_offer(9000, "", now()).unwrap();
        s.apply_counter(12500, Tactic::Concession, Sentiment::Firm, now())
            .unwrap();
        assert_eq!(s.current_price, 12500);

        // Raising the price again is rejected.
        assert!(s
            .apply_counter(12600, Tactic::Concession, Sentiment::Firm, now())
            .is_err());
        // Below floor is rejected.
        assert!(s
            .apply_counter(9000, Tactic::Concession, Sentiment::Firm, now())
            .is_err());
        assert_eq!(s.current_price, 12500);
    }

    #[test]
    fn accept_caps_at_anchor_and_freezes() {
        let mut s = session();
        s.record_buyer_offer(14000, "take my money", now()).unwrap();
        let agreed = s.accept(14000, now()).unwrap();
        assert_eq!(agreed, 12999);
        assert_eq!(s.state, NegotiationState::Agreed);
        assert_eq!(s.agreed_price, Some(12999));
        assert_eq!(s.current_price, 12999);
    }

    #[test]
    fn accept_never_exceeds_the_last_counter() {
        let mut s = session();
        s.record_buyer_offer(9000, "", now()).unwrap();
        s.apply_counter(12500, Tactic::Concession, Sentiment::Firm, now())
            .unwrap();
        let prior_seller = s.offers.last_seller().unwrap().price;

        // Buyer jumps above the last counter but below the anchor.
        s.record_buyer_offer(12800, "", now()).unwrap();
        let agreed = s.accept(12800, now()).unwrap();

        assert_eq!(agreed, 12500);
        assert_eq!(s.agreed_price, Some(12500));
        // The published, agreed, and quoted prices are one number.
        assert_eq!(s.current_price, 12500);
        // The closing seller offer obeys monotonicity in the history too.
        let closing = s.offers.last_seller().unwrap();
        assert_eq!(closing.tactic, Some(Tactic::Accept));
        assert!(closing.price <= prior_seller);
    }

    #[test]
    fn terminal_states_reject_all_mutation() {
        let mut s = session();
        s.record_buyer_offer(12999, "", now()).unwrap();
        s.accept(12999, now()).unwrap();

        let offers_before = s.offers.len();
        assert!(s.record_buyer_offer(13000, "", now()).is_err());
        assert!(s
            .apply_counter(12000, Tactic::Concession, Sentiment::Firm, now())
            .is_err());
        assert!(s.break_off(Tactic::BotBlock, now()).is_err());
        assert!(s.time_out(now()).is_err());
        assert_eq!(s.offers.len(), offers_before);
        assert_eq!(s.agreed_price, Some(12999));
    }

    #[test]
    fn expiry_tracks_refreshes() {
        let mut s = session();
        assert!(!s.is_expired(now()));
        assert!(s.is_expired(now().plus(Duration::from_secs(301))));
        s.refresh_expiry(Duration::from_secs(300), now().plus(Duration::from_secs(200)));
        assert!(!s.is_expired(now().plus(Duration::from_secs(301))));
    }

    #[test]
    fn relative_time_spans_zero_to_one() {
        let mut s = session();
        assert_eq!(s.relative_time(), 0.0);
        for price in [9000, 9100, 9200] {
            s.record_buyer_offer(price, "", now()).unwrap();
        }
        assert!((s.relative_time() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut s = session();
        s.record_buyer_offer(9000, "chalo", now()).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let back: NegotiationSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.session_id, s.session_id);
        assert_eq!(back.round, 1);
        assert_eq!(back.current_price, s.current_price);
        assert!(back.session_token.matches(s.session_token.expose()));
    }
}
