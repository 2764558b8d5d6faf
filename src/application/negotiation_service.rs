//! Central negotiation orchestrator.
//!
//! Binds together bot detection, exit-intent sentiment, the SAO engine,
//! the validation gate, invisible coupons, dialogue generation, and the
//! two storage tiers. One `offer` round runs:
//!
//! load -> verify token -> cooldown -> lock -> reload -> detect ->
//! decide -> validate -> coupon -> apply -> dialogue -> persist ->
//! cooldown -> unlock
//!
//! The per-session lock makes each session single-writer; contending
//! requests see `busy` without blocking. The hot tier is the source of
//! truth for active play; durable writes degrade, they never block.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::detection::{detect_exit_intent, BotDetector};
use crate::domain::foundation::{
    DomainError, ProductId, Rupees, SessionId, SessionToken, Timestamp,
};
use crate::domain::negotiation::{
    decide, Language, NegotiationSession, NegotiationState, SessionParams, Tactic, TurnDecision,
    TurnInput,
};
use crate::domain::pricing::{validate_price, PriceBounds};
use crate::domain::quote::{Quote, QuoteSigner};
use crate::ports::{DurableStore, HotStore, LockToken, OfferEvent, ProductCatalog, SessionSummary};

use super::coupon_service::CouponService;
use super::dialogue::{sanitize_buyer_message, DialogueGenerator, DialogueOutput, SanitizedMessage};

/// Start-rate window width.
const START_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Base delay between durable write retries.
const DURABLE_RETRY_BASE: Duration = Duration::from_millis(25);

/// Orchestrator tunables, fixed at boot.
#[derive(Debug, Clone)]
pub struct NegotiationConfig {
    pub params: SessionParams,
    /// ZOPA tolerance as a fraction of the anchor.
    pub epsilon_pct: f64,
    /// Per-session cooldown between offers.
    pub cooldown: Duration,
    /// Per-session lock lease.
    pub lock_lease: Duration,
    /// Allowed `start` calls per buyer per minute.
    pub start_rate_limit: u64,
    /// Durable write attempts before degrading.
    pub durable_retries: u32,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            params: SessionParams::default(),
            epsilon_pct: 0.01,
            cooldown: Duration::from_millis(2000),
            lock_lease: Duration::from_secs(5),
            start_rate_limit: 30,
            durable_retries: 3,
        }
    }
}

/// One buyer offer, already shape-checked by the transport layer.
#[derive(Debug, Clone)]
pub struct OfferRequest {
    pub session_id: String,
    pub token: String,
    pub price: f64,
    pub message: String,
    /// Switches the response language for the rest of the session.
    pub language: Option<Language>,
    /// Client echo of the round it believes it is answering; enables
    /// out-of-order retry detection.
    pub round: Option<u32>,
}

/// The session response returned by every operation.
#[derive(Debug, Clone)]
pub struct SessionReply {
    pub session_id: String,
    pub session_token: String,
    pub message: String,
    pub current_price: Rupees,
    pub anchor_price: Rupees,
    pub state: NegotiationState,
    pub tactic: Tactic,
    pub sentiment: crate::domain::negotiation::Sentiment,
    pub round: u32,
    pub max_rounds: u32,
    pub quote_ttl_seconds: u64,
    pub agreed_price: Option<Rupees>,
    pub metadata: Map<String, Value>,
}

impl SessionReply {
    fn from_session(session: &NegotiationSession, message: String, metadata: Map<String, Value>) -> Self {
        Self {
            session_id: session.session_id.to_string(),
            session_token: session.session_token.expose().to_string(),
            message,
            current_price: session.current_price,
            anchor_price: session.anchor_price,
            state: session.state,
            tactic: session.tactic,
            sentiment: session.sentiment,
            round: session.round,
            max_rounds: session.max_rounds,
            quote_ttl_seconds: session.quote_ttl_seconds,
            agreed_price: session.agreed_price,
            metadata,
        }
    }
}

/// The negotiation core's public face.
pub struct NegotiationService {
    hot: Arc<dyn HotStore>,
    durable: Arc<dyn DurableStore>,
    catalog: Arc<dyn ProductCatalog>,
    dialogue: DialogueGenerator,
    coupons: CouponService,
    quotes: QuoteSigner,
    detector: BotDetector,
    cfg: NegotiationConfig,
}

impl NegotiationService {
    /// Wires the orchestrator.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hot: Arc<dyn HotStore>,
        durable: Arc<dyn DurableStore>,
        catalog: Arc<dyn ProductCatalog>,
        dialogue: DialogueGenerator,
        coupons: CouponService,
        quotes: QuoteSigner,
        cfg: NegotiationConfig,
    ) -> Self {
        Self {
            hot,
            durable,
            catalog,
            dialogue,
            coupons,
            quotes,
            detector: BotDetector::default(),
            cfg,
        }
    }

    // ── start ───────────────────────────────────────────────────────

    /// Starts a session: loads the product, opens at the anchor, writes
    /// both tiers, and returns the opening message.
    pub async fn start(
        &self,
        product_id: &str,
        buyer_ref: &str,
        language: Language,
    ) -> Result<SessionReply, DomainError> {
        let product_id = ProductId::new(product_id)?;

        let rate = self
            .hot
            .incr_start_rate(buyer_ref, START_RATE_WINDOW)
            .await?;
        if rate > self.cfg.start_rate_limit {
            return Err(DomainError::rate_limited());
        }

        let product = self.catalog.get(&product_id).await?.ok_or_else(|| {
            // Fatal per the error policy: opaque outward, detailed in logs.
            tracing::error!(product_id = %product_id, "start requested for missing product");
            DomainError::internal("unable to start negotiation")
        })?;

        let now = Timestamp::now();
        let mut session =
            NegotiationSession::start(&product, buyer_ref, language, self.cfg.params, now);

        let empty = SanitizedMessage {
            text: String::new(),
            redacted: false,
        };
        let dialogue = self
            .dialogue
            .generate(&session, Tactic::OpeningAnchor, session.anchor_price, &empty, None)
            .await;

        let mut metadata = Map::new();
        self.note_dialogue(&mut metadata, &dialogue);

        // Opening seller event; a durable outage degrades, it never
        // blocks the opening.
        let opening = session.offers.as_slice()[0].clone();
        if !self
            .append_event_with_retry(&OfferEvent::from_offer(&session, &opening))
            .await
        {
            session.mark_degraded();
            metadata.insert("degraded".into(), json!(true));
        }

        self.hot.put_session(&session, self.cfg.params.ttl).await?;

        tracing::info!(
            session_id = %session.session_id,
            product_id = %session.product_id,
            anchor = session.anchor_price,
            "negotiation started"
        );

        Ok(SessionReply::from_session(&session, dialogue.message, metadata))
    }

    // ── offer ───────────────────────────────────────────────────────

    /// Processes one buyer offer.
    pub async fn offer(&self, request: OfferRequest) -> Result<SessionReply, DomainError> {
        let session_id = SessionId::parse(&request.session_id)
            .map_err(|_| DomainError::bad_input("invalid session id format"))?;

        if !request.price.is_finite() || request.price <= 0.0 {
            return Err(DomainError::bad_input("price must be a positive number"));
        }
        let price = request.price.round() as Rupees;

        // Token check precedes everything observable, and an unknown
        // session answers exactly like a wrong token, so nothing leaks
        // about which sessions exist.
        let preview = self.load_verified(&session_id, &request.token).await?;

        if self.hot.in_cooldown(&session_id).await? {
            return Err(DomainError::cooldown());
        }

        let lock = self
            .hot
            .acquire_lock(&session_id, self.cfg.lock_lease)
            .await?
            .ok_or_else(DomainError::busy)?;

        let result = self
            .offer_locked(session_id, preview, price, &request)
            .await;

        self.release_lock(&session_id, &lock).await;
        result
    }

    async fn offer_locked(
        &self,
        session_id: SessionId,
        preview: NegotiationSession,
        price: Rupees,
        request: &OfferRequest,
    ) -> Result<SessionReply, DomainError> {
        // Reload under the lock; the preview may be stale.
        let mut session = match self.hot.get_session(&session_id).await? {
            Some(session) => session,
            None => preview,
        };

        if session.is_terminal() {
            return Err(DomainError::session_closed(session.state.as_str()));
        }

        let now = Timestamp::now();
        if session.is_expired(now) {
            return self.expire_session(session, now).await;
        }

        if let Some(echo) = request.round {
            if echo != session.round + 1 {
                return Err(DomainError::out_of_order(session.round + 1));
            }
        }

        if let Some(language) = request.language {
            session.language = language;
        }

        let sanitized = sanitize_buyer_message(&request.message);

        session.record_buyer_offer(price, sanitized.text.clone(), now)?;

        let assessment = self.detector.assess(&session.offers, session.anchor_price);
        session.bot_score = assessment.score;

        let decision = decide(
            &session,
            &TurnInput {
                buyer_price: price,
                exit: detect_exit_intent(&sanitized.text),
                bot: assessment,
                epsilon_pct: self.cfg.epsilon_pct,
            },
        );

        let mut metadata = Map::new();
        let published_price = self
            .apply_decision(&mut session, &decision, now, &mut metadata)
            .await?;

        let dialogue = self
            .dialogue
            .generate(
                &session,
                decision.tactic,
                published_price,
                &sanitized,
                decision.bundle.as_ref(),
            )
            .await;
        self.note_dialogue(&mut metadata, &dialogue);
        session.sentiment = dialogue.sentiment;

        self.persist_round(&mut session, now, &mut metadata).await?;

        self.hot
            .set_cooldown(&session_id, self.cfg.cooldown)
            .await?;

        tracing::info!(
            session_id = %session.session_id,
            round = session.round,
            tactic = session.tactic.as_str(),
            state = session.state.as_str(),
            bot_score = session.bot_score,
            "negotiation round completed"
        );

        Ok(SessionReply::from_session(&session, dialogue.message, metadata))
    }

    /// Applies an engine decision to the session through the validation
    /// gate. Returns the published price.
    async fn apply_decision(
        &self,
        session: &mut NegotiationSession,
        decision: &TurnDecision,
        now: Timestamp,
        metadata: &mut Map<String, Value>,
    ) -> Result<Rupees, DomainError> {
        match decision.state {
            NegotiationState::Agreed => {
                let agreed = session.accept(decision.counter_price, now)?;
                let quote = self.quotes.sign(Quote::issue(
                    session.session_id,
                    session.product_id.clone(),
                    agreed,
                    session.quote_ttl_seconds,
                    now,
                ))?;
                metadata.insert(
                    "quote".into(),
                    serde_json::to_value(&quote)
                        .map_err(|e| DomainError::internal(format!("quote serialize: {}", e)))?,
                );
                Ok(agreed)
            }
            NegotiationState::Broken => {
                session.break_off(decision.tactic, now)?;
                Ok(session.current_price)
            }
            _ => {
                let bounds = PriceBounds {
                    floor: session.floor_price,
                    anchor: session.anchor_price,
                    previous_seller_price: session.current_price,
                    last_candidate: Some(decision.candidate),
                };
                let validated = match validate_price(decision.counter_price as f64, &bounds) {
                    Ok(validated) => validated,
                    Err(e) => {
                        // Engine output failed the gate outright; retry
                        // deterministically with the candidate.
                        tracing::warn!(error = %e, "counter rejected by validator, using candidate");
                        validate_price(decision.candidate as f64, &bounds)?
                    }
                };
                if validated.overridden {
                    metadata.insert("validator_override".into(), json!(true));
                    metadata.insert("validator_reasons".into(), json!(validated.reasons));
                }

                let mut price = validated.price;
                if let Some(applied) = self
                    .coupons
                    .apply(session, decision.tactic, price)
                    .await
                {
                    price = applied.price_after;
                    session.record_coupon(applied.coupon_id.clone());
                    metadata.insert("coupon_applied".into(), json!(true));
                    metadata.insert("coupon_id".into(), json!(applied.coupon_id));
                }

                if let Some(bundle) = decision.bundle {
                    metadata.insert(
                        "bundle".into(),
                        json!({
                            "quantity": bundle.quantity,
                            "unit_price": bundle.unit_price,
                            "total": bundle.total,
                        }),
                    );
                }

                session.apply_counter(
                    price,
                    decision.tactic,
                    crate::domain::negotiation::Sentiment::Neutral,
                    now,
                )?;
                if decision.consumed_flounce {
                    session.mark_flounce_used();
                }
                Ok(price)
            }
        }
    }

    /// TTL elapsed: close the session without consuming a round.
    async fn expire_session(
        &self,
        mut session: NegotiationSession,
        now: Timestamp,
    ) -> Result<SessionReply, DomainError> {
        session.time_out(now)?;

        let mut metadata = Map::new();
        self.persist_round(&mut session, now, &mut metadata).await?;

        let message = crate::domain::dialogue::fallback_message(
            Tactic::Timeout,
            session.current_price,
            session.language,
            &session.product_name,
        );
        Ok(SessionReply::from_session(&session, message, metadata))
    }

    /// Writes the round to both tiers. A hot-tier failure aborts (the
    /// caller's round is not consumed, since the stored snapshot never
    /// changed); a durable failure degrades and keeps playing.
    async fn persist_round(
        &self,
        session: &mut NegotiationSession,
        now: Timestamp,
        metadata: &mut Map<String, Value>,
    ) -> Result<(), DomainError> {
        let mut audit_ok = true;
        let offers = session.offers.as_slice();
        let recent: Vec<OfferEvent> = offers
            .iter()
            .rev()
            .take(2)
            .map(|o| OfferEvent::from_offer(session, o))
            .collect();
        for event in recent.iter().rev() {
            if !self.append_event_with_retry(event).await {
                audit_ok = false;
            }
        }

        if session.is_terminal() {
            let summary = SessionSummary::from_session(session, now);
            if !self.write_summary_with_retry(&summary).await {
                audit_ok = false;
            }
        } else {
            session.refresh_expiry(self.cfg.params.ttl, now);
        }

        if !audit_ok {
            session.mark_degraded();
            metadata.insert("degraded".into(), json!(true));
        }

        // Terminal snapshots stay readable until the TTL runs out, so a
        // status poll after closing still answers.
        self.hot.put_session(session, self.cfg.params.ttl).await?;
        Ok(())
    }

    // ── status ──────────────────────────────────────────────────────

    /// Read-only snapshot; never mutates, never calls the model.
    pub async fn status(&self, session_id: &str, token: &str) -> Result<SessionReply, DomainError> {
        let session_id = SessionId::parse(session_id)
            .map_err(|_| DomainError::bad_input("invalid session id format"))?;
        let session = self.load_verified(&session_id, token).await?;

        let message = crate::domain::dialogue::fallback_message(
            session.tactic,
            session.agreed_price.unwrap_or(session.current_price),
            session.language,
            &session.product_name,
        );
        Ok(SessionReply::from_session(&session, message, Map::new()))
    }

    /// The session's audit trail from the durable tier, token-gated like
    /// every other session read.
    pub async fn history(
        &self,
        session_id: &str,
        token: &str,
    ) -> Result<Vec<OfferEvent>, DomainError> {
        let session_id = SessionId::parse(session_id)
            .map_err(|_| DomainError::bad_input("invalid session id format"))?;
        self.load_verified(&session_id, token).await?;
        self.durable.list_events(&session_id).await
    }

    // ── helpers ─────────────────────────────────────────────────────

    /// Loads a session and verifies the presented token. Unknown ids and
    /// wrong tokens are indistinguishable: both burn a constant-time
    /// compare and answer `bad_token`.
    async fn load_verified(
        &self,
        session_id: &SessionId,
        token: &str,
    ) -> Result<NegotiationSession, DomainError> {
        match self.hot.get_session(session_id).await? {
            Some(session) => {
                if session.session_token.matches(token) {
                    Ok(session)
                } else {
                    Err(DomainError::bad_token())
                }
            }
            None => {
                // Same comparison cost as the found path.
                let decoy = SessionToken::issue();
                let _ = decoy.matches(token);
                Err(DomainError::bad_token())
            }
        }
    }

    async fn release_lock(&self, session_id: &SessionId, lock: &LockToken) {
        if let Err(e) = self.hot.release_lock(session_id, lock).await {
            // The lease will expire on its own; log and move on.
            tracing::warn!(session_id = %session_id, error = %e, "lock release failed");
        }
    }

    async fn append_event_with_retry(&self, event: &OfferEvent) -> bool {
        for attempt in 0..self.cfg.durable_retries {
            match self.durable.append_offer_event(event).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        session_id = %event.session_id,
                        round = event.round,
                        error = %e,
                        "offer event write failed"
                    );
                    tokio::time::sleep(DURABLE_RETRY_BASE * (1 << attempt)).await;
                }
            }
        }
        false
    }

    async fn write_summary_with_retry(&self, summary: &SessionSummary) -> bool {
        for attempt in 0..self.cfg.durable_retries {
            match self.durable.write_summary(summary).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        session_id = %summary.session_id,
                        error = %e,
                        "session summary write failed"
                    );
                    tokio::time::sleep(DURABLE_RETRY_BASE * (1 << attempt)).await;
                }
            }
        }
        false
    }

    fn note_dialogue(&self, metadata: &mut Map<String, Value>, dialogue: &DialogueOutput) {
        if dialogue.fallback {
            metadata.insert("dialogue_fallback".into(), json!(true));
        }
        if dialogue.injection_redacted {
            metadata.insert("injection_redacted".into(), json!(true));
        }
        if let Some(reasoning) = &dialogue.reasoning {
            metadata.insert("reasoning".into(), json!(reasoning));
        }
    }
}
