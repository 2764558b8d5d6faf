//! SAO (Stacked Alternating Offers) turn engine.
//!
//! Pure transition function: given a session snapshot with the buyer's
//! offer already recorded, decide the next state, tactic, and counter
//! price. Row order below is the tie-break order; the first matching
//! rule wins.
//!
//! 1. buyer inside the ZOPA                      -> agreed / accept
//! 2. bot score at the block threshold           -> broken / bot_block
//! 3. round budget exhausted outside the ZOPA    -> broken / deadline
//! 4. exit intent, flounce unused                -> responding / walk_away_save
//! 5. below floor early in the session           -> responding / anchor_defense
//! 6. three consecutive stalled buyer moves      -> responding / quantity_pivot
//! 7. otherwise                                  -> responding / concession

use crate::domain::detection::{BotAssessment, ExitIntent};
use crate::domain::foundation::{round_rupees, Rupees};
use crate::domain::pricing::{reservation_price, within_zopa, zopa_epsilon, ReciprocityTracker};

use super::{NegotiationSession, NegotiationState, Tactic};

/// Walk-away save: one-shot 5% cut on the current seller price.
const FLOUNCE_CONCESSION_PCT: f64 = 0.05;

/// A buyer move within half a percent of the anchor counts as stalled.
const STALL_DELTA_PCT: f64 = 0.005;

/// Stalled moves required before pivoting to a bundle.
const STALL_RUN: usize = 3;

/// Reciprocity cap: one round can never mirror away more than a tenth of
/// the negotiable range.
const MAX_CONCESSION_RANGE_PCT: f64 = 0.1;

/// Bundle offered on a quantity pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleOffer {
    pub quantity: u32,
    pub unit_price: Rupees,
    pub total: Rupees,
}

/// Inputs for one engine turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub buyer_price: Rupees,
    pub exit: ExitIntent,
    pub bot: BotAssessment,
    /// ZOPA tolerance as a fraction of the anchor.
    pub epsilon_pct: f64,
}

/// Outcome of one engine turn; the orchestrator applies it to the session
/// after the validation gate.
#[derive(Debug, Clone)]
pub struct TurnDecision {
    pub state: NegotiationState,
    pub tactic: Tactic,
    /// Price to publish this round. Equals the agreed price on accept and
    /// the unchanged current price on defensive tactics.
    pub counter_price: Rupees,
    /// The deterministic candidate from curve + reciprocity; the
    /// validator's recovery value.
    pub candidate: Rupees,
    /// True when this turn consumed the one-shot flounce concession.
    pub consumed_flounce: bool,
    pub bundle: Option<BundleOffer>,
}

/// Decides the seller's move for the round just recorded on `session`.
pub fn decide(session: &NegotiationSession, input: &TurnInput) -> TurnDecision {
    let anchor = session.anchor_price;
    let floor = session.floor_price;
    let current = session.current_price;
    let round = session.round;
    let max_rounds = session.max_rounds;

    // Two pressures: the time curve and the tit-for-tat mirror. The
    // seller keeps the higher of the two, never rising above its own
    // previous counter.
    let beta = input.bot.effective_beta(session.beta);
    let curve = reservation_price(anchor, floor, round, max_rounds, beta);
    let tracker = ReciprocityTracker::from_history(&session.offers, session.alpha);
    let max_concession = round_rupees((anchor - floor) as f64 * MAX_CONCESSION_RANGE_PCT);
    let mirrored = current - tracker.seller_concession(session.relative_time(), max_concession);
    let candidate = curve.max(mirrored).min(current).max(floor);

    let epsilon = zopa_epsilon(anchor, input.epsilon_pct);

    // Row 1: acceptance. The closing price is a seller offer like any
    // other: a bid above the last counter closes at that counter.
    if within_zopa(input.buyer_price, floor, candidate, epsilon, round, max_rounds) {
        return TurnDecision {
            state: NegotiationState::Agreed,
            tactic: Tactic::Accept,
            counter_price: input.buyer_price.min(anchor).min(current),
            candidate,
            consumed_flounce: false,
            bundle: None,
        };
    }

    // Row 2: bot block.
    if input.bot.should_block() {
        return hold(NegotiationState::Broken, Tactic::BotBlock, current, candidate);
    }

    // Row 3: deadline exhausted outside the ZOPA.
    if round >= max_rounds {
        return hold(NegotiationState::Broken, Tactic::Deadline, current, candidate);
    }

    // Row 4: digital flounce, once per session.
    if input.exit.should_flounce() && !session.flounce_used {
        let cut = round_rupees(current as f64 * FLOUNCE_CONCESSION_PCT);
        let save_price = (current - cut).max(floor);
        return TurnDecision {
            state: NegotiationState::Responding,
            tactic: Tactic::WalkAwaySave,
            counter_price: save_price,
            candidate,
            consumed_flounce: true,
            bundle: None,
        };
    }

    // Row 5: lowball below the floor early on; hold the anchor line.
    if input.buyer_price < floor && round + 1 < max_rounds {
        return hold(
            NegotiationState::Responding,
            Tactic::AnchorDefense,
            current,
            candidate,
        );
    }

    // Row 6: stalled haggling pivots to a bundle at unchanged unit price.
    if is_stalled(session) {
        let bundle_unit = round_rupees(current as f64 * (1.0 - FLOUNCE_CONCESSION_PCT)).max(floor);
        return TurnDecision {
            state: NegotiationState::Responding,
            tactic: Tactic::QuantityPivot,
            counter_price: current,
            candidate,
            consumed_flounce: false,
            bundle: Some(BundleOffer {
                quantity: 2,
                unit_price: bundle_unit,
                total: bundle_unit * 2,
            }),
        };
    }

    // Row 7: regular concession along the candidate.
    TurnDecision {
        state: NegotiationState::Responding,
        tactic: Tactic::Concession,
        counter_price: candidate,
        candidate,
        consumed_flounce: false,
        bundle: None,
    }
}

fn hold(
    state: NegotiationState,
    tactic: Tactic,
    current: Rupees,
    candidate: Rupees,
) -> TurnDecision {
    TurnDecision {
        state,
        tactic,
        counter_price: current,
        candidate,
        consumed_flounce: false,
        bundle: None,
    }
}

/// Three consecutive buyer moves each within half a percent of the anchor.
fn is_stalled(session: &NegotiationSession) -> bool {
    let deltas = session.offers.buyer_deltas();
    if deltas.len() < STALL_RUN {
        return false;
    }
    let tiny = round_rupees(session.anchor_price as f64 * STALL_DELTA_PCT).max(1);
    deltas[deltas.len() - STALL_RUN..]
        .iter()
        .all(|d| d.abs() <= tiny)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Product;
    use crate::domain::detection::BotAssessment;
    use crate::domain::foundation::{ProductId, Timestamp};
    use crate::domain::negotiation::{Language, SessionParams};
    use std::collections::HashMap;

    fn product() -> Product {
        Product::new(
            ProductId::new("p1").unwrap(),
            "Kolhapuri chappal",
            "footwear",
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
        NegotiationSession::start(&product(), "buyer-1", Language::En, SessionParams::default(), now())
    }

    fn input(buyer_price: Rupees) -> TurnInput {
        TurnInput {
            buyer_price,
            exit: ExitIntent::default(),
            bot: BotAssessment::default(),
            epsilon_pct: 0.01,
        }
    }

    #[test]
    fn full_price_offer_is_accepted_first_round() {
        let mut s = session();
        s.record_buyer_offer(12999, "", now()).unwrap();
        let d = decide(&s, &input(12999));
        assert_eq!(d.state, NegotiationState::Agreed);
        assert_eq!(d.tactic, Tactic::Accept);
        assert_eq!(d.counter_price, 12999);
    }

    #[test]
    fn overpayment_is_capped_at_anchor() {
        let mut s = session();
        s.record_buyer_offer(15000, "", now()).unwrap();
        let d = decide(&s, &input(15000));
        assert_eq!(d.state, NegotiationState::Agreed);
        assert_eq!(d.counter_price, 12999);
    }

    #[test]
    fn overbid_above_the_last_counter_closes_at_that_counter() {
        let mut s = session();
        s.current_price = 12000;
        s.record_buyer_offer(12500, "", now()).unwrap();
        let d = decide(&s, &input(12500));
        assert_eq!(d.state, NegotiationState::Agreed);
        assert_eq!(d.counter_price, 12000);
    }

    #[test]
    fn below_floor_early_holds_the_anchor() {
        let mut s = session();
        s.record_buyer_offer(5000, "", now()).unwrap();
        let d = decide(&s, &input(5000));
        assert_eq!(d.state, NegotiationState::Responding);
        assert_eq!(d.tactic, Tactic::AnchorDefense);
        assert_eq!(d.counter_price, 12999);
    }

    #[test]
    fn above_floor_near_deadline_is_accepted() {
        let mut s = session();
        // Buyer climbs 9000, 9200, 9400 then offers 9500 at round 14.
        for p in [9000, 9200, 9400] {
            s.record_buyer_offer(p, "", now()).unwrap();
        }
        s.round = 13;
        s.record_buyer_offer(9500, "", now()).unwrap();
        assert_eq!(s.round, 14);
        let d = decide(&s, &input(9500));
        assert_eq!(d.state, NegotiationState::Agreed);
        assert_eq!(d.counter_price, 9500);
    }

    #[test]
    fn bot_block_beats_every_non_accept_row() {
        let mut s = session();
        s.record_buyer_offer(3000, "", now()).unwrap();
        let mut inp = input(3000);
        inp.bot = BotAssessment {
            timing: 1.0,
            pattern: 1.0,
            score: 0.99,
        };
        let d = decide(&s, &inp);
        assert_eq!(d.state, NegotiationState::Broken);
        assert_eq!(d.tactic, Tactic::BotBlock);
        assert_eq!(d.counter_price, 12999);
    }

    #[test]
    fn deadline_breaks_outside_zopa() {
        let mut s = session();
        s.round = 14;
        s.record_buyer_offer(9000, "", now()).unwrap();
        assert_eq!(s.round, 15);
        let d = decide(&s, &input(9000));
        assert_eq!(d.state, NegotiationState::Broken);
        assert_eq!(d.tactic, Tactic::Deadline);
    }

    #[test]
    fn exit_intent_triggers_one_shot_flounce() {
        let mut s = session();
        s.record_buyer_offer(10000, "too expensive, leaving", now()).unwrap();
        let mut inp = input(10000);
        inp.exit = ExitIntent {
            is_exit: true,
            confidence: 0.8,
            trigger: "too expensive".into(),
            is_angry: false,
        };
        let d = decide(&s, &inp);
        assert_eq!(d.tactic, Tactic::WalkAwaySave);
        assert!(d.consumed_flounce);
        // 5% off the current 12999, rounded half-up.
        assert_eq!(d.counter_price, 12349);

        // Second flounce attempt falls through to a normal row.
        s.mark_flounce_used();
        let d2 = decide(&s, &inp);
        assert_ne!(d2.tactic, Tactic::WalkAwaySave);
    }

    #[test]
    fn flounce_price_never_breaks_the_floor() {
        let mut s = session();
        s.current_price = 9500;
        s.record_buyer_offer(5000, "forget it", now()).unwrap();
        let mut inp = input(5000);
        inp.exit = ExitIntent {
            is_exit: true,
            confidence: 0.9,
            trigger: "forget it".into(),
            is_angry: false,
        };
        let d = decide(&s, &inp);
        assert_eq!(d.tactic, Tactic::WalkAwaySave);
        assert_eq!(d.counter_price, 9450);
        assert_eq!(d.state, NegotiationState::Responding);
    }

    #[test]
    fn stalled_buyer_gets_quantity_pivot() {
        let mut s = session();
        s.record_buyer_offer(9800, "", now()).unwrap();
        for p in [9830, 9860, 9880] {
            s.record_buyer_offer(p, "", now()).unwrap();
        }
        let d = decide(&s, &input(9880));
        assert_eq!(d.tactic, Tactic::QuantityPivot);
        // Counter price is unchanged from the prior seller counter.
        assert_eq!(d.counter_price, s.current_price);
        let bundle = d.bundle.unwrap();
        assert_eq!(bundle.quantity, 2);
        assert!(bundle.unit_price >= s.floor_price);
        assert_eq!(bundle.total, bundle.unit_price * 2);
    }

    #[test]
    fn default_row_concedes_along_the_candidate() {
        let mut s = session();
        s.record_buyer_offer(9800, "", now()).unwrap();
        s.record_buyer_offer(10400, "", now()).unwrap();
        let d = decide(&s, &input(10400));
        assert_eq!(d.tactic, Tactic::Concession);
        assert!(d.counter_price <= s.current_price);
        assert!(d.counter_price >= s.floor_price);
        assert_eq!(d.counter_price, d.candidate);
    }

    #[test]
    fn candidate_takes_the_higher_of_curve_and_mirror() {
        let mut s = session();
        // Large buyer jump: the mirror would concede a lot, but the
        // Boulware curve barely moved, so the candidate stays near it.
        s.record_buyer_offer(6000, "", now()).unwrap();
        s.record_buyer_offer(9300, "", now()).unwrap();
        let d = decide(&s, &input(9300));
        let curve = reservation_price(12999, 9450, 2, 15, 5.0);
        assert!(d.candidate >= curve);
    }

    #[test]
    fn hardened_beta_yields_stingier_candidate() {
        let mut harden = BotAssessment::default();
        harden.score = 0.6;

        let mut s1 = session();
        s1.round = 7;
        s1.record_buyer_offer(10000, "", now()).unwrap();
        let soft = decide(&s1, &input(10000));

        let mut s2 = session();
        s2.round = 7;
        s2.record_buyer_offer(10000, "", now()).unwrap();
        let mut inp = input(10000);
        inp.bot = harden;
        let hard = decide(&s2, &inp);

        assert!(hard.counter_price >= soft.counter_price);
    }
}
