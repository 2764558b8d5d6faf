//! Time-dependent concession curve.
//!
//! `P(t) = anchor + (floor - anchor) * (t / T) ^ beta`
//!
//! beta > 1 holds firm and concedes near the deadline (Boulware),
//! beta = 1 is linear, beta < 1 concedes early. P is monotonically
//! non-increasing in t and always lands inside [floor, anchor].

use crate::domain::foundation::{clamp_rupees, round_rupees, Rupees};

/// Seller reservation price at round `round` of `max_rounds`.
pub fn reservation_price(
    anchor: Rupees,
    floor: Rupees,
    round: u32,
    max_rounds: u32,
    beta: f64,
) -> Rupees {
    if max_rounds == 0 || round == 0 {
        return anchor;
    }
    let t = round.min(max_rounds) as f64;
    let ratio = t / max_rounds as f64;
    let f_t = ratio.powf(beta);
    let price = anchor as f64 + (floor - anchor) as f64 * f_t;
    clamp_rupees(round_rupees(price), floor, anchor)
}

/// Acceptance tolerance: 1% of the anchor, at least one rupee.
pub fn zopa_epsilon(anchor: Rupees, epsilon_pct: f64) -> Rupees {
    round_rupees(anchor as f64 * epsilon_pct).max(1)
}

/// Whether a buyer offer is inside the zone of possible agreement for the
/// current round.
///
/// Accepts when the buyer clears both the floor and the current candidate
/// (less the tolerance), or unconditionally above the floor once the
/// deadline round is reached.
pub fn within_zopa(
    buyer_price: Rupees,
    floor: Rupees,
    candidate: Rupees,
    epsilon: Rupees,
    round: u32,
    max_rounds: u32,
) -> bool {
    if buyer_price < floor {
        return false;
    }
    if round + 1 >= max_rounds {
        return true;
    }
    buyer_price >= candidate - epsilon
}
