//! Tit-for-tat reciprocity over the buyer's concession history.
//!
//! The seller mirrors the buyer's last concession, damped by alpha so the
//! seller always concedes less than the buyer did. Alpha strengthens as
//! the deadline approaches:
//!
//! `alpha_eff = clamp(alpha * (1 + 0.5 * t/T), 0, 1)`

use crate::domain::foundation::{round_rupees, Rupees};
use crate::domain::negotiation::OfferHistory;

/// Window used for the trend classification.
const TREND_WINDOW: usize = 3;

/// Buyer concession behaviour over recent rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcessionTrend {
    /// Buyer concessions are growing (eager buyer).
    Accelerating,
    /// Roughly constant movement.
    Stable,
    /// Concessions shrinking (buyer nearing their limit).
    Decelerating,
    /// Buyer is not conceding at all.
    Stalled,
}

impl ConcessionTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcessionTrend::Accelerating => "accelerating",
            ConcessionTrend::Stable => "stable",
            ConcessionTrend::Decelerating => "decelerating",
            ConcessionTrend::Stalled => "stalled",
        }
    }
}

/// View over the buyer's offer deltas for one session.
#[derive(Debug, Clone)]
pub struct ReciprocityTracker {
    deltas: Vec<Rupees>,
    alpha: f64,
}

impl ReciprocityTracker {
    /// Builds the tracker from the session's offer history.
    pub fn from_history(history: &OfferHistory, alpha: f64) -> Self {
        Self {
            deltas: history.buyer_deltas(),
            alpha,
        }
    }

    /// The buyer's most recent concession (positive = buyer raised their
    /// bid). Zero until the buyer has made two offers.
    pub fn last_buyer_delta(&self) -> Rupees {
        self.deltas.last().copied().unwrap_or(0)
    }

    /// Deadline-adjusted damping factor.
    pub fn adaptive_alpha(&self, relative_time: f64) -> f64 {
        let t = relative_time.clamp(0.0, 1.0);
        (self.alpha * (1.0 + 0.5 * t)).clamp(0.0, 1.0)
    }

    /// How much the seller should concede this round in response to the
    /// buyer's movement, capped so a single wild jump cannot drain the
    /// negotiable range.
    pub fn seller_concession(&self, relative_time: f64, max_concession: Rupees) -> Rupees {
        let buyer_delta = self.last_buyer_delta();
        if buyer_delta <= 0 {
            // Buyer held or moved backwards: hold firm.
            return 0;
        }
        let raw = round_rupees(self.adaptive_alpha(relative_time) * buyer_delta as f64);
        raw.min(max_concession)
    }

    /// Classifies the buyer's recent concession trend. Feeds dialogue
    /// context only; never prices.
    pub fn trend(&self) -> ConcessionTrend {
        if self.deltas.len() < 2 {
            return ConcessionTrend::Stable;
        }
        let recent: &[Rupees] = if self.deltas.len() > TREND_WINDOW {
            &self.deltas[self.deltas.len() - TREND_WINDOW..]
        } else {
            &self.deltas
        };
        if recent.iter().all(|d| *d <= 0) {
            return ConcessionTrend::Stalled;
        }
        let slope = recent[recent.len() - 1] - recent[0];
        if slope > 5 {
            ConcessionTrend::Accelerating
        } else if slope < -5 {
            ConcessionTrend::Decelerating
        } else {
            ConcessionTrend::Stable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::domain::negotiation::{Actor, Offer, OfferFeatures};

    fn history(prices: &[Rupees]) -> OfferHistory {
        let mut h = OfferHistory::new();
        for (i, p) in prices.iter().enumerate() {
            h.push(Offer::new(
                Actor::Buyer,
                *p,
                "",
                None,
                Timestamp::from_unix_secs(1_700_000_000 + i as i64 * 10),
                i as u32 + 1,
                OfferFeatures::default(),
            ));
        }
        h
    }

    #[test]
    fn no_concession_without_buyer_movement() {
        let t = ReciprocityTracker::from_history(&history(&[9000]), 0.6);
        assert_eq!(t.seller_concession(0.2, 500), 0);
    }

    #[test]
    fn holds_firm_when_buyer_regresses() {
        let t = ReciprocityTracker::from_history(&history(&[9200, 9000]), 0.6);
        assert_eq!(t.seller_concession(0.2, 500), 0);
    }

    #[test]
    fn mirrors_buyer_concession_damped() {
        let t = ReciprocityTracker::from_history(&history(&[9000, 9200]), 0.6);
        // alpha_eff at t=0 is 0.6; 0.6 * 200 = 120.
        assert_eq!(t.seller_concession(0.0, 500), 120);
    }

    #[test]
    fn adaptive_alpha_strengthens_toward_deadline() {
        let t = ReciprocityTracker::from_history(&history(&[9000, 9200]), 0.6);
        assert!((t.adaptive_alpha(0.0) - 0.6).abs() < 1e-9);
        assert!((t.adaptive_alpha(1.0) - 0.9).abs() < 1e-9);
        // Never exceeds 1 even for large alpha.
        let hot = ReciprocityTracker::from_history(&history(&[9000, 9200]), 0.9);
        assert!((hot.adaptive_alpha(1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn concession_is_capped() {
        let t = ReciprocityTracker::from_history(&history(&[5000, 9000]), 0.6);
        assert_eq!(t.seller_concession(0.0, 300), 300);
    }

    #[test]
    fn trend_classification() {
        assert_eq!(
            ReciprocityTracker::from_history(&history(&[9000]), 0.6).trend(),
            ConcessionTrend::Stable
        );
        assert_eq!(
            ReciprocityTracker::from_history(&history(&[9000, 9000, 9000]), 0.6).trend(),
            ConcessionTrend::Stalled
        );
        assert_eq!(
            ReciprocityTracker::from_history(&history(&[9000, 9050, 9250]), 0.6).trend(),
            ConcessionTrend::Accelerating
        );
        assert_eq!(
            ReciprocityTracker::from_history(&history(&[9000, 9300, 9350]), 0.6).trend(),
            ConcessionTrend::Decelerating
        );
    }
}
