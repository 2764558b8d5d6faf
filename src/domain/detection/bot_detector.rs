//! Composite bot scoring from offer timing and pricing patterns.
//!
//! The detector is a pure function of the session's buyer offers; no
//! process-wide state. Scores:
//!
//! - `>= 0.8` breaks the session (`bot_block`)
//! - `>= 0.5` hardens the concession curve for the round (beta * 1.5)

use crate::domain::foundation::Rupees;
use crate::domain::negotiation::{Offer, OfferHistory};

/// Rolling window: only the most recent buyer offers are scored.
const WINDOW: usize = 8;

/// Interval variance below this reads as machine-regular cadence.
const MAX_STDDEV_SECS: f64 = 0.5;

/// Score at or above this forces `bot_block`.
pub const BLOCK_THRESHOLD: f64 = 0.8;

/// Score at or above this hardens the curve for the round.
pub const HARDEN_THRESHOLD: f64 = 0.5;

/// Factor applied to beta when the harden threshold is crossed.
pub const HARDEN_BETA_FACTOR: f64 = 1.5;

/// Per-round bot assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BotAssessment {
    pub timing: f64,
    pub pattern: f64,
    pub score: f64,
}

impl BotAssessment {
    pub fn should_block(&self) -> bool {
        self.score >= BLOCK_THRESHOLD
    }

    /// Curve exponent to use this round given the base beta.
    pub fn effective_beta(&self, base_beta: f64) -> f64 {
        if self.score >= HARDEN_THRESHOLD {
            base_beta * HARDEN_BETA_FACTOR
        } else {
            base_beta
        }
    }
}

/// Scoring weights; both components are in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct BotDetector {
    pub timing_weight: f64,
    pub pattern_weight: f64,
    /// Expected human minimum between offers; the cooldown window.
    pub min_interval_secs: f64,
}

impl Default for BotDetector {
    fn default() -> Self {
        Self {
            timing_weight: 0.5,
            pattern_weight: 0.5,
            min_interval_secs: 2.0,
        }
    }
}

impl BotDetector {
    /// Scores the buyer's recent behaviour. `anchor` scales the
    /// tiny-decrement pattern check.
    pub fn assess(&self, history: &OfferHistory, anchor: Rupees) -> BotAssessment {
        let window: Vec<&Offer> = {
            let all: Vec<&Offer> = history.buyer_offers().collect();
            let start = all.len().saturating_sub(WINDOW);
            all[start..].to_vec()
        };

        let timing = self.score_timing(&window);
        let pattern = self.score_pattern(&window, anchor);
        let score = (self.timing_weight * timing + self.pattern_weight * pattern).clamp(0.0, 1.0);

        BotAssessment {
            timing,
            pattern,
            score,
        }
    }

    /// Timing component: suspiciously fast or suspiciously regular
    /// inter-offer intervals.
    fn score_timing(&self, window: &[&Offer]) -> f64 {
        if window.len() < 3 {
            return 0.0;
        }
        let intervals: Vec<f64> = window
            .iter()
            .filter_map(|o| o.features.gap_ms)
            .map(|ms| ms.max(0) as f64 / 1000.0)
            .collect();
        if intervals.len() < 2 {
            return 0.0;
        }

        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let speed = (1.0 - mean / (self.min_interval_secs * 3.0)).max(0.0);

        let consistency = if intervals.len() >= 3 {
            let var = intervals
                .iter()
                .map(|x| (x - mean).powi(2))
                .sum::<f64>()
                / (intervals.len() - 1) as f64;
            (1.0 - var.sqrt() / MAX_STDDEV_SECS).max(0.0)
        } else {
            0.0
        };

        ((speed + consistency) / 2.0).min(1.0)
    }

    /// Pattern component: identical prices, arithmetic sequences, or a
    /// greedy bot's monotone tiny decrements.
    fn score_pattern(&self, window: &[&Offer], anchor: Rupees) -> f64 {
        if window.len() < 4 {
            return 0.0;
        }
        let prices: Vec<Rupees> = window.iter().map(|o| o.price).collect();
        let deltas: Vec<Rupees> = prices.windows(2).map(|w| w[1] - w[0]).collect();

        // Identical prices or a perfect arithmetic sequence.
        if deltas.iter().all(|d| *d == deltas[0]) {
            return 1.0;
        }

        // Monotone tiny decrements: every move down, none bigger than
        // half a percent of the anchor.
        let tiny = (anchor as f64 * 0.005).max(1.0) as Rupees;
        if deltas.iter().all(|d| *d < 0 && d.abs() <= tiny) {
            return 0.8;
        }

        // Near-fixed increments: low coefficient of variation.
        if deltas.len() >= 3 {
            let mean = deltas.iter().sum::<Rupees>() as f64 / deltas.len() as f64;
            let var = deltas
                .iter()
                .map(|d| (*d as f64 - mean).powi(2))
                .sum::<f64>()
                / (deltas.len() - 1) as f64;
            let cv = var.sqrt() / mean.abs().max(1.0);
            if cv < 0.05 {
                return 0.9;
            }
            if cv < 0.15 {
                return 0.5;
            }
        }

        0.0
    }
}
