//! Negotiation tactics and seller sentiment tags.

use serde::{Deserialize, Serialize};

/// Tactic chosen for a single seller turn.
///
/// The tactic drives both the transition table and the tone of the
/// generated dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tactic {
    /// Opening counter at the anchor price.
    OpeningAnchor,
    /// Buyer offer landed inside the ZOPA.
    Accept,
    /// Regular counter-offer along the concession curve.
    Concession,
    /// Buyer offered below floor early in the session; hold the line.
    AnchorDefense,
    /// One-shot save-the-deal concession on detected exit intent.
    WalkAwaySave,
    /// Price talk stalled; pivot to a bundle offer at unchanged price.
    QuantityPivot,
    /// Composite bot score crossed the block threshold.
    BotBlock,
    /// Round budget exhausted outside the ZOPA.
    Deadline,
    /// Session TTL elapsed.
    Timeout,
}

impl Tactic {
    /// Wire tag for this tactic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tactic::OpeningAnchor => "opening_anchor",
            Tactic::Accept => "accept",
            Tactic::Concession => "concession",
            Tactic::AnchorDefense => "anchor_defense",
            Tactic::WalkAwaySave => "walk_away_save",
            Tactic::QuantityPivot => "quantity_pivot",
            Tactic::BotBlock => "bot_block",
            Tactic::Deadline => "deadline",
            Tactic::Timeout => "timeout",
        }
    }

    /// Tactics during which an invisible coupon may be folded into the
    /// counter-offer.
    pub fn allows_coupon(&self) -> bool {
        matches!(self, Tactic::Concession | Tactic::WalkAwaySave)
    }
}

/// Tone tag attached to each seller response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    #[default]
    Neutral,
    Warm,
    Firm,
    Exit,
}

impl Sentiment {
    /// Wire tag for this sentiment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Neutral => "neutral",
            Sentiment::Warm => "warm",
            Sentiment::Firm => "firm",
            Sentiment::Exit => "exit",
        }
    }

    /// Parses a model-supplied sentiment string, defaulting to neutral.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "warm" | "friendly" | "positive" => Sentiment::Warm,
            "firm" | "tough" => Sentiment::Firm,
            "exit" => Sentiment::Exit,
            _ => Sentiment::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tactic_tags_are_snake_case() {
        assert_eq!(Tactic::OpeningAnchor.as_str(), "opening_anchor");
        assert_eq!(Tactic::WalkAwaySave.as_str(), "walk_away_save");
        assert_eq!(
            serde_json::to_string(&Tactic::QuantityPivot).unwrap(),
            "\"quantity_pivot\""
        );
    }

    #[test]
    fn coupons_only_inside_concession_tactics() {
        assert!(Tactic::Concession.allows_coupon());
        assert!(Tactic::WalkAwaySave.allows_coupon());
        assert!(!Tactic::Accept.allows_coupon());
        assert!(!Tactic::AnchorDefense.allows_coupon());
        assert!(!Tactic::BotBlock.allows_coupon());
    }

    #[test]
    fn sentiment_parse_lossy_defaults_to_neutral() {
        assert_eq!(Sentiment::parse_lossy("FIRM"), Sentiment::Firm);
        assert_eq!(Sentiment::parse_lossy("friendly"), Sentiment::Warm);
        assert_eq!(Sentiment::parse_lossy("???"), Sentiment::Neutral);
    }
}
