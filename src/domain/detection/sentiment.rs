//! Exit-intent detection on buyer messages.
//!
//! Keyword matching over English and transliterated Hindi exit signals.
//! A confident hit triggers the one-shot walk-away save.

/// Confidence at or above which the walk-away flow fires.
pub const EXIT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// English + Hinglish phrases signalling the buyer is about to leave.
const EXIT_KEYWORDS: &[&str] = &[
    // English
    "too expensive",
    "too much",
    "too costly",
    "can't afford",
    "forget it",
    "never mind",
    "no thanks",
    "not interested",
    "i'll pass",
    "bye",
    "leaving",
    "somewhere else",
    "another shop",
    "no deal",
    // Hindi / Hinglish (transliterated)
    "bohot mehenga",
    "bahut mehenga",
    "bahut zyada",
    "chhodo",
    "chodo",
    "jane do",
    "jaane do",
    "rehne do",
    "nahi chahiye",
    "nahi lena",
    "itna nahi",
    "afford nahi",
    "budget nahi",
    "dusri dukaan",
    "kahi aur",
    "kahin aur",
];

/// Phrases signalling the buyer is angry; treated as leaving with high
/// confidence.
const ANGRY_KEYWORDS: &[&str] = &[
    "waste of time",
    "scam",
    "rip off",
    "loot",
    "cheating",
    "loot rahe ho",
    "pagal bana rahe",
    "mazaak",
];

/// Result of scanning one buyer message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitIntent {
    pub is_exit: bool,
    pub confidence: f64,
    /// First keyword that matched.
    pub trigger: String,
    pub is_angry: bool,
}

impl ExitIntent {
    /// True when confident enough to trigger the walk-away save.
    pub fn should_flounce(&self) -> bool {
        self.is_exit && self.confidence >= EXIT_CONFIDENCE_THRESHOLD
    }
}

/// Scans a buyer message for exit intent.
pub fn detect_exit_intent(message: &str) -> ExitIntent {
    let text = message.to_lowercase();

    for kw in ANGRY_KEYWORDS {
        if text.contains(kw) {
            return ExitIntent {
                is_exit: true,
                confidence: 0.9,
                trigger: (*kw).to_string(),
                is_angry: true,
            };
        }
    }

    let matches: Vec<&str> = EXIT_KEYWORDS
        .iter()
        .filter(|kw| text.contains(**kw))
        .copied()
        .collect();
    if let Some(first) = matches.first() {
        // More distinct signals, more confidence.
        let confidence = (0.5 + 0.15 * matches.len() as f64).min(1.0);
        return ExitIntent {
            is_exit: true,
            confidence,
            trigger: (*first).to_string(),
            is_angry: false,
        };
    }

    ExitIntent::default()
}
