//! Abuse and intent detection over the offer stream.

mod bot_detector;
mod sentiment;

pub use bot_detector::{
    BotAssessment, BotDetector, BLOCK_THRESHOLD, HARDEN_BETA_FACTOR, HARDEN_THRESHOLD,
};
pub use sentiment::{detect_exit_intent, ExitIntent, EXIT_CONFIDENCE_THRESHOLD};
