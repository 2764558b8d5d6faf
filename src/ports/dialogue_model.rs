//! Dialogue model port - the LLM boundary.
//!
//! The model renders vernacular shopkeeper text around a price the engine
//! already fixed. It is an effect behind this trait: the orchestration
//! treats dialogue generation as a pure-ish `(inputs) -> JSON` call and
//! owns every guardrail. A deterministic template implementation must be
//! able to stand in for the real model.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::Rupees;
use crate::domain::negotiation::{Language, Tactic};

/// Everything a model needs to render one seller turn.
#[derive(Debug, Clone)]
pub struct DialoguePrompt {
    /// System prompt: persona plus the tactic-specific overlay.
    pub system: String,
    /// User message: negotiation state, history excerpt, instructions.
    pub user: String,
    /// Fixed per tactic so a session keeps one voice.
    pub temperature: f32,
    pub max_tokens: u32,
    // Structured fields so template implementations need not parse the
    // rendered prompt text.
    pub tactic: Tactic,
    pub price: Rupees,
    pub language: Language,
    pub product_name: String,
}

/// Model errors. None of these ever fail a negotiation request; the
/// generator falls back to a deterministic template.
#[derive(Debug, Error)]
pub enum DialogueModelError {
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("unparseable model output: {0}")]
    Parse(String),
}

impl DialogueModelError {
    /// True for errors worth one more attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DialogueModelError::Timeout { .. }
                | DialogueModelError::Network(_)
                | DialogueModelError::Unavailable(_)
        )
    }
}

/// The LLM boundary.
#[async_trait]
pub trait DialogueModel: Send + Sync {
    /// Renders one seller turn. The returned string should be the JSON
    /// object `{message, tactic_used, sentiment, reasoning?}`; anything
    /// else is handled by the generator's fallback.
    async fn render(&self, prompt: &DialoguePrompt) -> Result<String, DialogueModelError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
