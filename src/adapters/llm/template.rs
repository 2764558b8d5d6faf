//! Template dialogue model.
//!
//! A [`DialogueModel`] that renders only the deterministic domain
//! templates. Stands in for the real LLM in tests and offline
//! deployments; every negotiation guarantee holds without a network in
//! sight.

use async_trait::async_trait;

use crate::domain::dialogue::{fallback_message, template_sentiment};
use crate::ports::{DialogueModel, DialogueModelError, DialoguePrompt};

/// Deterministic [`DialogueModel`] over the canned templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateDialogueModel;

impl TemplateDialogueModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DialogueModel for TemplateDialogueModel {
    async fn render(&self, prompt: &DialoguePrompt) -> Result<String, DialogueModelError> {
        let message = fallback_message(
            prompt.tactic,
            prompt.price,
            prompt.language,
            &prompt.product_name,
        );
        let body = serde_json::json!({
            "message": message,
            "tactic_used": prompt.tactic.as_str(),
            "sentiment": template_sentiment(prompt.tactic).as_str(),
        });
        Ok(body.to_string())
    }

    fn name(&self) -> &'static str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::negotiation::{Language, Tactic};

    #[tokio::test]
    async fn renders_the_json_contract() {
        let model = TemplateDialogueModel::new();
        let prompt = DialoguePrompt {
            system: String::new(),
            user: String::new(),
            temperature: 0.0,
            max_tokens: 300,
            tactic: Tactic::Accept,
            price: 9800,
            language: Language::Hi,
            product_name: "Razai".into(),
        };
        let raw = model.render(&prompt).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["tactic_used"], "accept");
        assert_eq!(parsed["sentiment"], "warm");
        assert!(parsed["message"].as_str().unwrap().contains("9800"));
    }
}
