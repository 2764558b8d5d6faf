//! Dialogue model adapters.

mod openai;
mod template;

pub use openai::{OpenAiDialogueConfig, OpenAiDialogueModel};
pub use template::TemplateDialogueModel;
