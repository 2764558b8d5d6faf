//! Supported response languages.

use serde::{Deserialize, Serialize};

/// Languages the dialogue layer can respond in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Ta,
    Te,
    Mr,
}

impl Language {
    /// ISO 639-1 tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Ta => "ta",
            Language::Te => "te",
            Language::Mr => "mr",
        }
    }

    /// Parses a language tag, falling back to English for anything unknown.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "hi" => Language::Hi,
            "ta" => Language::Ta,
            "te" => Language::Te,
            "mr" => Language::Mr,
            _ => Language::En,
        }
    }
}
