//! Synthesis request value type

use crate::cache::CacheKey;

/// One immutable text-to-speech request
///
/// `model` and `voice` are the resolved values (after voice routing),
/// not raw user input; the fingerprint covers every field.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Synthesis model id
    pub model: String,

    /// Voice id (system name or enrolled voice id)
    pub voice: String,

    /// Full text to synthesize
    pub text: String,

    /// Language hint; "auto" when the caller gave none
    pub language: String,

    /// Optional style instruction
    pub instruction: Option<String>,

    /// Speech rate multiplier, typically 0.5-2.0
    pub speech_rate: f64,
}

impl SynthesisRequest {
    /// Build a request with default language ("auto") and rate (1.0)
    pub fn new(
        model: impl Into<String>,
        voice: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            voice: voice.into(),
            text: text.into(),
            language: "auto".to_string(),
            instruction: None,
            speech_rate: 1.0,
        }
    }

    /// Deterministic cache fingerprint over every request field
    #[must_use]
    pub fn fingerprint(&self) -> CacheKey {
        let canonical = format!(
            "{}:{}:{}:{}:{}:{:.1}",
            self.model,
            self.voice,
            self.language,
            self.instruction.as_deref().unwrap_or(""),
            self.text,
            self.speech_rate
        );
        CacheKey::digest(canonical)
    }
}
