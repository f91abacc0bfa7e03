//! Generative model client abstraction.
//!
//! The topic extractor and the LLM-backed semantic matcher both talk to a
//! model through [`LlmClient`], so tests can swap in canned responses and a
//! different vendor only needs one new implementation.
//!
//! # Architecture
//!
//! - [`LlmClient`] - Async trait: one prompt in, generated text out
//! - [`GeminiClient`] - Google Generative Language API over `reqwest`
//! - [`GenerationOptions`] - Sampling settings per call site
//! - [`RetryPolicy`] - Transport-level backoff for 429/5xx/timeouts

mod error;
mod gemini;
mod retry;

pub use error::LlmError;
pub use gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiClient};
pub use retry::{
    DEFAULT_LLM_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error,
    parse_retry_after,
};

use async_trait::async_trait;

/// Default sampling temperature for topic extraction.
pub const DEFAULT_EXTRACTION_TEMPERATURE: f32 = 0.7;

/// Default sampling temperature for consolidation; lower for consistent naming.
pub const DEFAULT_CONSOLIDATION_TEMPERATURE: f32 = 0.3;

/// Default cap on generated tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Sampling settings sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling mass.
    pub top_p: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Maximum generated tokens.
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_EXTRACTION_TEMPERATURE,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl GenerationOptions {
    /// Returns a copy with a different temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns a copy with a different output token cap.
    #[must_use]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// Trait for generative model backends.
///
/// # Object Safety
///
/// Uses `async_trait` so callers can share an `Arc<dyn LlmClient>`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// The provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Generates text for a single-turn prompt.
    async fn generate(&self, prompt: &str, options: &GenerationOptions)
    -> Result<String, LlmError>;
}

/// Extracts the JSON payload from a model response.
///
/// Handles ```` ```json ```` fences, bare ```` ``` ```` fences, and prose
/// around a raw object or array. Returns the trimmed input unchanged when no
/// JSON delimiters are found.
#[must_use]
pub fn extract_json_from_response(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let json_start = start + "```json".len();
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        if let Some(end) = trimmed[content_start..].find("```") {
            let inner = &trimmed[content_start..content_start + end];
            // Skip a language tag on the fence line, if any.
            let inner = match inner.find(['{', '[']) {
                Some(pos) => &inner[pos..],
                None => inner,
            };
            return inner.trim();
        }
    }

    let object = trimmed.find('{').zip(trimmed.rfind('}'));
    let array = trimmed.find('[').zip(trimmed.rfind(']'));
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if a.0 < o.0 { a } else { o }),
        (Some(o), None) => Some(o),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    };
    match span {
        Some((start, end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Cleans a single-label model answer.
///
/// Strips code fences, surrounding whitespace, and surrounding quote
/// characters, and keeps only the first non-empty line.
#[must_use]
pub fn clean_label_response(response: &str) -> String {
    let without_fences = response.trim().trim_matches('`').trim();
    let first_line = without_fences
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    first_line
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}
