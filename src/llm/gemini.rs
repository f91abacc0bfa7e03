//! Google Gemini client over the Generative Language REST API.
//!
//! Calls `POST {base}/v1beta/models/{model}:generateContent` and returns the
//! concatenated text parts of the first candidate.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::http_client::{HttpTimeouts, build_http_client};

use super::retry::parse_retry_after;
use super::{GenerationOptions, LlmClient, LlmError, RetryDecision, RetryPolicy};

/// Default Generative Language API base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const PROVIDER: &str = "gemini";

// ==================== Gemini API Request/Response Types ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl From<&GenerationOptions> for GenerationConfig {
    fn from(options: &GenerationOptions) -> Self {
        Self {
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            max_output_tokens: options.max_output_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

// ==================== GeminiClient ====================

/// Gemini LLM client.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    retry_policy: RetryPolicy,
}

impl GeminiClient {
    /// Creates a client against the public Gemini endpoint.
    ///
    /// A missing API key is not an error here; every request fails with
    /// [`LlmError::MissingApiKey`] instead, so runs that never reach the
    /// model (e.g., no reviews) still work without one.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ClientBuild`] if HTTP client construction fails.
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, model, DEFAULT_GEMINI_BASE_URL, timeouts)
    }

    /// Creates a client with a custom base URL (for proxies and wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ClientBuild`] if HTTP client construction fails.
    pub fn with_base_url(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, LlmError> {
        let client = build_http_client(timeouts)
            .map_err(|e| LlmError::client_build(PROVIDER, &e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Replaces the transport retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn request_once(
        &self,
        api_key: &str,
        body: &GenerateContentRequest<'_>,
    ) -> Result<String, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(PROVIDER, &e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after);
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::http_status(
                PROVIDER,
                status.as_u16(),
                &text,
                retry_after,
            ));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::invalid_response(PROVIDER, &e.to_string()))?;
        extract_text(parsed)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self, prompt, options), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::missing_api_key(PROVIDER))?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig::from(options),
        };

        let mut attempt: u32 = 1;
        loop {
            match self.request_once(api_key, &body).await {
                Ok(text) => {
                    debug!(attempt, response_chars = text.len(), "Gemini call succeeded");
                    return Ok(text);
                }
                Err(error) => match self.retry_policy.should_retry_error(&error, attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next,
                    } => {
                        warn!(
                            error = %error,
                            attempt,
                            delay_ms = delay.as_millis(),
                            "Gemini call failed; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt = next;
                    }
                    RetryDecision::DoNotRetry { reason } => {
                        debug!(attempt, %reason, "Gemini call not retried");
                        return Err(error);
                    }
                },
            }
        }
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map_or_else(
                || "no candidates".to_string(),
                |block| format!("prompt blocked ({block})"),
            );
        return Err(LlmError::empty_response(PROVIDER, &reason));
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .map_or_else(|| "empty text".to_string(), |r| format!("finish reason {r}"));
        return Err(LlmError::empty_response(PROVIDER, &reason));
    }
    Ok(text)
}
