//! Error types for LLM client operations.
//!
//! Follows the What/Why/Fix pattern used across the project.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to a generative model API.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured for the provider
    #[error("{provider} API key not configured\n  Suggestion: Set GEMINI_API_KEY in the environment")]
    MissingApiKey {
        /// Provider name
        provider: String,
    },

    /// The request never produced an HTTP response
    #[error("{provider} request failed: {reason}\n  Suggestion: Check your network connection")]
    Request {
        /// Provider name
        provider: String,
        /// Transport-level failure description
        reason: String,
    },

    /// The request exceeded the client read timeout
    #[error("{provider} request timed out\n  Suggestion: Raise `llm_timeout_secs` or retry later")]
    Timeout {
        /// Provider name
        provider: String,
    },

    /// The API answered with a non-success status
    #[error("{provider} returned HTTP {status}: {body}\n  Suggestion: {suggestion}")]
    HttpStatus {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
        /// Server-requested delay before retrying (from `Retry-After`)
        retry_after: Option<Duration>,
        /// How to fix the issue
        suggestion: String,
    },

    /// The API answered but carried no generated text
    #[error("{provider} returned no generated text: {reason}")]
    EmptyResponse {
        /// Provider name
        provider: String,
        /// Why the response was considered empty (e.g., finish reason)
        reason: String,
    },

    /// The response body could not be decoded
    #[error("{provider} response could not be decoded: {reason}")]
    InvalidResponse {
        /// Provider name
        provider: String,
        /// Decode failure description
        reason: String,
    },

    /// The HTTP client could not be constructed
    #[error("{provider} HTTP client construction failed: {reason}")]
    ClientBuild {
        /// Provider name
        provider: String,
        /// Builder failure description
        reason: String,
    },
}

/// Maximum response body characters kept in error messages.
const MAX_BODY_CHARS: usize = 300;

impl LlmError {
    /// Creates a `MissingApiKey` error.
    #[must_use]
    pub fn missing_api_key(provider: &str) -> Self {
        Self::MissingApiKey {
            provider: provider.to_string(),
        }
    }

    /// Classifies a reqwest transport error into `Timeout` or `Request`.
    #[must_use]
    pub fn from_transport(provider: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else {
            Self::Request {
                provider: provider.to_string(),
                reason: error.to_string(),
            }
        }
    }

    /// Creates an `HttpStatus` error with a status-specific suggestion.
    #[must_use]
    pub fn http_status(
        provider: &str,
        status: u16,
        body: &str,
        retry_after: Option<Duration>,
    ) -> Self {
        let suggestion = match status {
            400 => "Check the model name and generation settings",
            401 | 403 => "Check that GEMINI_API_KEY is valid for this model",
            404 => "Check the model name; it may not exist for this API version",
            429 => "Rate limit exceeded; wait and retry, or reduce the review volume",
            s if s >= 500 => "The model API is unavailable; try again later",
            _ => "Inspect the response body for details",
        };
        Self::HttpStatus {
            provider: provider.to_string(),
            status,
            body: body.chars().take(MAX_BODY_CHARS).collect(),
            retry_after,
            suggestion: suggestion.to_string(),
        }
    }

    /// Creates an `EmptyResponse` error.
    #[must_use]
    pub fn empty_response(provider: &str, reason: &str) -> Self {
        Self::EmptyResponse {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates an `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(provider: &str, reason: &str) -> Self {
        Self::InvalidResponse {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `ClientBuild` error.
    #[must_use]
    pub fn client_build(provider: &str, reason: &str) -> Self {
        Self::ClientBuild {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }
}
