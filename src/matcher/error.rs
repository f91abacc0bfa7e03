//! Error types for semantic matcher operations.

use std::time::Duration;

use thiserror::Error;

use crate::llm::LlmError;

/// Errors a semantic matcher can report.
///
/// Every variant is recoverable: the consolidation engine logs it and falls
/// back to treating the affected topics as new concepts.
#[derive(Debug, Error)]
pub enum MatcherError {
    /// The model backend could not produce a response
    #[error("matcher backend '{backend}' failed: {source}")]
    Backend {
        /// Backend name (e.g., "llm")
        backend: String,
        /// Underlying LLM error
        #[source]
        source: LlmError,
    },

    /// The backend answered but the answer could not be interpreted
    #[error("malformed {operation} response: {reason}\n  Suggestion: {suggestion}")]
    MalformedResponse {
        /// Which matcher operation produced the response
        operation: String,
        /// What was wrong with it
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The call did not finish within the configured deadline
    #[error("{operation} timed out after {}s\n  Suggestion: Raise `matcher_timeout_secs` if the model is slow", timeout.as_secs())]
    Timeout {
        /// Which matcher operation timed out
        operation: String,
        /// The deadline that was exceeded
        timeout: Duration,
    },
}

impl MatcherError {
    /// Wraps an LLM error raised by a model-backed matcher.
    #[must_use]
    pub fn backend(backend: &str, source: LlmError) -> Self {
        Self::Backend {
            backend: backend.to_string(),
            source,
        }
    }

    /// Creates a `MalformedResponse` error.
    #[must_use]
    pub fn malformed(operation: &str, reason: &str) -> Self {
        Self::MalformedResponse {
            operation: operation.to_string(),
            reason: reason.to_string(),
            suggestion: "Lower the generation temperature or check the model's output format"
                .to_string(),
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(operation: &str, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
            timeout,
        }
    }
}
