//! Error types for topic extraction.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;

/// Errors that can occur while extracting topics or loading seed topics.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The model call failed.
    #[error("topic extraction call failed: {source}")]
    Backend {
        /// The underlying client error.
        #[source]
        source: LlmError,
    },

    /// The model answered with something that is not a list of review topics.
    #[error("topic extraction response is malformed: {reason}")]
    MalformedResponse {
        /// What was wrong with the response.
        reason: String,
    },

    /// The seed topic file could not be read.
    #[error("cannot read seed topics from {path}: {source}")]
    SeedFileRead {
        /// Seed topic file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The seed topic file looks like JSON but is not an array of strings.
    #[error("invalid seed topics file {path}: {reason}\n  Suggestion: {suggestion}")]
    SeedFileParse {
        /// Seed topic file.
        path: PathBuf,
        /// Parser message.
        reason: String,
        /// What the file should look like.
        suggestion: &'static str,
    },
}

impl ExtractError {
    /// Wraps a client error.
    #[must_use]
    pub fn backend(source: LlmError) -> Self {
        Self::Backend { source }
    }

    /// Creates a malformed response error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Creates a seed file read error.
    pub fn seed_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SeedFileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a seed file parse error.
    pub fn seed_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SeedFileParse {
            path: path.into(),
            reason: reason.into(),
            suggestion: "Use a JSON array of strings, or plain text with one topic per line",
        }
    }
}
