//! Error types for review sources.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading reviews.
#[derive(Debug, Error)]
pub enum ReviewSourceError {
    /// The review export file could not be read.
    #[error("cannot read reviews from {path}: {source}")]
    Io {
        /// File that failed to open or read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The review export file is not a JSON array of reviews.
    #[error("invalid review file {path}: {reason}\n  Suggestion: {suggestion}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser message.
        reason: String,
        /// What the file should look like.
        suggestion: &'static str,
    },

    /// The review API base URL is malformed.
    #[error("invalid review API URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Network-level error talking to the review API.
    #[error("network error fetching reviews from {url}: {source}")]
    Network {
        /// Page URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The review API answered with a non-success status.
    #[error("HTTP {status} fetching reviews from {url}")]
    HttpStatus {
        /// Page URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The review API answered with a body that is not a review page.
    #[error("invalid review page from {url}: {reason}")]
    InvalidResponse {
        /// Page URL.
        url: String,
        /// Decoder message.
        reason: String,
    },

    /// HTTP client construction failed.
    #[error("failed to build HTTP client for review source: {reason}")]
    ClientBuild {
        /// Builder message.
        reason: String,
    },
}

impl ReviewSourceError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error for a review export file.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
            suggestion: "Provide a JSON array of objects with review_id, content, score and at (ISO-8601) fields",
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a client build error.
    pub fn client_build(reason: impl Into<String>) -> Self {
        Self::ClientBuild {
            reason: reason.into(),
        }
    }
}
