//! Shared HTTP client construction policy.
//!
//! Keeps the LLM client and the review API client consistent on timeouts,
//! user agent, and compression.

use std::time::Duration;

use reqwest::Client;

use crate::user_agent;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default read timeout in seconds. Model calls can take a while on large prompts.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Connect and read timeouts for an HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP/TLS connect timeout.
    pub connect: Duration,
    /// Whole-request timeout.
    pub read: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

impl HttpTimeouts {
    /// Creates timeouts from whole seconds.
    #[must_use]
    pub fn from_secs(connect_secs: u64, read_secs: u64) -> Self {
        Self {
            connect: Duration::from_secs(connect_secs),
            read: Duration::from_secs(read_secs),
        }
    }
}

/// Builds an HTTP client using the shared project policy.
///
/// # Errors
///
/// Returns the underlying reqwest error when the TLS backend or proxy
/// configuration cannot be initialized.
pub fn build_http_client(timeouts: HttpTimeouts) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.read)
        .user_agent(user_agent::default_user_agent())
        .gzip(true)
        .build()
}
