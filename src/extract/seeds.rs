//! Seed topics that steer extraction toward consistent names.

use std::path::Path;

use tracing::debug;

use super::ExtractError;

/// Built-in seed topics for food-delivery apps.
pub const DEFAULT_SEED_TOPICS: [&str; 14] = [
    "Delivery issue",
    "Food stale",
    "Food cold",
    "Delivery partner rude",
    "Wrong order delivered",
    "Maps not working properly",
    "App crashes",
    "Payment failed",
    "Refund not received",
    "Customer support unresponsive",
    "Late delivery",
    "Missing items",
    "Food quality poor",
    "Packaging damaged",
];

/// [`DEFAULT_SEED_TOPICS`] as owned strings.
#[must_use]
pub fn default_seed_topics() -> Vec<String> {
    DEFAULT_SEED_TOPICS.iter().map(ToString::to_string).collect()
}

/// Parses seed topics from file contents.
///
/// Content starting with `[` is read as a JSON array of strings. Anything
/// else is one topic per line; blank lines and `#` comments are skipped.
/// Topics are trimmed, blanks dropped, and duplicates removed keeping the
/// first occurrence.
///
/// # Errors
///
/// Returns [`ExtractError::SeedFileParse`] for an invalid JSON array.
pub fn parse_seed_topics(path: &Path, contents: &str) -> Result<Vec<String>, ExtractError> {
    let trimmed = contents.trim_start();
    let candidates: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<String>>(trimmed)
            .map_err(|e| ExtractError::seed_parse(path, e.to_string()))?
    } else {
        trimmed
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'))
            .map(ToString::to_string)
            .collect()
    };

    let mut topics: Vec<String> = Vec::with_capacity(candidates.len());
    for topic in candidates {
        let topic = topic.trim();
        if !topic.is_empty() && !topics.iter().any(|t| t == topic) {
            topics.push(topic.to_string());
        }
    }
    Ok(topics)
}

/// Reads seed topics from `path`.
///
/// # Errors
///
/// Returns [`ExtractError::SeedFileRead`] if the file cannot be read, or
/// [`ExtractError::SeedFileParse`] if it is an invalid JSON array.
pub fn load_seed_topics(path: &Path) -> Result<Vec<String>, ExtractError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ExtractError::seed_read(path, e))?;
    let topics = parse_seed_topics(path, &contents)?;
    debug!(path = %path.display(), count = topics.len(), "Loaded seed topics");
    Ok(topics)
}
