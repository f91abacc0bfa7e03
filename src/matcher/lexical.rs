//! Offline rule-based matcher.
//!
//! Labels are normalized (case, whitespace, trailing punctuation) and compared
//! with Jaro-Winkler similarity. This catches spelling and casing variants
//! ("App crashes", "app crashes!") but not true paraphrases, so it produces a
//! finer taxonomy than the LLM matcher. Useful for dry runs and tests.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::taxonomy::TopicMapping;

use super::{MatcherError, SemanticMatcher};

/// Default minimum Jaro-Winkler similarity for two labels to match.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.92;

/// Normalizes a topic label for comparison.
///
/// Normalization steps:
/// 1. Trim and lowercase
/// 2. Collapse internal whitespace runs to one space
/// 3. Strip trailing punctuation
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let collapsed = label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(['.', ',', '!', '?', ';', ':'])
        .trim_end()
        .to_string()
}

/// Rule-based [`SemanticMatcher`].
#[derive(Debug, Clone)]
pub struct LexicalMatcher {
    threshold: f64,
}

impl Default for LexicalMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl LexicalMatcher {
    /// Creates a matcher with a custom similarity threshold (clamped to `0.0..=1.0`).
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    fn similarity(a: &str, b: &str) -> f64 {
        if a == b {
            1.0
        } else {
            strsim::jaro_winkler(a, b)
        }
    }

    /// Returns the best candidate at or above the threshold.
    /// Earlier candidates win ties.
    fn best_match<'a, I>(&self, normalized: &str, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut best: Option<(&str, f64)> = None;
        for (label, candidate_normalized) in candidates {
            let score = Self::similarity(normalized, candidate_normalized);
            if score < self.threshold {
                continue;
            }
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((label, score));
            }
        }
        best.map(|(label, _)| label)
    }
}

#[async_trait]
impl SemanticMatcher for LexicalMatcher {
    fn name(&self) -> &'static str {
        "lexical"
    }

    #[instrument(skip(self, raw_topics), fields(topics = raw_topics.len()))]
    async fn propose_initial_taxonomy(
        &self,
        raw_topics: &[String],
    ) -> Result<TopicMapping, MatcherError> {
        // (canonical label, normalized form) for each group, in creation order
        let mut groups: Vec<(String, String)> = Vec::new();
        let mut mapping = TopicMapping::new();

        for raw in raw_topics {
            let normalized = normalize_label(raw);
            let canonical = self
                .best_match(
                    &normalized,
                    groups.iter().map(|(label, norm)| (label.as_str(), norm.as_str())),
                )
                .map(ToString::to_string);
            let canonical = if let Some(existing) = canonical {
                existing
            } else {
                groups.push((raw.clone(), normalized));
                raw.clone()
            };
            mapping.insert(raw.clone(), canonical);
        }

        debug!(groups = groups.len(), "Lexical grouping complete");
        Ok(mapping)
    }

    async fn match_or_create(
        &self,
        raw_topic: &str,
        candidates: &BTreeSet<String>,
    ) -> Result<String, MatcherError> {
        let normalized = normalize_label(raw_topic);
        let normalized_candidates: Vec<(&str, String)> = candidates
            .iter()
            .map(|candidate| (candidate.as_str(), normalize_label(candidate)))
            .collect();

        let matched = self.best_match(
            &normalized,
            normalized_candidates
                .iter()
                .map(|(label, norm)| (*label, norm.as_str())),
        );
        Ok(matched.unwrap_or(raw_topic).to_string())
    }
}
