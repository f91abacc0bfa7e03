//! Topic extraction from review text.
//!
//! A [`TopicExtractor`] turns a day's reviews into [`ExtractionRecord`]s that
//! carry free-text ("raw") topic labels. Those labels are not yet comparable
//! across reviews; the taxonomy module consolidates them afterwards.

mod error;
mod llm;
mod seeds;

pub use error::ExtractError;
pub use llm::{DEFAULT_EXTRACTION_CHUNK_SIZE, LlmTopicExtractor, build_extraction_prompt};
pub use seeds::{DEFAULT_SEED_TOPICS, default_seed_topics, load_seed_topics, parse_seed_topics};

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::reviews::Review;

/// Rationale recorded for reviews whose extraction call failed.
pub const EXTRACTION_ERROR_REASONING: &str = "error";

/// Topics extracted from one review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Identifier of the source review.
    pub review_id: String,
    /// Raw topic labels, in the order the extractor produced them.
    pub topics: Vec<String>,
    /// Review text.
    pub content: String,
    /// Short rationale from the extractor (`"error"` when extraction failed).
    #[serde(default)]
    pub reasoning: String,
}

impl ExtractionRecord {
    /// Record for a review whose extraction failed: no topics, rationale `"error"`.
    #[must_use]
    pub fn failed(review: &Review) -> Self {
        Self {
            review_id: review.review_id.clone(),
            topics: Vec::new(),
            content: review.content.clone(),
            reasoning: EXTRACTION_ERROR_REASONING.to_string(),
        }
    }
}

/// Trait that all topic extractors implement.
///
/// Extraction never fails as a whole: problems are logged and surface as
/// records with empty topic lists.
#[async_trait]
pub trait TopicExtractor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Extracts raw topics from `reviews`.
    async fn extract(&self, reviews: &[Review]) -> Vec<ExtractionRecord>;
}

/// Distinct raw topics across `records`, sorted.
#[must_use]
pub fn unique_topics(records: &[ExtractionRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|record| record.topics.iter().cloned())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(topics: &[&str]) -> ExtractionRecord {
        ExtractionRecord {
            review_id: "r".to_string(),
            topics: topics.iter().map(ToString::to_string).collect(),
            content: String::new(),
            reasoning: String::new(),
        }
    }

    #[test]
    fn test_unique_topics_dedupes_and_sorts() {
        let records = vec![
            record(&["Food cold", "Late delivery"]),
            record(&["Food cold"]),
            record(&[]),
            record(&["App crashes"]),
        ];
        let unique: Vec<String> = unique_topics(&records).into_iter().collect();
        assert_eq!(unique, vec!["App crashes", "Food cold", "Late delivery"]);
    }

    #[test]
    fn test_unique_topics_empty_input() {
        assert!(unique_topics(&[]).is_empty());
    }

    #[test]
    fn test_record_reasoning_defaults_when_absent() {
        let json = r#"{"review_id":"1","topics":["Food cold"],"content":"cold food"}"#;
        let parsed: ExtractionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.reasoning, "");
    }
}
