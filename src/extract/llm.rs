//! Topic extraction backed by a generative model.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::llm::{GenerationOptions, LlmClient, extract_json_from_response};
use crate::reviews::Review;

use super::{ExtractError, ExtractionRecord, TopicExtractor};

/// Reviews sent per model call.
pub const DEFAULT_EXTRACTION_CHUNK_SIZE: usize = 30;

#[derive(Debug, Deserialize)]
struct ChunkEntry {
    review_index: usize,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Builds the extraction prompt for one chunk of reviews.
///
/// Reviews are numbered from 1; the model echoes that number back as
/// `review_index`.
#[must_use]
pub fn build_extraction_prompt(reviews: &[Review], seed_topics: &[String]) -> String {
    let mut prompt = String::from(
        "You analyze mobile app reviews for a product team.\n\
         For each review, list the actionable topics it raises: issues, complaints, \
         feature requests, or specific feedback.\n\n\
         Guidelines:\n\
         1. Be specific but concise (\"Delivery partner rude\", not \"delivery\").\n\
         2. Use the same name every time the same concept comes up.\n\
         3. A review can have several topics, or none if nothing is actionable.\n\
         4. Prefer a seed topic when one fits; otherwise create a new name.\n\n\
         Example:\n\
         Review: \"The delivery guy was extremely rude and the food arrived cold\"\n\
         Topics: [\"Delivery partner rude\", \"Food cold\"]\n",
    );

    if !seed_topics.is_empty() {
        prompt.push_str("\nSeed topics:\n");
        for topic in seed_topics {
            let _ = writeln!(prompt, "- {topic}");
        }
    }

    prompt.push_str("\nReviews:\n");
    for (index, review) in reviews.iter().enumerate() {
        let _ = writeln!(prompt, "Review {}: {}\n", index + 1, review.content.trim());
    }

    prompt.push_str(
        "Respond with ONLY a JSON array with one element per review, in order:\n\
         [{\"review_index\": 1, \"topics\": [\"topic\"], \"reasoning\": \"brief reason\"}]",
    );
    prompt
}

/// [`TopicExtractor`] that prompts an [`LlmClient`] in fixed-size chunks.
pub struct LlmTopicExtractor {
    client: Arc<dyn LlmClient>,
    seed_topics: Vec<String>,
    options: GenerationOptions,
    chunk_size: usize,
}

impl LlmTopicExtractor {
    /// Creates an extractor with the default chunk size and sampling options.
    #[must_use]
    pub fn new(client: Arc<dyn LlmClient>, seed_topics: Vec<String>) -> Self {
        Self {
            client,
            seed_topics,
            options: GenerationOptions::default(),
            chunk_size: DEFAULT_EXTRACTION_CHUNK_SIZE,
        }
    }

    /// Overrides the generation options.
    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the number of reviews per model call (minimum 1).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    async fn extract_chunk(&self, chunk: &[Review]) -> Result<Vec<ExtractionRecord>, ExtractError> {
        let prompt = build_extraction_prompt(chunk, &self.seed_topics);
        let response = self
            .client
            .generate(&prompt, &self.options)
            .await
            .map_err(ExtractError::backend)?;

        let entries: Vec<ChunkEntry> = serde_json::from_str(extract_json_from_response(&response))
            .map_err(|e| ExtractError::malformed(format!("expected a JSON array of review entries: {e}")))?;

        Ok(match_entries(chunk, &entries))
    }
}

/// Pairs model entries with reviews by 1-based index.
///
/// The first entry for an index wins. Reviews without an entry are dropped.
fn match_entries(chunk: &[Review], entries: &[ChunkEntry]) -> Vec<ExtractionRecord> {
    let mut records = Vec::with_capacity(chunk.len());
    for (offset, review) in chunk.iter().enumerate() {
        let Some(entry) = entries.iter().find(|e| e.review_index == offset + 1) else {
            debug!(review_id = %review.review_id, "No extraction entry for review; skipping");
            continue;
        };
        let topics = entry
            .topics
            .iter()
            .map(|topic| topic.trim())
            .filter(|topic| !topic.is_empty())
            .map(ToString::to_string)
            .collect();
        records.push(ExtractionRecord {
            review_id: review.review_id.clone(),
            topics,
            content: review.content.clone(),
            reasoning: entry.reasoning.clone().unwrap_or_default(),
        });
    }
    records
}

impl std::fmt::Debug for LlmTopicExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmTopicExtractor")
            .field("client", &self.client.name())
            .field("seed_topics", &self.seed_topics.len())
            .field("options", &self.options)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

#[async_trait]
impl TopicExtractor for LlmTopicExtractor {
    fn name(&self) -> &'static str {
        "llm"
    }

    #[instrument(skip(self, reviews), fields(reviews = reviews.len(), chunk_size = self.chunk_size))]
    async fn extract(&self, reviews: &[Review]) -> Vec<ExtractionRecord> {
        let mut records = Vec::with_capacity(reviews.len());

        for (chunk_index, chunk) in reviews.chunks(self.chunk_size).enumerate() {
            match self.extract_chunk(chunk).await {
                Ok(chunk_records) => {
                    let skipped = chunk.len() - chunk_records.len();
                    if skipped > 0 {
                        warn!(chunk = chunk_index, skipped, "Model skipped some reviews");
                    }
                    records.extend(chunk_records);
                }
                Err(error) => {
                    warn!(
                        chunk = chunk_index,
                        reviews = chunk.len(),
                        error = %error,
                        "Topic extraction failed for chunk; recording empty topics"
                    );
                    records.extend(chunk.iter().map(ExtractionRecord::failed));
                }
            }
        }

        records
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::llm::LlmError;

    /// Pops one canned response per call.
    struct ScriptedClient {
        responses: Mutex<Vec<Result<String, ()>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<&str, ()>>) -> Arc<Self> {
            let mut responses: Vec<Result<String, ()>> = responses
                .into_iter()
                .map(|r| r.map(ToString::to_string))
                .collect();
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(()))
                .map_err(|()| LlmError::http_status("scripted", 503, "unavailable", None))
        }
    }

    fn review(id: &str, content: &str) -> Review {
        Review {
            review_id: id.to_string(),
            content: content.to_string(),
            score: 1,
            at: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_prompt_numbers_reviews_and_lists_seeds() {
        let prompt = build_extraction_prompt(
            &[review("a", "Food cold"), review("b", "Rude driver")],
            &["Late delivery".to_string()],
        );
        assert!(prompt.contains("Review 1: Food cold"));
        assert!(prompt.contains("Review 2: Rude driver"));
        assert!(prompt.contains("- Late delivery"));
    }

    #[test]
    fn test_prompt_without_seeds_has_no_seed_section() {
        let prompt = build_extraction_prompt(&[review("a", "x")], &[]);
        assert!(!prompt.contains("Seed topics:"));
    }

    #[tokio::test]
    async fn test_extract_maps_entries_by_index_and_trims() {
        let client = ScriptedClient::new(vec![Ok(
            r#"```json
[{"review_index": 2, "topics": [" Delivery partner rude ", ""], "reasoning": "driver"},
 {"review_index": 1, "topics": ["Food cold"], "reasoning": "temperature"}]
```"#,
        )]);
        let extractor = LlmTopicExtractor::new(client, Vec::new());

        let records = extractor
            .extract(&[review("a", "cold food"), review("b", "rude driver")])
            .await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].review_id, "a");
        assert_eq!(records[0].topics, vec!["Food cold"]);
        assert_eq!(records[1].topics, vec!["Delivery partner rude"]);
        assert_eq!(records[1].reasoning, "driver");
    }

    #[tokio::test]
    async fn test_extract_drops_reviews_without_entry() {
        let client = ScriptedClient::new(vec![Ok(
            r#"[{"review_index": 1, "topics": ["Food cold"]}]"#,
        )]);
        let extractor = LlmTopicExtractor::new(client, Vec::new());

        let records = extractor
            .extract(&[review("a", "cold"), review("b", "fine")])
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reasoning, "");
    }

    #[tokio::test]
    async fn test_extract_chunks_and_isolates_failures() {
        let client = ScriptedClient::new(vec![
            Ok(r#"[{"review_index": 1, "topics": ["A"]}, {"review_index": 2, "topics": ["B"]}]"#),
            Err(()),
        ]);
        let extractor = LlmTopicExtractor::new(client.clone(), Vec::new()).with_chunk_size(2);

        let records = extractor
            .extract(&[review("1", "a"), review("2", "b"), review("3", "c")])
            .await;

        assert_eq!(client.prompts.lock().unwrap().len(), 2);
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].topics, vec!["B"]);
        assert!(records[2].topics.is_empty());
        assert_eq!(records[2].reasoning, "error");
    }

    #[tokio::test]
    async fn test_extract_malformed_response_marks_chunk_failed() {
        let client = ScriptedClient::new(vec![Ok("I could not parse these reviews.")]);
        let extractor = LlmTopicExtractor::new(client, Vec::new());

        let records = extractor.extract(&[review("a", "x")]).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reasoning, "error");
    }

    #[tokio::test]
    async fn test_extract_empty_input_makes_no_calls() {
        let client = ScriptedClient::new(Vec::new());
        let extractor = LlmTopicExtractor::new(client.clone(), Vec::new());

        assert!(extractor.extract(&[]).await.is_empty());
        assert!(client.prompts.lock().unwrap().is_empty());
    }
}
