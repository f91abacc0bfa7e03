//! Semantic matcher backed by a generative model.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::llm::{
    DEFAULT_CONSOLIDATION_TEMPERATURE, GenerationOptions, LlmClient, clean_label_response,
    extract_json_from_response,
};
use crate::taxonomy::TopicMapping;

use super::{MatcherError, SemanticMatcher};

const BACKEND: &str = "llm";

/// Builds the prompt asking the model to partition a first batch of topics.
#[must_use]
pub fn build_initial_taxonomy_prompt(raw_topics: &[String]) -> String {
    let mut prompt = String::from(
        "You maintain a taxonomy of issues and requests mentioned in mobile app reviews.\n\
         Group the topics below so that each group refers to exactly one underlying issue \
         or request, and give every group a short, clear canonical name a product team \
         would understand.\n\n\
         Rules:\n\
         1. Compare meaning, not wording: \"Delivery guy rude\" and \"Delivery partner \
         behaved badly\" are the same issue.\n\
         2. Merge conservatively. Keep distinct issues apart: \"Food cold\" is not \"Food stale\".\n\
         3. Prefer consistent terminology across canonical names.\n\
         4. Every topic in the list must appear exactly once as a key in your answer.\n\n\
         Topics:\n",
    );
    for topic in raw_topics {
        let _ = writeln!(prompt, "- {topic}");
    }
    prompt.push_str(
        "\nRespond with ONLY a JSON object mapping each original topic to its canonical name, \
         for example:\n\
         {\"Delivery guy was rude\": \"Delivery partner rude\", \
         \"Delivery partner behaved badly\": \"Delivery partner rude\", \
         \"Food arrived cold\": \"Food cold\"}",
    );
    prompt
}

/// Builds the prompt asking the model to match one new topic.
#[must_use]
pub fn build_match_prompt(raw_topic: &str, candidates: &BTreeSet<String>) -> String {
    let mut prompt = String::from(
        "You maintain a taxonomy of issues and requests mentioned in mobile app reviews.\n\
         Decide whether the new topic below refers to the same underlying issue as one of \
         the existing canonical topics.\n\n\
         Rules:\n\
         1. Match only when both clearly describe the same issue \
         (\"impolite\" and \"rude\" match; \"slow\" and \"crashes\" do not).\n\
         2. When in doubt, do not match. Separate topics are better than a wrong merge.\n\n",
    );
    let _ = writeln!(prompt, "New topic: \"{raw_topic}\"\n");
    prompt.push_str("Existing canonical topics:\n");
    for candidate in candidates {
        let _ = writeln!(prompt, "- {candidate}");
    }
    prompt.push_str(
        "\nRespond with ONLY one line: the matching existing canonical topic copied exactly, \
         or the new topic unchanged if nothing matches. No explanation.",
    );
    prompt
}

/// Semantic matcher that delegates equivalence judgments to an [`LlmClient`].
pub struct LlmSemanticMatcher {
    client: Arc<dyn LlmClient>,
    options: GenerationOptions,
}

impl LlmSemanticMatcher {
    /// Creates a matcher with the default consolidation temperature.
    #[must_use]
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            options: GenerationOptions::default()
                .with_temperature(DEFAULT_CONSOLIDATION_TEMPERATURE),
        }
    }

    /// Overrides the generation options.
    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

impl std::fmt::Debug for LlmSemanticMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSemanticMatcher")
            .field("client", &self.client.name())
            .field("options", &self.options)
            .finish()
    }
}

#[async_trait]
impl SemanticMatcher for LlmSemanticMatcher {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, raw_topics), fields(topics = raw_topics.len()))]
    async fn propose_initial_taxonomy(
        &self,
        raw_topics: &[String],
    ) -> Result<TopicMapping, MatcherError> {
        let prompt = build_initial_taxonomy_prompt(raw_topics);
        let response = self
            .client
            .generate(&prompt, &self.options)
            .await
            .map_err(|e| MatcherError::backend(BACKEND, e))?;

        let json = extract_json_from_response(&response);
        let parsed: TopicMapping = serde_json::from_str(json).map_err(|e| {
            MatcherError::malformed(
                "initial taxonomy",
                &format!("expected a JSON object of strings: {e}"),
            )
        })?;

        let mapping: TopicMapping = parsed
            .into_iter()
            .map(|(raw, canonical)| (raw.trim().to_string(), canonical.trim().to_string()))
            .collect();
        debug!(entries = mapping.len(), "Parsed initial taxonomy proposal");
        Ok(mapping)
    }

    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    async fn match_or_create(
        &self,
        raw_topic: &str,
        candidates: &BTreeSet<String>,
    ) -> Result<String, MatcherError> {
        let prompt = build_match_prompt(raw_topic, candidates);
        let response = self
            .client
            .generate(&prompt, &self.options)
            .await
            .map_err(|e| MatcherError::backend(BACKEND, e))?;

        let label = clean_label_response(&response);
        if label.is_empty() {
            return Err(MatcherError::malformed("match", "empty answer"));
        }
        debug!(%label, "Matcher answered");
        Ok(label)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::llm::LlmError;

    /// Returns canned responses and records the prompts it was given.
    struct CannedClient {
        response: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
        temperatures: Mutex<Vec<f32>>,
    }

    impl CannedClient {
        fn ok(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(response.to_string()),
                prompts: Mutex::new(Vec::new()),
                temperatures: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(()),
                prompts: Mutex::new(Vec::new()),
                temperatures: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for CannedClient {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn generate(
            &self,
            prompt: &str,
            options: &GenerationOptions,
        ) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.temperatures.lock().unwrap().push(options.temperature);
            self.response
                .clone()
                .map_err(|()| LlmError::http_status("canned", 500, "boom", None))
        }
    }

    fn topics(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_initial_prompt_lists_every_topic() {
        let prompt = build_initial_taxonomy_prompt(&topics(&["Food cold", "App slow"]));
        assert!(prompt.contains("- Food cold\n"));
        assert!(prompt.contains("- App slow\n"));
        assert!(prompt.contains("JSON object"));
    }

    #[test]
    fn test_match_prompt_lists_candidates_and_new_topic() {
        let candidates: BTreeSet<String> =
            ["Food cold", "Late delivery"].iter().map(ToString::to_string).collect();
        let prompt = build_match_prompt("Order came late", &candidates);
        assert!(prompt.contains("New topic: \"Order came late\""));
        assert!(prompt.contains("- Food cold\n"));
        assert!(prompt.contains("- Late delivery\n"));
    }

    #[tokio::test]
    async fn test_propose_parses_fenced_json_and_trims() {
        let client = CannedClient::ok(
            "```json\n{\" Food cold \": \"Food cold\", \"Food arrived cold\": \" Food cold\"}\n```",
        );
        let matcher = LlmSemanticMatcher::new(client.clone());

        let mapping = matcher
            .propose_initial_taxonomy(&topics(&["Food arrived cold", "Food cold"]))
            .await
            .unwrap();

        assert_eq!(mapping.get("Food cold").unwrap(), "Food cold");
        assert_eq!(mapping.get("Food arrived cold").unwrap(), "Food cold");
        let temperatures = client.temperatures.lock().unwrap();
        assert!((temperatures[0] - DEFAULT_CONSOLIDATION_TEMPERATURE).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_propose_rejects_non_object() {
        let matcher = LlmSemanticMatcher::new(CannedClient::ok("[\"Food cold\"]"));
        let err = matcher
            .propose_initial_taxonomy(&topics(&["Food cold"]))
            .await
            .unwrap_err();
        assert!(matches!(err, MatcherError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_propose_backend_failure_is_reported() {
        let matcher = LlmSemanticMatcher::new(CannedClient::failing());
        let err = matcher
            .propose_initial_taxonomy(&topics(&["Food cold"]))
            .await
            .unwrap_err();
        assert!(matches!(err, MatcherError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_match_cleans_quoted_answer() {
        let matcher = LlmSemanticMatcher::new(CannedClient::ok("\"Late delivery\"\n"));
        let candidates: BTreeSet<String> = std::iter::once("Late delivery".to_string()).collect();
        let label = matcher
            .match_or_create("Order came late", &candidates)
            .await
            .unwrap();
        assert_eq!(label, "Late delivery");
    }

    #[tokio::test]
    async fn test_match_empty_answer_is_malformed() {
        let matcher = LlmSemanticMatcher::new(CannedClient::ok("  \n "));
        let err = matcher
            .match_or_create("Order came late", &BTreeSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MatcherError::MalformedResponse { .. }));
    }
}
