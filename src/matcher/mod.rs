//! Semantic matcher capability used by the consolidation engine.
//!
//! A matcher answers two questions about free-text topic labels:
//! - how should a batch of raw labels be grouped when no taxonomy exists yet
//! - does one new label mean the same as an existing canonical label
//!
//! Matchers are untrusted. The engine validates every answer and treats
//! errors as "new concept", so implementations should report problems as
//! [`MatcherError`] rather than guessing.
//!
//! # Implementations
//!
//! - [`LlmSemanticMatcher`] - asks a generative model via [`crate::llm::LlmClient`]
//! - [`LexicalMatcher`] - offline, normalization plus Jaro-Winkler similarity

mod error;
mod lexical;
mod llm;

pub use error::MatcherError;
pub use lexical::{DEFAULT_SIMILARITY_THRESHOLD, LexicalMatcher, normalize_label};
pub use llm::{LlmSemanticMatcher, build_initial_taxonomy_prompt, build_match_prompt};

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::taxonomy::TopicMapping;

/// Trait that all semantic matchers implement.
///
/// # Object Safety
///
/// This trait uses `async_trait` so the engine can hold a `Box<dyn SemanticMatcher>`.
#[async_trait]
pub trait SemanticMatcher: Send + Sync {
    /// Returns the matcher's name (e.g., "llm", "lexical").
    fn name(&self) -> &str;

    /// Partitions `raw_topics` into groups of equivalent meaning.
    ///
    /// The returned mapping should contain one entry per input topic, each
    /// pointing at the group's canonical name. The engine repairs gaps.
    async fn propose_initial_taxonomy(
        &self,
        raw_topics: &[String],
    ) -> Result<TopicMapping, MatcherError>;

    /// Returns either a member of `candidates` that means the same as
    /// `raw_topic`, or `raw_topic` itself to declare a new concept.
    async fn match_or_create(
        &self,
        raw_topic: &str,
        candidates: &BTreeSet<String>,
    ) -> Result<String, MatcherError>;
}

/// Supported matcher backends, as selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatcherKind {
    /// Generative model backend.
    #[default]
    Llm,
    /// Offline rule-based backend.
    Lexical,
}

impl MatcherKind {
    /// Returns the stable string label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Lexical => "lexical",
        }
    }
}
