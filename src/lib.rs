//! Review Trends Core Library
//!
//! Turns a month of app-store reviews into a daily topic trend report. Review
//! text yields free-form topic labels, a consolidation engine folds those
//! labels into a stable canonical taxonomy, and per-topic daily counts are
//! aggregated into a trend table plus trending and emerging insights.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`reviews`] - Review sources (local JSON export, paginated HTTP API)
//! - [`extract`] - Raw topic extraction from review text
//! - [`taxonomy`] - Taxonomy store and the incremental consolidation engine
//! - [`matcher`] - Semantic matcher backends used by the engine
//! - [`llm`] - Generative model client (Gemini) with transport retries
//! - [`trends`] - Per-day topic counts, trending and emerging topics
//! - [`report`] - CSV/JSON output files
//! - [`pipeline`] - The end-to-end run

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod extract;
pub mod http_client;
pub mod llm;
pub mod matcher;
pub mod pipeline;
pub mod report;
pub mod reviews;
pub mod taxonomy;
pub mod trends;
mod user_agent;

// Re-export commonly used types
pub use extract::{ExtractionRecord, LlmTopicExtractor, TopicExtractor, unique_topics};
pub use http_client::HttpTimeouts;
pub use llm::{GeminiClient, GenerationOptions, LlmClient, LlmError, RetryPolicy};
pub use matcher::{LexicalMatcher, LlmSemanticMatcher, MatcherError, MatcherKind, SemanticMatcher};
pub use pipeline::{Pipeline, PipelineError, PipelineOptions, PipelineOutcome, RunSummary};
pub use report::{ReportError, ReportPaths, RunMetadata};
pub use reviews::{HttpReviewSource, JsonFileSource, Review, ReviewSource, ReviewSourceError};
pub use taxonomy::{
    ConsolidationEngine, TaxonomyError, TaxonomySnapshot, TaxonomyStore, TopicMapping,
    apply_mapping,
};
pub use trends::{EmergingTopic, TopicFrequency, TrendAnalyzer, TrendReport};
