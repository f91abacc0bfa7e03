//! Topic taxonomy consolidation.
//!
//! Review text yields free-form topic labels: "Delivery guy was rude",
//! "Delivery partner behaved badly", "Food arrived cold". Counting them as-is
//! fragments every trend, so this module maintains a run-wide taxonomy that
//! maps each raw label to one canonical label.
//!
//! # Architecture
//!
//! - [`TaxonomyStore`] - append-only raw → canonical table plus canonical set
//! - [`ConsolidationEngine`] - grows the store batch by batch via a
//!   [`crate::matcher::SemanticMatcher`]
//! - [`apply_mapping`] - rewrites extraction records into canonical topics
//!
//! # Invariants
//!
//! - every canonical value in the table is a member of the canonical set
//! - a raw topic's canonical value never changes once recorded
//! - a raw topic seen again never triggers another matcher call

mod apply;
mod engine;
mod error;
mod store;

pub use apply::apply_mapping;
pub use engine::{
    ConsolidationEngine, ConsolidationStats, DEFAULT_MATCHER_TIMEOUT, repair_initial_taxonomy,
};
pub use error::TaxonomyError;
pub use store::TaxonomyStore;

use std::collections::BTreeMap;

use serde::Serialize;

/// Raw topic → canonical topic.
pub type TopicMapping = BTreeMap<String, String>;

/// Audit view of a taxonomy, as written to `topic_mapping_<date>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomySnapshot {
    /// Number of distinct canonical topics.
    pub canonical_topic_count: usize,
    /// Full raw → canonical table.
    pub mapping: TopicMapping,
}

impl TaxonomySnapshot {
    /// Captures the current state of `store`.
    #[must_use]
    pub fn from_store(store: &TaxonomyStore) -> Self {
        Self {
            canonical_topic_count: store.canonical_count(),
            mapping: store.mapping(),
        }
    }
}
