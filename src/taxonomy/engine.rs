//! Incremental topic consolidation.
//!
//! The [`ConsolidationEngine`] owns the [`TaxonomyStore`] for one analysis run
//! and grows it one batch (one day of reviews) at a time:
//!
//! 1. Empty batch → nothing happens.
//! 2. Empty taxonomy → the whole batch goes to the matcher once to form the
//!    initial groups (bootstrap). Matcher failure → identity mapping.
//! 3. Otherwise each unseen raw topic is matched individually against the
//!    current canonical set. Seen topics reuse their mapping with no matcher
//!    call. Out-of-domain answers and failures become new concepts.
//!
//! Batches are processed in sorted order, one matcher call at a time. A topic
//! that becomes canonical early in a batch is a candidate for later topics of
//! the same batch.

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::extract::ExtractionRecord;
use crate::matcher::{MatcherError, SemanticMatcher};

use super::{TaxonomyError, TaxonomySnapshot, TaxonomyStore, TopicMapping, apply_mapping};

/// Default deadline for a single matcher call.
pub const DEFAULT_MATCHER_TIMEOUT: Duration = Duration::from_secs(120);

/// Counters describing how the taxonomy was built, for the run log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationStats {
    /// Batches passed to `consolidate` (including empty ones).
    pub batches: u64,
    /// Matcher calls issued (bootstrap and incremental).
    pub matcher_calls: u64,
    /// Matcher calls that failed or timed out.
    pub matcher_failures: u64,
    /// Incremental answers overridden because they were out of domain.
    pub overridden_answers: u64,
    /// Bootstrap proposal entries repaired (missing, blank, extra, chained).
    pub repaired_entries: u64,
    /// Raw topics answered from the existing mapping.
    pub reused: u64,
}

/// Consolidates free-text topics into a canonical taxonomy.
pub struct ConsolidationEngine {
    matcher: Box<dyn SemanticMatcher>,
    store: TaxonomyStore,
    call_timeout: Duration,
    stats: ConsolidationStats,
}

impl ConsolidationEngine {
    /// Creates an engine with an empty taxonomy.
    #[must_use]
    pub fn new(matcher: Box<dyn SemanticMatcher>) -> Self {
        Self {
            matcher,
            store: TaxonomyStore::new(),
            call_timeout: DEFAULT_MATCHER_TIMEOUT,
            stats: ConsolidationStats::default(),
        }
    }

    /// Sets the per-call matcher deadline.
    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Read-only view of the taxonomy.
    #[must_use]
    pub fn store(&self) -> &TaxonomyStore {
        &self.store
    }

    /// Build counters so far.
    #[must_use]
    pub fn stats(&self) -> ConsolidationStats {
        self.stats
    }

    /// Snapshot of the full raw → canonical table.
    #[must_use]
    pub fn topic_mapping(&self) -> TopicMapping {
        self.store.mapping()
    }

    /// Snapshot of the canonical set.
    #[must_use]
    pub fn canonical_topics(&self) -> BTreeSet<String> {
        self.store.canonical_set()
    }

    /// Serializable audit view of the taxonomy.
    #[must_use]
    pub fn snapshot(&self) -> TaxonomySnapshot {
        TaxonomySnapshot::from_store(&self.store)
    }

    /// Maps a batch of raw topics to canonical topics, growing the taxonomy.
    ///
    /// Returns a mapping with exactly one entry per input topic. Every value
    /// is a member of the canonical set once this returns.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError`] only when the store rejects a write, which
    /// means a mapping invariant was broken. Matcher problems never error.
    #[instrument(skip(self, new_raw_topics), fields(batch = new_raw_topics.len(), matcher = self.matcher.name()))]
    pub async fn consolidate(
        &mut self,
        new_raw_topics: &BTreeSet<String>,
    ) -> Result<TopicMapping, TaxonomyError> {
        self.stats.batches += 1;
        if new_raw_topics.is_empty() {
            return Ok(TopicMapping::new());
        }

        let mapping = if self.store.canonical_count() == 0 {
            self.bootstrap(new_raw_topics).await?
        } else {
            self.extend(new_raw_topics).await?
        };

        debug!(
            batch = mapping.len(),
            known_topics = self.store.len(),
            canonical_topics = self.store.canonical_count(),
            "Batch consolidated"
        );
        Ok(mapping)
    }

    /// Rewrites each record's topics to their canonical form.
    ///
    /// Topics missing from the mapping pass through unchanged.
    #[must_use]
    pub fn apply(&self, records: &[ExtractionRecord]) -> Vec<ExtractionRecord> {
        apply_mapping(records, self.store.mapping_ref())
    }

    async fn bootstrap(
        &mut self,
        batch: &BTreeSet<String>,
    ) -> Result<TopicMapping, TaxonomyError> {
        // BTreeSet iteration is sorted, so the prompt is reproducible.
        let ordered: Vec<String> = batch.iter().cloned().collect();

        self.stats.matcher_calls += 1;
        let proposal = with_timeout(
            self.call_timeout,
            "initial taxonomy",
            self.matcher.propose_initial_taxonomy(&ordered),
        )
        .await;

        let mapping = match proposal {
            Ok(proposal) => {
                let (mapping, repaired) = repair_initial_taxonomy(batch, proposal);
                if repaired > 0 {
                    warn!(repaired, "Initial taxonomy proposal needed repair");
                }
                self.stats.repaired_entries += repaired;
                mapping
            }
            Err(error) => {
                self.stats.matcher_failures += 1;
                warn!(
                    error = %error,
                    topics = batch.len(),
                    "Initial taxonomy failed; each topic becomes its own canonical topic"
                );
                batch.iter().map(|raw| (raw.clone(), raw.clone())).collect()
            }
        };

        for (raw, canonical) in &mapping {
            self.store.record(raw, canonical)?;
        }

        info!(
            raw_topics = mapping.len(),
            canonical_topics = self.store.canonical_count(),
            "Initial taxonomy created"
        );
        Ok(mapping)
    }

    async fn extend(&mut self, batch: &BTreeSet<String>) -> Result<TopicMapping, TaxonomyError> {
        let mut mapping = TopicMapping::new();

        for raw in batch {
            if let Some(existing) = self.store.lookup(raw) {
                self.stats.reused += 1;
                mapping.insert(raw.clone(), existing.to_string());
                continue;
            }

            let canonical = if self.store.is_canonical(raw) {
                // Already a canonical name verbatim: it can only map to itself.
                raw.clone()
            } else {
                self.match_one(raw).await
            };

            self.store.record(raw, &canonical)?;
            mapping.insert(raw.clone(), canonical);
        }

        Ok(mapping)
    }

    async fn match_one(&mut self, raw: &str) -> String {
        self.stats.matcher_calls += 1;
        let answer = with_timeout(
            self.call_timeout,
            "match",
            self.matcher
                .match_or_create(raw, self.store.canonical_ref()),
        )
        .await;

        match answer {
            Ok(answer) if answer == raw => {
                debug!(raw, "New canonical topic");
                answer
            }
            Ok(answer) if self.store.is_canonical(&answer) => {
                debug!(raw, canonical = %answer, "Merged into existing topic");
                answer
            }
            Ok(answer) => {
                self.stats.overridden_answers += 1;
                warn!(
                    raw,
                    answer = %answer,
                    "Matcher answer is neither an existing canonical topic nor the raw topic; treating as new"
                );
                raw.to_string()
            }
            Err(error) => {
                self.stats.matcher_failures += 1;
                warn!(raw, error = %error, "Matcher failed; treating topic as new");
                raw.to_string()
            }
        }
    }
}

impl std::fmt::Debug for ConsolidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsolidationEngine")
            .field("matcher", &self.matcher.name())
            .field("store", &self.store)
            .field("call_timeout", &self.call_timeout)
            .field("stats", &self.stats)
            .finish()
    }
}

async fn with_timeout<T, F>(
    timeout: Duration,
    operation: &str,
    future: F,
) -> Result<T, MatcherError>
where
    F: Future<Output = Result<T, MatcherError>>,
{
    tokio::time::timeout(timeout, future)
        .await
        .unwrap_or_else(|_| Err(MatcherError::timeout(operation, timeout)))
}

/// Turns a matcher's bootstrap proposal into a mapping the store can accept.
///
/// - entries for topics outside the batch are dropped
/// - batch topics missing from the proposal, or with a blank canonical, map to themselves
/// - chains (`A → B`, `B → C`) are followed so a canonical that is also a raw
///   key maps to itself; topics caught in a cycle map to themselves
///
/// Returns the repaired mapping and the number of entries that changed.
#[must_use]
pub fn repair_initial_taxonomy(
    batch: &BTreeSet<String>,
    proposal: TopicMapping,
) -> (TopicMapping, u64) {
    let mut repaired: u64 = 0;
    let mut mapping = TopicMapping::new();

    for (raw, canonical) in proposal {
        if !batch.contains(&raw) {
            debug!(raw = %raw, "Dropping proposal entry for topic outside the batch");
            repaired += 1;
            continue;
        }
        if canonical.trim().is_empty() {
            repaired += 1;
            mapping.insert(raw.clone(), raw);
        } else {
            mapping.insert(raw, canonical);
        }
    }

    for raw in batch {
        if !mapping.contains_key(raw) {
            repaired += 1;
            mapping.insert(raw.clone(), raw.clone());
        }
    }

    let resolved: TopicMapping = mapping
        .keys()
        .map(|raw| (raw.clone(), resolve_chain(&mapping, raw)))
        .collect();
    repaired += resolved
        .iter()
        .filter(|(raw, canonical)| mapping.get(*raw) != Some(*canonical))
        .count() as u64;

    (resolved, repaired)
}

fn resolve_chain(mapping: &TopicMapping, raw: &str) -> String {
    let mut visited: HashSet<&str> = HashSet::new();
    let Some(mut current) = mapping.get(raw).map(String::as_str) else {
        return raw.to_string();
    };

    while let Some(next) = mapping.get(current).map(String::as_str) {
        if next == current {
            break;
        }
        if !visited.insert(current) {
            return raw.to_string();
        }
        current = next;
    }
    current.to_string()
}
