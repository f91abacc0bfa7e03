//! In-memory taxonomy state: the raw → canonical table and the canonical set.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use super::{TaxonomyError, TopicMapping};

/// Append-only store of every raw topic seen during one analysis run.
///
/// The store owns two collections that only ever grow:
/// - the mapping from each raw topic to its canonical topic
/// - the set of canonical topics currently in use
///
/// Accessors hand out copies so callers cannot reach the internal state.
/// There is no internal locking; the owning engine is the single writer.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyStore {
    mapping: BTreeMap<String, String>,
    canonical: BTreeSet<String>,
}

impl TaxonomyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical topic recorded for `raw`, if any.
    #[must_use]
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.mapping.get(raw).map(String::as_str)
    }

    /// Returns true if `canonical` is a member of the canonical set.
    #[must_use]
    pub fn is_canonical(&self, canonical: &str) -> bool {
        self.canonical.contains(canonical)
    }

    /// Records `raw → canonical` and adds `canonical` to the canonical set.
    ///
    /// Recording the exact same pair twice is accepted and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::ConflictingMapping`] when `raw` is already
    /// mapped to a different canonical topic. The store is left untouched.
    pub fn record(&mut self, raw: &str, canonical: &str) -> Result<(), TaxonomyError> {
        if let Some(existing) = self.mapping.get(raw) {
            if existing == canonical {
                return Ok(());
            }
            return Err(TaxonomyError::conflicting_mapping(raw, existing, canonical));
        }

        trace!(raw, canonical, "recording topic mapping");
        self.mapping.insert(raw.to_string(), canonical.to_string());
        self.canonical.insert(canonical.to_string());
        Ok(())
    }

    /// Snapshot of the canonical set.
    #[must_use]
    pub fn canonical_set(&self) -> BTreeSet<String> {
        self.canonical.clone()
    }

    /// Snapshot of the full raw → canonical table.
    #[must_use]
    pub fn mapping(&self) -> TopicMapping {
        self.mapping.clone()
    }

    /// Number of recorded raw topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Returns true if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Number of canonical topics.
    #[must_use]
    pub fn canonical_count(&self) -> usize {
        self.canonical.len()
    }

    /// Borrowed view of the canonical set, for the owning engine only.
    pub(crate) fn canonical_ref(&self) -> &BTreeSet<String> {
        &self.canonical
    }

    pub(crate) fn mapping_ref(&self) -> &TopicMapping {
        &self.mapping
    }
}
