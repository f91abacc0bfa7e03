//! Error types for taxonomy operations.
//!
//! Recoverable matcher problems never surface here; the engine absorbs them.
//! What remains are invariant violations that point at a caller bug.

use thiserror::Error;

/// Errors raised by the taxonomy store and consolidation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxonomyError {
    /// A raw topic was recorded twice with different canonical targets
    #[error(
        "raw topic '{raw}' is already mapped to '{existing}', refusing to remap it to '{attempted}'\n  Suggestion: {suggestion}"
    )]
    ConflictingMapping {
        /// The raw topic being re-recorded
        raw: String,
        /// Canonical topic already on record
        existing: String,
        /// Canonical topic the caller tried to record
        attempted: String,
        /// How to fix the issue
        suggestion: String,
    },
}

impl TaxonomyError {
    /// Creates a `ConflictingMapping` error.
    #[must_use]
    pub fn conflicting_mapping(raw: &str, existing: &str, attempted: &str) -> Self {
        Self::ConflictingMapping {
            raw: raw.to_string(),
            existing: existing.to_string(),
            attempted: attempted.to_string(),
            suggestion: "A batch was probably consolidated twice; mappings are append-only"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_mapping_message_names_all_parties() {
        let err = TaxonomyError::conflicting_mapping("slow app", "App is slow", "App crashes");
        let msg = err.to_string();
        assert!(msg.contains("slow app"), "should contain raw topic");
        assert!(msg.contains("App is slow"), "should contain existing canonical");
        assert!(msg.contains("App crashes"), "should contain attempted canonical");
        assert!(msg.contains("Suggestion"), "should have suggestion");
    }
}
