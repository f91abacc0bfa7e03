//! Rewriting extraction records into canonical topics.

use crate::extract::ExtractionRecord;

use super::TopicMapping;

/// Returns copies of `records` with every topic replaced by its canonical form.
///
/// Topics without an entry pass through unchanged. Order and duplicates are
/// kept, so a review that mentions two raw topics with the same canonical
/// topic counts twice. The input records are not modified.
#[must_use]
pub fn apply_mapping(records: &[ExtractionRecord], mapping: &TopicMapping) -> Vec<ExtractionRecord> {
    records
        .iter()
        .map(|record| ExtractionRecord {
            topics: record
                .topics
                .iter()
                .map(|topic| mapping.get(topic).unwrap_or(topic).clone())
                .collect(),
            ..record.clone()
        })
        .collect()
}
