//! Reviews from a local JSON export.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, instrument};

use super::{Review, ReviewSource, ReviewSourceError};

/// Reads a JSON array of [`Review`] objects from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Creates a source for `path`. The file is read on each `fetch`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The export file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReviewSource for JsonFileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Review>, ReviewSourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ReviewSourceError::io(&self.path, e))?;

        let all: Vec<Review> = serde_json::from_str(&raw)
            .map_err(|e| ReviewSourceError::parse(&self.path, e.to_string()))?;
        let total = all.len();

        let in_window: Vec<Review> = all
            .into_iter()
            .filter(|review| (start..=end).contains(&review.date()))
            .collect();

        debug!(total, in_window = in_window.len(), "Loaded review export");
        Ok(in_window)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_filters_to_window() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"review_id":"1","content":"Food cold","score":1,"at":"2024-06-01T10:00:00Z"}},
                {{"review_id":"2","content":"Late","score":2,"at":"2024-05-01T10:00:00Z"}}
            ]"#
        )
        .unwrap();

        let source = JsonFileSource::new(file.path());
        let reviews = source
            .fetch(day("2024-05-31"), day("2024-06-01"))
            .await
            .unwrap();

        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].review_id, "1");
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileSource::new(dir.path().join("missing.json"));
        let err = source
            .fetch(day("2024-06-01"), day("2024-06-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewSourceError::Io { .. }));
    }

    #[tokio::test]
    async fn test_fetch_non_array_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"reviews": []}}"#).unwrap();

        let source = JsonFileSource::new(file.path());
        let err = source
            .fetch(day("2024-06-01"), day("2024-06-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewSourceError::Parse { .. }));
    }
}
