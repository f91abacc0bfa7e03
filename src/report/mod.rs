//! Output files for one analysis run.
//!
//! Three files land in the output directory, suffixed with the target date:
//! - `trend_report_<T>.csv` - topic × date counts
//! - `topic_mapping_<T>.json` - the taxonomy for audit
//! - `metadata_<T>.json` - run summary and insights

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::taxonomy::TaxonomySnapshot;
use crate::trends::{EmergingTopic, TopicFrequency, TrendReport};

/// Errors that can occur while writing run outputs.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}\n  Suggestion: {suggestion}")]
    CreateDir {
        /// Output directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// How to fix it.
        suggestion: &'static str,
    },

    /// An output file could not be written.
    #[error("cannot write {path}: {source}")]
    Io {
        /// File being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("cannot write CSV report {path}: {source}")]
    Csv {
        /// File being written.
        path: PathBuf,
        /// The csv writer error.
        #[source]
        source: csv::Error,
    },

    /// JSON serialization failed.
    #[error("cannot write JSON report {path}: {source}")]
    Json {
        /// File being written.
        path: PathBuf,
        /// The serializer error.
        #[source]
        source: serde_json::Error,
    },
}

impl ReportError {
    fn create_dir(path: &Path, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.to_path_buf(),
            source,
            suggestion: "Check that the parent directory exists and is writable, or pass a different --output-dir",
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Run summary written to `metadata_<T>.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    /// Store identifier of the analyzed app.
    pub app_id: String,
    /// Last day of the window (T).
    pub target_date: NaiveDate,
    /// First day of the window.
    pub start_date: NaiveDate,
    /// Days before T included in the window.
    pub lookback_days: u64,
    /// Reviews in the window.
    pub total_reviews_processed: usize,
    /// Days in the window that had at least one review.
    pub days_with_reviews: usize,
    /// Size of the final canonical set.
    pub total_canonical_topics: usize,
    /// Most frequent topics over the window.
    pub top_topics: Vec<TopicFrequency>,
    /// Leading emerging topics.
    pub emerging_topics: Vec<EmergingTopic>,
}

/// Paths of the files written by [`write_reports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// The CSV trend table.
    pub trend_report: PathBuf,
    /// The taxonomy JSON.
    pub topic_mapping: PathBuf,
    /// The run metadata JSON.
    pub metadata: PathBuf,
}

impl ReportPaths {
    /// File paths for target day `target` under `output_dir`.
    #[must_use]
    pub fn for_target(output_dir: &Path, target: NaiveDate) -> Self {
        let stamp = target.format("%Y-%m-%d");
        Self {
            trend_report: output_dir.join(format!("trend_report_{stamp}.csv")),
            topic_mapping: output_dir.join(format!("topic_mapping_{stamp}.json")),
            metadata: output_dir.join(format!("metadata_{stamp}.json")),
        }
    }
}

/// Writes the trend table, taxonomy and metadata for one run.
///
/// Creates `output_dir` if needed. Existing files are overwritten.
///
/// # Errors
///
/// Returns [`ReportError`] if the directory or any file cannot be written.
#[instrument(skip_all, fields(output_dir = %output_dir.display(), target = %metadata.target_date))]
pub fn write_reports(
    output_dir: &Path,
    report: &TrendReport,
    taxonomy: &TaxonomySnapshot,
    metadata: &RunMetadata,
) -> Result<ReportPaths, ReportError> {
    fs::create_dir_all(output_dir).map_err(|e| ReportError::create_dir(output_dir, e))?;
    let paths = ReportPaths::for_target(output_dir, metadata.target_date);

    write_csv_report(&paths.trend_report, report)?;
    write_json(&paths.topic_mapping, taxonomy)?;
    write_json(&paths.metadata, metadata)?;

    debug!(
        rows = report.rows.len(),
        canonical_topics = taxonomy.canonical_topic_count,
        "Reports written"
    );
    Ok(paths)
}

fn write_csv_report(path: &Path, report: &TrendReport) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|e| ReportError::io(path, e))?;
    report
        .write_csv(BufWriter::new(file))
        .map_err(|source| ReportError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|e| ReportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|e| ReportError::io(path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::taxonomy::TopicMapping;
    use crate::trends::TopicRow;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> (TrendReport, TaxonomySnapshot, RunMetadata) {
        let report = TrendReport {
            dates: vec![day("2024-06-30")],
            rows: vec![TopicRow {
                topic: "Delivery partner rude".to_string(),
                counts: vec![2],
                total: 2,
            }],
        };
        let mut mapping = TopicMapping::new();
        mapping.insert("Delivery guy rude".to_string(), "Delivery partner rude".to_string());
        mapping.insert(
            "Delivery partner impolite".to_string(),
            "Delivery partner rude".to_string(),
        );
        let taxonomy = TaxonomySnapshot {
            canonical_topic_count: 1,
            mapping,
        };
        let metadata = RunMetadata {
            app_id: "com.example.food".to_string(),
            target_date: day("2024-06-30"),
            start_date: day("2024-05-31"),
            lookback_days: 30,
            total_reviews_processed: 2,
            days_with_reviews: 1,
            total_canonical_topics: 1,
            top_topics: vec![TopicFrequency {
                topic: "Delivery partner rude".to_string(),
                frequency: 2,
            }],
            emerging_topics: Vec::new(),
        };
        (report, taxonomy, metadata)
    }

    #[test]
    fn test_paths_use_target_date_suffix() {
        let paths = ReportPaths::for_target(Path::new("out"), day("2024-06-30"));
        assert_eq!(paths.trend_report, Path::new("out/trend_report_2024-06-30.csv"));
        assert_eq!(paths.topic_mapping, Path::new("out/topic_mapping_2024-06-30.json"));
        assert_eq!(paths.metadata, Path::new("out/metadata_2024-06-30.json"));
    }

    #[test]
    fn test_write_reports_creates_dir_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested").join("output");
        let (report, taxonomy, metadata) = sample();

        let paths = write_reports(&output, &report, &taxonomy, &metadata).unwrap();

        let csv = fs::read_to_string(&paths.trend_report).unwrap();
        assert_eq!(csv, "Topic,2024-06-30\nDelivery partner rude,2\n");

        let mapping: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.topic_mapping).unwrap()).unwrap();
        assert_eq!(mapping["canonical_topic_count"], 1);
        assert_eq!(
            mapping["mapping"]["Delivery partner impolite"],
            "Delivery partner rude"
        );

        let meta: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.metadata).unwrap()).unwrap();
        assert_eq!(meta["app_id"], "com.example.food");
        assert_eq!(meta["start_date"], "2024-05-31");
        assert_eq!(meta["top_topics"][0]["frequency"], 2);
    }

    #[test]
    fn test_write_reports_fails_when_output_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let (report, taxonomy, metadata) = sample();

        let err = write_reports(&blocker, &report, &taxonomy, &metadata).unwrap_err();
        assert!(matches!(err, ReportError::CreateDir { .. }));
    }
}
