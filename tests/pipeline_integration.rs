//! Integration tests for the end-to-end analysis run.
//!
//! Uses in-memory review sources, a keyword extractor, and the offline
//! lexical matcher so runs are deterministic and need no network.

use std::collections::BTreeMap;
use std::fs;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use indicatif::ProgressBar;
use review_trends_core::{
    ConsolidationEngine, ExtractionRecord, LexicalMatcher, Pipeline, PipelineError,
    PipelineOptions, PipelineOutcome, Review, ReviewSource, ReviewSourceError, TopicExtractor,
};

struct MemorySource(Vec<Review>);

#[async_trait]
impl ReviewSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Review>, ReviewSourceError> {
        Ok(self
            .0
            .iter()
            .filter(|r| (start..=end).contains(&r.date()))
            .cloned()
            .collect())
    }
}

/// Uses the review text itself as a `;`-separated topic list.
struct SplitExtractor;

#[async_trait]
impl TopicExtractor for SplitExtractor {
    fn name(&self) -> &'static str {
        "split"
    }

    async fn extract(&self, reviews: &[Review]) -> Vec<ExtractionRecord> {
        reviews
            .iter()
            .map(|r| ExtractionRecord {
                review_id: r.review_id.clone(),
                topics: r
                    .content
                    .split(';')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(ToString::to_string)
                    .collect(),
                content: r.content.clone(),
                reasoning: String::new(),
            })
            .collect()
    }
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn review(id: &str, date: &str, topics: &str) -> Review {
    let d = day(date);
    Review {
        review_id: id.to_string(),
        content: topics.to_string(),
        score: 1,
        at: Utc
            .from_utc_datetime(&d.and_hms_opt(12, 0, 0).unwrap()),
    }
}

fn pipeline(reviews: Vec<Review>) -> Pipeline {
    Pipeline::new(
        Box::new(MemorySource(reviews)),
        Box::new(SplitExtractor),
        ConsolidationEngine::new(Box::new(LexicalMatcher::default())),
    )
}

#[tokio::test]
async fn test_run_writes_reports_with_canonical_topics() {
    let dir = tempfile::tempdir().unwrap();
    let target = day("2024-06-30");
    let mut reviews = vec![
        review("1", "2024-06-01", "Late delivery"),
        review("2", "2024-06-02", "Late delivery; App crashes"),
    ];
    // A topic that only shows up in the recent week, in two spellings.
    for (i, date) in ["2024-06-27", "2024-06-28", "2024-06-29", "2024-06-30"]
        .iter()
        .enumerate()
    {
        let label = if i % 2 == 0 { "Refund delay" } else { "refund delay." };
        reviews.push(review(&format!("r{i}"), date, label));
    }
    reviews.push(review("out", "2024-07-05", "Late delivery"));

    let options = PipelineOptions::new("com.example.food", target, dir.path());
    let outcome = pipeline(reviews)
        .run(&options, &ProgressBar::hidden())
        .await
        .unwrap();

    let PipelineOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };

    assert_eq!(summary.metadata.total_reviews_processed, 6);
    assert_eq!(summary.metadata.days_with_reviews, 6);
    assert_eq!(summary.metadata.total_canonical_topics, 3);
    assert_eq!(summary.report.dates.len(), 31);
    assert_eq!(summary.top_topics()[0].topic, "Refund delay");
    assert_eq!(summary.top_topics()[0].frequency, 4);

    let emerging: Vec<&str> = summary
        .emerging_topics
        .iter()
        .map(|t| t.topic.as_str())
        .collect();
    assert_eq!(emerging, vec!["Refund delay"]);
    assert!(summary.emerging_topics[0].is_new());

    let csv = fs::read_to_string(&summary.paths.trend_report).unwrap();
    let mut lines = csv.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("Topic,2024-05-31,2024-06-01"));
    assert!(header.ends_with(",2024-06-30"));
    assert!(lines.next().unwrap().starts_with("Refund delay,"));
    assert!(!csv.contains("refund delay."));

    let mapping: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary.paths.topic_mapping).unwrap()).unwrap();
    assert_eq!(mapping["mapping"]["refund delay."], "Refund delay");
    assert_eq!(mapping["canonical_topic_count"], 3);

    let meta: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary.paths.metadata).unwrap()).unwrap();
    assert_eq!(meta["target_date"], "2024-06-30");
    assert_eq!(meta["lookback_days"], 30);
    assert_eq!(meta["emerging_topics"][0]["topic"], "Refund delay");
}

#[tokio::test]
async fn test_run_counts_each_review_mention() {
    let dir = tempfile::tempdir().unwrap();
    let reviews = vec![
        review("1", "2024-06-30", "App crashes"),
        review("2", "2024-06-30", "app crashes"),
        review("3", "2024-06-30", "App crashes; Late delivery"),
    ];
    let options = PipelineOptions::new("app", day("2024-06-30"), dir.path());

    let PipelineOutcome::Completed(summary) = pipeline(reviews)
        .run(&options, &ProgressBar::hidden())
        .await
        .unwrap()
    else {
        panic!("expected a completed run");
    };

    let totals: BTreeMap<&str, u64> = summary
        .report
        .rows
        .iter()
        .map(|row| (row.topic.as_str(), row.total))
        .collect();
    assert_eq!(totals["App crashes"], 3);
    assert_eq!(totals["Late delivery"], 1);
    assert_eq!(summary.consolidation.batches, 1);
}

#[tokio::test]
async fn test_run_without_reviews_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output");
    let options = PipelineOptions::new("app", day("2024-06-30"), &output);

    let outcome = pipeline(vec![review("old", "2023-01-01", "Late delivery")])
        .run(&options, &ProgressBar::hidden())
        .await
        .unwrap();

    match outcome {
        PipelineOutcome::NoReviews {
            start_date,
            end_date,
        } => {
            assert_eq!(start_date, day("2024-05-31"));
            assert_eq!(end_date, day("2024-06-30"));
        }
        PipelineOutcome::Completed(_) => panic!("expected no reviews"),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn test_run_surfaces_unwritable_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "x").unwrap();
    let options = PipelineOptions::new("app", day("2024-06-30"), &blocker);

    let err = pipeline(vec![review("1", "2024-06-30", "App crashes")])
        .run(&options, &ProgressBar::hidden())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Report(_)));
}
