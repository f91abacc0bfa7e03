//! Review acquisition.
//!
//! A [`ReviewSource`] returns every review posted in an inclusive date
//! window. Two implementations ship:
//!
//! - [`JsonFileSource`] - a local JSON export, for offline runs and tests
//! - [`HttpReviewSource`] - a paginated review API, newest first

mod error;
mod file;
mod http;

pub use error::ReviewSourceError;
pub use file::JsonFileSource;
pub use http::{DEFAULT_PAGE_DELAY, DEFAULT_PAGE_SIZE, HttpReviewSource};

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One app-store review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Store-assigned identifier.
    #[serde(alias = "reviewId")]
    pub review_id: String,
    /// Review text.
    pub content: String,
    /// Star rating, 1-5.
    #[serde(default)]
    pub score: u8,
    /// Posting time.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub at: DateTime<Utc>,
}

impl Review {
    /// Calendar day the review was posted (UTC).
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.at.date_naive()
    }
}

/// Accepts RFC 3339 timestamps and offset-less ISO-8601 (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid timestamp '{raw}', expected ISO-8601"))
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Trait that all review sources implement.
///
/// # Object Safety
///
/// Uses `async_trait` so the pipeline can hold a `Box<dyn ReviewSource>`.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Short description for logs (e.g., "file", "http").
    fn name(&self) -> &str;

    /// Returns every review posted between `start` and `end`, both inclusive.
    async fn fetch(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Review>, ReviewSourceError>;
}

/// Buckets reviews by posting day.
///
/// Every day in `start..=end` gets an entry, possibly empty. Reviews outside
/// the window are dropped. Within a day, input order is kept.
#[must_use]
pub fn group_by_date(
    reviews: Vec<Review>,
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<NaiveDate, Vec<Review>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<Review>> = start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|day| (day, Vec::new()))
        .collect();

    for review in reviews {
        if let Some(bucket) = grouped.get_mut(&review.date()) {
            bucket.push(review);
        }
    }
    grouped
}
