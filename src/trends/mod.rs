//! Per-topic daily frequency aggregation.
//!
//! [`TrendAnalyzer`] collects canonical topic counts day by day and derives
//! three views: the date × topic [`TrendReport`], the top topics by volume,
//! and emerging topics whose recent volume outgrows their earlier volume.

mod report;

pub use report::{TopicRow, TrendReport};

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::extract::ExtractionRecord;

/// Default report window: the target day plus this many days before it.
pub const DEFAULT_LOOKBACK_DAYS: u64 = 30;

/// Default recent window for emerging topics, ending on the target day.
pub const DEFAULT_RECENT_DAYS: u64 = 7;

/// Default older window for emerging topics, ending right before the recent one.
pub const DEFAULT_OLDER_DAYS: u64 = 23;

/// Minimum growth rate (recent vs older) for an existing topic to be emerging.
pub const EMERGING_GROWTH_THRESHOLD: f64 = 0.5;

/// Minimum recent count for a topic with no older mentions to be emerging.
pub const NEW_TOPIC_MIN_RECENT: u64 = 3;

/// A topic and its total count over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicFrequency {
    /// Canonical topic.
    pub topic: String,
    /// Mentions in the window.
    pub frequency: u64,
}

/// A topic whose recent volume grew against its older volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergingTopic {
    /// Canonical topic.
    pub topic: String,
    /// Mentions in the recent window.
    pub recent_frequency: u64,
    /// Mentions in the older window.
    pub older_frequency: u64,
    /// `(recent - older) / older`; `None` for topics absent from the older window.
    pub growth_rate: Option<f64>,
}

impl EmergingTopic {
    /// True when the topic had no mentions in the older window.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.growth_rate.is_none()
    }
}

/// Accumulates per-topic per-day counts.
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    frequencies: BTreeMap<String, BTreeMap<NaiveDate, u64>>,
}

impl TrendAnalyzer {
    /// Creates an empty analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one day of canonicalized extraction results.
    ///
    /// Each topic occurrence counts once, so a review listing the same topic
    /// twice contributes two. Any counts previously recorded for `date` are
    /// replaced.
    pub fn add_daily_data(&mut self, date: NaiveDate, records: &[ExtractionRecord]) {
        for days in self.frequencies.values_mut() {
            days.remove(&date);
        }

        let mut mentions = 0_u64;
        for topic in records.iter().flat_map(|record| record.topics.iter()) {
            *self
                .frequencies
                .entry(topic.clone())
                .or_default()
                .entry(date)
                .or_insert(0) += 1;
            mentions += 1;
        }
        debug!(%date, records = records.len(), mentions, "Recorded daily topic counts");
    }

    /// Number of distinct topics ever recorded.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.frequencies.len()
    }

    /// Count for one topic on one day.
    #[must_use]
    pub fn count(&self, topic: &str, date: NaiveDate) -> u64 {
        self.frequencies
            .get(topic)
            .and_then(|days| days.get(&date))
            .copied()
            .unwrap_or(0)
    }

    /// Builds the date × topic table for `target - lookback_days ..= target`.
    ///
    /// Every recorded topic gets a row, sorted by window total descending
    /// then by name.
    #[must_use]
    pub fn trend_report(&self, target: NaiveDate, lookback_days: u64) -> TrendReport {
        let start = days_before(target, lookback_days);
        let dates: Vec<NaiveDate> = start
            .iter_days()
            .take_while(|day| *day <= target)
            .collect();

        let mut rows: Vec<TopicRow> = self
            .frequencies
            .iter()
            .map(|(topic, days)| {
                let counts: Vec<u64> = dates
                    .iter()
                    .map(|date| days.get(date).copied().unwrap_or(0))
                    .collect();
                TopicRow {
                    topic: topic.clone(),
                    total: counts.iter().sum(),
                    counts,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.topic.cmp(&b.topic)));

        TrendReport { dates, rows }
    }

    /// Up to `top_n` topics with a non-zero total over the lookback window,
    /// most frequent first (ties by name).
    #[must_use]
    pub fn trending_topics(
        &self,
        target: NaiveDate,
        lookback_days: u64,
        top_n: usize,
    ) -> Vec<TopicFrequency> {
        let start = days_before(target, lookback_days);
        let mut totals: Vec<TopicFrequency> = self
            .frequencies
            .iter()
            .map(|(topic, days)| TopicFrequency {
                topic: topic.clone(),
                frequency: window_total(days, start, target),
            })
            .filter(|entry| entry.frequency > 0)
            .collect();
        totals.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| a.topic.cmp(&b.topic))
        });
        totals.truncate(top_n);
        totals
    }

    /// Topics whose recent volume grew against the preceding window.
    ///
    /// The recent window is the `recent_days` days ending on `target`; the
    /// older window is the `older_days` days before that. A topic is emerging
    /// when its growth exceeds [`EMERGING_GROWTH_THRESHOLD`], or when it has no
    /// older mentions and at least [`NEW_TOPIC_MIN_RECENT`] recent ones.
    /// New topics sort first, then by growth descending, then by name.
    #[must_use]
    pub fn emerging_topics(
        &self,
        target: NaiveDate,
        recent_days: u64,
        older_days: u64,
    ) -> Vec<EmergingTopic> {
        let recent_start = days_before(target, recent_days.saturating_sub(1));
        let older_end = days_before(target, recent_days);
        let older_start = days_before(target, (recent_days + older_days).saturating_sub(1));

        let mut emerging: Vec<EmergingTopic> = self
            .frequencies
            .iter()
            .filter_map(|(topic, days)| {
                let recent = window_total(days, recent_start, target);
                let older = if older_days == 0 {
                    0
                } else {
                    window_total(days, older_start, older_end)
                };
                classify_emerging(topic, recent, older)
            })
            .collect();

        emerging.sort_by(compare_emerging);
        emerging
    }
}

#[allow(clippy::cast_precision_loss)]
fn classify_emerging(topic: &str, recent: u64, older: u64) -> Option<EmergingTopic> {
    if older > 0 {
        let growth = (recent as f64 - older as f64) / older as f64;
        (growth > EMERGING_GROWTH_THRESHOLD).then(|| EmergingTopic {
            topic: topic.to_string(),
            recent_frequency: recent,
            older_frequency: older,
            growth_rate: Some(growth),
        })
    } else {
        (recent >= NEW_TOPIC_MIN_RECENT).then(|| EmergingTopic {
            topic: topic.to_string(),
            recent_frequency: recent,
            older_frequency: 0,
            growth_rate: None,
        })
    }
}

fn compare_emerging(a: &EmergingTopic, b: &EmergingTopic) -> Ordering {
    let by_growth = match (a.growth_rate, b.growth_rate) {
        (None, None) => b.recent_frequency.cmp(&a.recent_frequency),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => y.total_cmp(&x),
    };
    by_growth.then_with(|| a.topic.cmp(&b.topic))
}

fn window_total(days: &BTreeMap<NaiveDate, u64>, start: NaiveDate, end: NaiveDate) -> u64 {
    if start > end {
        return 0;
    }
    days.range(start..=end).map(|(_, count)| count).sum()
}

/// `date` minus `n` days, saturating at the earliest representable date.
#[must_use]
pub fn days_before(date: NaiveDate, n: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(n)).unwrap_or(NaiveDate::MIN)
}
