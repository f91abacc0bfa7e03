//! CLI output formatting and display helpers.

use chrono::NaiveDate;
use review_trends_core::{EmergingTopic, RunSummary};

/// Trending topics listed in the console summary.
pub const SUMMARY_TOP_TOPICS: usize = 5;

/// Emerging topics listed in the console summary.
pub const SUMMARY_EMERGING_TOPICS: usize = 3;

/// Hints printed when the window contains no reviews.
pub const NO_REVIEWS_HINTS: [&str; 3] = [
    "Try a more recent target date or a different date range",
    "Verify that the app id is correct",
    "Check that the app has received reviews recently",
];

const RULE_WIDTH: usize = 60;

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

pub(crate) fn run_header_lines(app_id: &str, start: NaiveDate, end: NaiveDate) -> Vec<String> {
    vec![
        "=".repeat(RULE_WIDTH),
        "Review Trend Analysis".to_string(),
        "=".repeat(RULE_WIDTH),
        format!("App ID: {app_id}"),
        format!("Date range: {start} to {end}"),
        String::new(),
    ]
}

pub(crate) fn no_reviews_lines(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let mut lines = vec![format!("No reviews found between {start} and {end}.")];
    lines.extend(NO_REVIEWS_HINTS.iter().map(|hint| format!("  - {hint}")));
    lines
}

pub(crate) fn describe_growth(topic: &EmergingTopic) -> String {
    match topic.growth_rate {
        None => "NEW".to_string(),
        Some(rate) => format!("+{:.0}%", rate * 100.0),
    }
}

pub(crate) fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let meta = &summary.metadata;
    let mut lines = vec![
        String::new(),
        "=".repeat(RULE_WIDTH),
        "Analysis complete".to_string(),
        "=".repeat(RULE_WIDTH),
        format!("Reviews processed: {}", meta.total_reviews_processed),
        format!("Days with reviews: {}", meta.days_with_reviews),
        format!("Canonical topics: {}", meta.total_canonical_topics),
    ];

    if !meta.top_topics.is_empty() {
        lines.push(String::new());
        lines.push(format!("Top {SUMMARY_TOP_TOPICS} trending topics:"));
        for (rank, topic) in meta.top_topics.iter().take(SUMMARY_TOP_TOPICS).enumerate() {
            lines.push(format!(
                "  {}. {}: {} mentions",
                rank + 1,
                topic.topic,
                topic.frequency
            ));
        }
    }

    if !summary.emerging_topics.is_empty() {
        lines.push(String::new());
        lines.push("Emerging topics:".to_string());
        for topic in summary.emerging_topics.iter().take(SUMMARY_EMERGING_TOPICS) {
            lines.push(format!(
                "  - {} ({}, {} recent mentions)",
                topic.topic,
                describe_growth(topic),
                topic.recent_frequency
            ));
        }
    }

    lines.push(String::new());
    lines.push("Reports written:".to_string());
    for path in [
        &summary.paths.trend_report,
        &summary.paths.topic_mapping,
        &summary.paths.metadata,
    ] {
        lines.push(format!("  {}", path.display()));
    }
    lines
}

fn print_lines(lines: &[String]) {
    let width = terminal_width();
    for line in lines {
        println!("{}", truncate_to_width(line, width));
    }
}

pub(crate) fn print_run_header(app_id: &str, start: NaiveDate, end: NaiveDate) {
    print_lines(&run_header_lines(app_id, start, end));
}

pub(crate) fn print_no_reviews_guidance(start: NaiveDate, end: NaiveDate) {
    print_lines(&no_reviews_lines(start, end));
}

pub(crate) fn print_run_summary(summary: &RunSummary) {
    print_lines(&summary_lines(summary));
}
