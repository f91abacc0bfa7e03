//! End-to-end analysis run: fetch → extract → consolidate → count → report.
//!
//! Days are processed strictly in calendar order, because the taxonomy built
//! on earlier days decides how later topics are named.

use std::path::PathBuf;

use chrono::NaiveDate;
use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::extract::{TopicExtractor, unique_topics};
use crate::report::{ReportError, ReportPaths, RunMetadata, write_reports};
use crate::reviews::{ReviewSource, ReviewSourceError, group_by_date};
use crate::taxonomy::{ConsolidationEngine, ConsolidationStats, TaxonomyError};
use crate::trends::{
    DEFAULT_LOOKBACK_DAYS, DEFAULT_OLDER_DAYS, DEFAULT_RECENT_DAYS, EmergingTopic, TopicFrequency,
    TrendAnalyzer, TrendReport, days_before,
};

/// Topics listed in the metadata file.
pub const METADATA_TOP_TOPICS: usize = 10;

/// Emerging topics listed in the metadata file.
pub const METADATA_EMERGING_TOPICS: usize = 5;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reviews could not be loaded.
    #[error(transparent)]
    Reviews(#[from] ReviewSourceError),
    /// The taxonomy rejected a mapping.
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
    /// Output files could not be written.
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// What to analyze and where to put the results.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Store identifier of the app.
    pub app_id: String,
    /// Last day of the window (T).
    pub target_date: NaiveDate,
    /// Days before T included in the window.
    pub lookback_days: u64,
    /// Directory for the report files.
    pub output_dir: PathBuf,
}

impl PipelineOptions {
    /// Options with the default 30-day lookback.
    #[must_use]
    pub fn new(app_id: impl Into<String>, target_date: NaiveDate, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_id: app_id.into(),
            target_date,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            output_dir: output_dir.into(),
        }
    }

    /// First day of the window.
    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        days_before(self.target_date, self.lookback_days)
    }
}

/// Results of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Contents of the metadata file.
    pub metadata: RunMetadata,
    /// All emerging topics, not only those in the metadata file.
    pub emerging_topics: Vec<EmergingTopic>,
    /// The written trend table.
    pub report: TrendReport,
    /// Where the files went.
    pub paths: ReportPaths,
    /// How the taxonomy was built.
    pub consolidation: ConsolidationStats,
}

impl RunSummary {
    /// Top trending topics, most frequent first.
    #[must_use]
    pub fn top_topics(&self) -> &[TopicFrequency] {
        &self.metadata.top_topics
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The window had no reviews; nothing was written.
    NoReviews {
        /// First day of the window.
        start_date: NaiveDate,
        /// Last day of the window.
        end_date: NaiveDate,
    },
    /// Reports were written.
    Completed(Box<RunSummary>),
}

/// The components of one run.
pub struct Pipeline {
    source: Box<dyn ReviewSource>,
    extractor: Box<dyn TopicExtractor>,
    engine: ConsolidationEngine,
}

impl Pipeline {
    /// Assembles a pipeline.
    #[must_use]
    pub fn new(
        source: Box<dyn ReviewSource>,
        extractor: Box<dyn TopicExtractor>,
        engine: ConsolidationEngine,
    ) -> Self {
        Self {
            source,
            extractor,
            engine,
        }
    }

    /// Runs the analysis for `options`, ticking `progress` once per day.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if reviews cannot be loaded, the taxonomy
    /// reports a conflicting mapping, or the reports cannot be written.
    #[instrument(skip_all, fields(app_id = %options.app_id, target = %options.target_date))]
    pub async fn run(
        mut self,
        options: &PipelineOptions,
        progress: &ProgressBar,
    ) -> Result<PipelineOutcome, PipelineError> {
        let start_date = options.start_date();
        let end_date = options.target_date;

        let reviews = self.source.fetch(start_date, end_date).await?;
        let total_reviews = reviews.len();
        info!(source = self.source.name(), total_reviews, %start_date, %end_date, "Reviews loaded");

        if total_reviews == 0 {
            return Ok(PipelineOutcome::NoReviews {
                start_date,
                end_date,
            });
        }

        let by_date = group_by_date(reviews, start_date, end_date);
        progress.set_length(u64::try_from(by_date.len()).unwrap_or(u64::MAX));

        let mut analyzer = TrendAnalyzer::new();
        let mut days_with_reviews = 0_usize;

        for (date, daily_reviews) in &by_date {
            progress.set_message(date.format("%Y-%m-%d").to_string());
            if !daily_reviews.is_empty() {
                days_with_reviews += 1;

                let extracted = self.extractor.extract(daily_reviews).await;
                let batch = unique_topics(&extracted);
                self.engine.consolidate(&batch).await?;
                let canonical = self.engine.apply(&extracted);
                analyzer.add_daily_data(*date, &canonical);

                debug!(
                    %date,
                    reviews = daily_reviews.len(),
                    raw_topics = batch.len(),
                    canonical_topics = self.engine.store().canonical_count(),
                    "Day processed"
                );
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let report = analyzer.trend_report(end_date, options.lookback_days);
        let top_topics =
            analyzer.trending_topics(end_date, options.lookback_days, METADATA_TOP_TOPICS);
        let emerging_topics =
            analyzer.emerging_topics(end_date, DEFAULT_RECENT_DAYS, DEFAULT_OLDER_DAYS);

        let metadata = RunMetadata {
            app_id: options.app_id.clone(),
            target_date: end_date,
            start_date,
            lookback_days: options.lookback_days,
            total_reviews_processed: total_reviews,
            days_with_reviews,
            total_canonical_topics: self.engine.store().canonical_count(),
            top_topics,
            emerging_topics: emerging_topics
                .iter()
                .take(METADATA_EMERGING_TOPICS)
                .cloned()
                .collect(),
        };

        let snapshot = self.engine.snapshot();
        let paths = write_reports(&options.output_dir, &report, &snapshot, &metadata)?;
        let consolidation = self.engine.stats();
        info!(
            days_with_reviews,
            canonical_topics = metadata.total_canonical_topics,
            matcher_calls = consolidation.matcher_calls,
            matcher_failures = consolidation.matcher_failures,
            "Analysis complete"
        );

        Ok(PipelineOutcome::Completed(Box::new(RunSummary {
            metadata,
            emerging_topics,
            report,
            paths,
            consolidation,
        })))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("source", &self.source.name())
            .field("extractor", &self.extractor.name())
            .field("engine", &self.engine)
            .finish()
    }
}
