//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use review_trends_core::MatcherKind;

/// Default directory for report files.
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Daily topic trend analysis for app-store reviews.
///
/// Fetches 30 days of reviews ending on the target date, extracts topics with
/// a generative model, consolidates them into a stable taxonomy, and writes a
/// topic × date trend report.
#[derive(Parser, Debug)]
#[command(name = "review-trends")]
#[command(author, version, about)]
pub struct Args {
    /// App store identifier of the app to analyze (e.g., in.swiggy.android)
    #[arg(long)]
    pub app_id: String,

    /// Last day of the analysis window (YYYY-MM-DD)
    #[arg(long, value_parser = parse_target_date)]
    pub target_date: NaiveDate,

    /// Seed topics file (JSON array, or one topic per line)
    #[arg(long, value_name = "PATH")]
    pub seed_topics: Option<PathBuf>,

    /// Directory for report files
    #[arg(short = 'o', long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Read reviews from a local JSON export instead of the review API
    #[arg(long, value_name = "PATH", conflicts_with = "review_api_url")]
    pub reviews_file: Option<PathBuf>,

    /// Base URL of the review API
    #[arg(long, value_name = "URL")]
    pub review_api_url: Option<String>,

    /// Backend that decides whether two topics mean the same thing
    #[arg(long, value_enum, default_value_t = MatcherChoice::Llm)]
    pub matcher: MatcherChoice,

    /// Gemini model name (overrides GEMINI_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored log output (also honors NO_COLOR)
    #[arg(long)]
    pub no_color: bool,
}

/// Matcher backends selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatcherChoice {
    /// Ask the generative model
    Llm,
    /// Offline spelling/casing variant matching
    Lexical,
}

impl From<MatcherChoice> for MatcherKind {
    fn from(choice: MatcherChoice) -> Self {
        match choice {
            MatcherChoice::Llm => Self::Llm,
            MatcherChoice::Lexical => Self::Lexical,
        }
    }
}

fn parse_target_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD ({e})"))
}
