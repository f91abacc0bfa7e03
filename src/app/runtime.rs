use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use review_trends_core::extract::{default_seed_topics, load_seed_topics};
use review_trends_core::{
    ConsolidationEngine, GeminiClient, HttpReviewSource, HttpTimeouts, JsonFileSource,
    LexicalMatcher, LlmClient, LlmSemanticMatcher, LlmTopicExtractor, MatcherKind, Pipeline,
    PipelineOptions, PipelineOutcome, RetryPolicy, ReviewSource, SemanticMatcher,
};
use tracing::{debug, info, warn};

use crate::app::config::load_default_file_config;
use crate::app::config_runtime::{
    self, ENV_API_KEY, ReviewInput, RunSettings, apply_config_verbosity, resolve_settings,
};
use crate::app::terminal;
use crate::output;

pub(crate) async fn run_analysis() -> Result<()> {
    let (mut args, cli_sources) = config_runtime::parse_cli_with_sources();
    let loaded = load_default_file_config()?;
    apply_config_verbosity(&mut args, &cli_sources, loaded.config.as_ref());

    let default_level = config_runtime::resolve_default_log_level(args.verbose, args.quiet);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    let no_color = terminal::is_no_color_requested(&args);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    debug!(
        config_path = ?loaded.path,
        config_loaded = loaded.config.is_some(),
        verbosity = config_runtime::verbosity_label(args.verbose, args.quiet),
        "CLI arguments parsed"
    );

    let env = |name: &str| std::env::var(name).ok();
    let settings = resolve_settings(&args, &cli_sources, loaded.config.as_ref(), &env)?;

    if settings.api_key.is_none() {
        warn!(
            "{ENV_API_KEY} is not set; model calls will fail and topics will not be extracted"
        );
    }

    let seeds = resolve_seed_topics(settings.seed_topics.as_deref())?;
    info!(
        seed_topics = seeds.len(),
        matcher = settings.matcher.as_str(),
        model = %settings.model,
        "Review trend analysis starting"
    );

    let options = PipelineOptions::new(
        settings.app_id.clone(),
        settings.target_date,
        settings.output_dir.clone(),
    );
    let start_date = options.start_date();
    output::print_run_header(&settings.app_id, start_date, settings.target_date);

    let pipeline = build_pipeline(&settings, seeds)?;
    let show_progress = terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let progress = terminal::day_progress_bar(show_progress);

    match pipeline.run(&options, &progress).await? {
        PipelineOutcome::NoReviews {
            start_date,
            end_date,
        } => output::print_no_reviews_guidance(start_date, end_date),
        PipelineOutcome::Completed(summary) => output::print_run_summary(&summary),
    }
    Ok(())
}

/// Loads seed topics, using the built-in list when no file is given or the
/// file does not exist. An unreadable or malformed file is an error.
fn resolve_seed_topics(path: Option<&Path>) -> Result<Vec<String>> {
    match path {
        Some(path) if path.exists() => Ok(load_seed_topics(path)?),
        Some(path) => {
            warn!(
                path = %path.display(),
                "Seed topics file not found; using the default seed topics"
            );
            Ok(default_seed_topics())
        }
        None => Ok(default_seed_topics()),
    }
}

fn build_pipeline(settings: &RunSettings, seeds: Vec<String>) -> Result<Pipeline> {
    let client: Arc<dyn LlmClient> = Arc::new(
        GeminiClient::with_base_url(
            settings.api_key.clone(),
            settings.model.clone(),
            settings.llm_base_url.clone(),
            settings.http_timeouts,
        )
        .context("Failed to create the Gemini client")?
        .with_retry_policy(RetryPolicy::with_max_retries(settings.llm_max_retries)),
    );

    let source: Box<dyn ReviewSource> = match &settings.review_input {
        ReviewInput::File(path) => Box::new(JsonFileSource::new(path.clone())),
        ReviewInput::Api(url) => Box::new(
            HttpReviewSource::new(url, settings.app_id.clone(), HttpTimeouts::default())?
                .with_page_delay(settings.review_page_delay),
        ),
    };

    let extractor = LlmTopicExtractor::new(Arc::clone(&client), seeds)
        .with_options(settings.extraction)
        .with_chunk_size(settings.extraction_chunk_size);

    let matcher: Box<dyn SemanticMatcher> = match settings.matcher {
        MatcherKind::Llm => {
            Box::new(LlmSemanticMatcher::new(client).with_options(settings.consolidation))
        }
        MatcherKind::Lexical => Box::new(LexicalMatcher::default()),
    };
    let engine = ConsolidationEngine::new(matcher).with_call_timeout(settings.matcher_timeout);

    Ok(Pipeline::new(source, Box::new(extractor), engine))
}
