//! Merges CLI flags, environment and file config into run settings.
//!
//! Precedence: command-line flag > environment > config file > built-in default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use review_trends_core::extract::DEFAULT_EXTRACTION_CHUNK_SIZE;
use review_trends_core::http_client::DEFAULT_CONNECT_TIMEOUT_SECS;
use review_trends_core::llm::{
    DEFAULT_CONSOLIDATION_TEMPERATURE, DEFAULT_EXTRACTION_TEMPERATURE, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL, DEFAULT_LLM_MAX_RETRIES, DEFAULT_MAX_OUTPUT_TOKENS,
};
use review_trends_core::reviews::DEFAULT_PAGE_DELAY;
use review_trends_core::taxonomy::DEFAULT_MATCHER_TIMEOUT;
use review_trends_core::{GenerationOptions, HttpTimeouts, MatcherKind};

use crate::app::config::{
    FileConfig, MAX_OUTPUT_TOKENS_LIMIT, VerbositySetting, parse_float, validate_temperature,
};
use crate::cli::Args;

/// Whole-request timeout for model calls when not configured.
pub(crate) const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

pub(crate) const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub(crate) const ENV_MODEL: &str = "GEMINI_MODEL";
pub(crate) const ENV_TEMPERATURE: &str = "TEMPERATURE";
pub(crate) const ENV_MAX_OUTPUT_TOKENS: &str = "MAX_OUTPUT_TOKENS";

/// Which flags were given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) output_dir: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let command = Args::command();
    let matches = command.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    let sources = CliValueSources {
        output_dir: is_commandline_value(&matches, "output_dir"),
        verbose: is_commandline_value(&matches, "verbose"),
        quiet: is_commandline_value(&matches, "quiet"),
    };
    (args, sources)
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Where reviews come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReviewInput {
    File(PathBuf),
    Api(String),
}

/// Everything a run needs, fully resolved.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub(crate) app_id: String,
    pub(crate) target_date: NaiveDate,
    pub(crate) output_dir: PathBuf,
    pub(crate) seed_topics: Option<PathBuf>,
    pub(crate) review_input: ReviewInput,
    pub(crate) matcher: MatcherKind,
    pub(crate) model: String,
    pub(crate) llm_base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) extraction: GenerationOptions,
    pub(crate) consolidation: GenerationOptions,
    pub(crate) http_timeouts: HttpTimeouts,
    pub(crate) matcher_timeout: Duration,
    pub(crate) llm_max_retries: u32,
    pub(crate) extraction_chunk_size: usize,
    pub(crate) review_page_delay: Duration,
}

/// Resolves run settings. `env` looks up environment variables.
pub(crate) fn resolve_settings(
    args: &Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<RunSettings> {
    let file = file_config.cloned().unwrap_or_default();
    let env_value = |name: &str| env(name).filter(|value| !value.trim().is_empty());

    let output_dir = if cli_sources.output_dir {
        args.output_dir.clone()
    } else {
        file.output_dir.clone().unwrap_or_else(|| args.output_dir.clone())
    };

    let review_input = if let Some(path) = &args.reviews_file {
        ReviewInput::File(path.clone())
    } else if let Some(url) = args.review_api_url.clone().or(file.review_api_url.clone()) {
        ReviewInput::Api(url)
    } else {
        bail!(
            "No review source configured\n  Suggestion: pass --reviews-file <PATH> for a local JSON export, \
             or --review-api-url <URL> (or set `review_api_url` in the config file)"
        );
    };

    let model = args
        .model
        .clone()
        .or_else(|| env_value(ENV_MODEL))
        .or(file.model.clone())
        .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

    // One TEMPERATURE value drives both extraction and consolidation.
    let env_temperature = match env_value(ENV_TEMPERATURE) {
        Some(raw) => {
            let parsed = parse_float(&raw)
                .with_context(|| format!("Invalid {ENV_TEMPERATURE} environment value '{raw}'"))?;
            validate_temperature(ENV_TEMPERATURE, Some(parsed))?;
            Some(parsed)
        }
        None => None,
    };
    let extraction_temperature = env_temperature
        .or(file.extraction_temperature)
        .unwrap_or(DEFAULT_EXTRACTION_TEMPERATURE);
    let consolidation_temperature = env_temperature
        .or(file.consolidation_temperature)
        .unwrap_or(DEFAULT_CONSOLIDATION_TEMPERATURE);

    let max_output_tokens = match env_value(ENV_MAX_OUTPUT_TOKENS) {
        Some(raw) => {
            let parsed: u32 = raw.trim().parse().with_context(|| {
                format!("Invalid {ENV_MAX_OUTPUT_TOKENS} environment value '{raw}'")
            })?;
            if parsed == 0 || u64::from(parsed) > MAX_OUTPUT_TOKENS_LIMIT {
                bail!(
                    "Invalid {ENV_MAX_OUTPUT_TOKENS} environment value: {parsed}. Expected range: 1..={MAX_OUTPUT_TOKENS_LIMIT}"
                );
            }
            parsed
        }
        None => file.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
    };

    let base_options = GenerationOptions::default().with_max_output_tokens(max_output_tokens);

    Ok(RunSettings {
        app_id: args.app_id.clone(),
        target_date: args.target_date,
        output_dir,
        seed_topics: args.seed_topics.clone(),
        review_input,
        matcher: args.matcher.into(),
        model,
        llm_base_url: file
            .llm_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        api_key: env_value(ENV_API_KEY),
        extraction: base_options.with_temperature(extraction_temperature),
        consolidation: base_options.with_temperature(consolidation_temperature),
        http_timeouts: HttpTimeouts::from_secs(
            DEFAULT_CONNECT_TIMEOUT_SECS,
            file.llm_timeout_secs.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
        ),
        matcher_timeout: file
            .matcher_timeout_secs
            .map_or(DEFAULT_MATCHER_TIMEOUT, Duration::from_secs),
        llm_max_retries: file.llm_max_retries.unwrap_or(DEFAULT_LLM_MAX_RETRIES),
        extraction_chunk_size: file
            .extraction_chunk_size
            .unwrap_or(DEFAULT_EXTRACTION_CHUNK_SIZE),
        review_page_delay: file
            .review_page_delay_ms
            .map_or(DEFAULT_PAGE_DELAY, Duration::from_millis),
    })
}

/// Applies the config file's verbosity when no verbosity flag was given.
pub(crate) fn apply_config_verbosity(
    args: &mut Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) {
    if cli_sources.verbose || cli_sources.quiet {
        return;
    }
    let Some(verbosity) = file_config.and_then(|cfg| cfg.verbosity) else {
        return;
    };
    let (verbose, quiet) = match verbosity {
        VerbositySetting::Default => (0, false),
        VerbositySetting::Verbose => (1, false),
        VerbositySetting::Quiet => (0, true),
        VerbositySetting::Debug => (2, false),
    };
    args.verbose = verbose;
    args.quiet = quiet;
}

pub(crate) fn resolve_default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// An explicit `-v`/`-q` wins over `RUST_LOG`.
pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.verbose || cli_sources.quiet
}

pub(crate) fn verbosity_label(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        VerbositySetting::Quiet.as_str()
    } else if verbose == 0 {
        VerbositySetting::Default.as_str()
    } else if verbose == 1 {
        VerbositySetting::Verbose.as_str()
    } else {
        VerbositySetting::Debug.as_str()
    }
}
