//! File configuration for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Defaults read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FileConfig {
    /// Default output directory for reports.
    pub(crate) output_dir: Option<PathBuf>,
    /// Gemini model name.
    pub(crate) model: Option<String>,
    /// Generative Language API base URL.
    pub(crate) llm_base_url: Option<String>,
    /// Review API base URL.
    pub(crate) review_api_url: Option<String>,
    /// Sampling temperature for topic extraction.
    pub(crate) extraction_temperature: Option<f32>,
    /// Sampling temperature for topic consolidation.
    pub(crate) consolidation_temperature: Option<f32>,
    /// Cap on generated tokens per model call.
    pub(crate) max_output_tokens: Option<u32>,
    /// Whole-request timeout for model calls, in seconds.
    pub(crate) llm_timeout_secs: Option<u64>,
    /// Deadline for one semantic matcher call, in seconds.
    pub(crate) matcher_timeout_secs: Option<u64>,
    /// Transport retries for model calls.
    pub(crate) llm_max_retries: Option<u32>,
    /// Reviews per extraction call.
    pub(crate) extraction_chunk_size: Option<usize>,
    /// Pause between review API pages, in milliseconds.
    pub(crate) review_page_delay_ms: Option<u64>,
    /// Default verbosity mode.
    pub(crate) verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub(crate) fn validate(&self) -> Result<()> {
        validate_temperature("extraction_temperature", self.extraction_temperature)?;
        validate_temperature("consolidation_temperature", self.consolidation_temperature)?;
        validate_range_u64(
            "max_output_tokens",
            self.max_output_tokens.map(u64::from),
            1,
            MAX_OUTPUT_TOKENS_LIMIT,
        )?;
        validate_range_u64("llm_timeout_secs", self.llm_timeout_secs, 1, 3600)?;
        validate_range_u64("matcher_timeout_secs", self.matcher_timeout_secs, 1, 3600)?;
        validate_range_u64("llm_max_retries", self.llm_max_retries.map(u64::from), 0, 10)?;
        validate_range_u64(
            "extraction_chunk_size",
            self.extraction_chunk_size
                .map(|n| u64::try_from(n).unwrap_or(u64::MAX)),
            1,
            200,
        )?;
        validate_range_u64("review_page_delay_ms", self.review_page_delay_ms, 0, 60_000)?;
        Ok(())
    }
}

/// Upper bound accepted for `max_output_tokens`.
pub(crate) const MAX_OUTPUT_TOKENS_LIMIT: u64 = 65_536;

pub(crate) fn validate_temperature(field: &str, value: Option<f32>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(0.0..=2.0).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 0.0..=2.0");
    }
    Ok(())
}

fn validate_range_u64(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub(crate) struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub(crate) path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub(crate) config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/review-trends/config.toml`
/// 2. `$HOME/.config/review-trends/config.toml`
#[must_use]
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("review-trends")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("review-trends")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub(crate) fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

pub(crate) fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "model" => cfg.model = Some(parse_string_literal(value).with_context(invalid)?),
            "llm_base_url" => {
                cfg.llm_base_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "review_api_url" => {
                cfg.review_api_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "extraction_temperature" => {
                cfg.extraction_temperature = Some(parse_float(value).with_context(invalid)?);
            }
            "consolidation_temperature" => {
                cfg.consolidation_temperature = Some(parse_float(value).with_context(invalid)?);
            }
            "max_output_tokens" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.max_output_tokens = Some(
                    u32::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("max_output_tokens out of range for u32"))
                        .with_context(invalid)?,
                );
            }
            "llm_timeout_secs" => {
                cfg.llm_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "matcher_timeout_secs" => {
                cfg.matcher_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "llm_max_retries" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.llm_max_retries = Some(
                    u32::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("llm_max_retries out of range for u32"))
                        .with_context(invalid)?,
                );
            }
            "extraction_chunk_size" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.extraction_chunk_size = Some(
                    usize::try_from(parsed)
                        .map_err(|_| anyhow::anyhow!("extraction_chunk_size out of range"))
                        .with_context(invalid)?,
                );
            }
            "review_page_delay_ms" => {
                cfg.review_page_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

pub(crate) fn parse_float(raw_value: &str) -> Result<f32> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected numeric value");
    }
    let value = token.parse::<f32>()?;
    if !value.is_finite() {
        bail!("Expected a finite number");
    }
    Ok(value)
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
model = "gemini-1.5-pro"
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.output_dir.is_none());
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
output_dir = "/tmp/reports"
model = "gemini-1.5-flash"
llm_base_url = "http://localhost:9000"
review_api_url = "http://localhost:9001"
extraction_temperature = 0.6
consolidation_temperature = 0.2
max_output_tokens = 4096
llm_timeout_secs = 90
matcher_timeout_secs = 30
llm_max_retries = 3
extraction_chunk_size = 25
review_page_delay_ms = 250
verbosity = "quiet"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/tmp/reports")));
        assert_eq!(cfg.llm_base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(cfg.review_api_url.as_deref(), Some("http://localhost:9001"));
        assert_eq!(cfg.extraction_temperature, Some(0.6));
        assert_eq!(cfg.consolidation_temperature, Some(0.2));
        assert_eq!(cfg.max_output_tokens, Some(4096));
        assert_eq!(cfg.llm_timeout_secs, Some(90));
        assert_eq!(cfg.matcher_timeout_secs, Some(30));
        assert_eq!(cfg.llm_max_retries, Some(3));
        assert_eq!(cfg.extraction_chunk_size, Some(25));
        assert_eq!(cfg.review_page_delay_ms, Some(250));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
    }

    #[test]
    fn test_parse_config_rejects_out_of_range_temperature() {
        let err = parse_config_str("extraction_temperature = 2.5")
            .expect_err("temperature above 2.0 should be rejected");
        assert!(err.to_string().contains("extraction_temperature"));
    }

    #[test]
    fn test_parse_config_rejects_zero_chunk_size() {
        let err = parse_config_str("extraction_chunk_size = 0").expect_err("0 is below range");
        assert!(err.to_string().contains("extraction_chunk_size"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_timeout_value() {
        let err =
            parse_config_str("matcher_timeout_secs = 0").expect_err("invalid timeout expected");
        assert!(err.to_string().contains("matcher_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("llm_max_retries = 4 trailing")
            .expect_err("expected trailing token error");
        assert!(format!("{err:#}").contains("llm_max_retries"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("model = gemini").expect_err("unquoted string should fail");
        assert!(format!("{err:#}").contains("model"));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
llm_max_retries = 4 # transport retries
output_dir = "out#1" # hash inside string is kept
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.llm_max_retries, Some(4));
        assert_eq!(cfg.output_dir, Some(PathBuf::from("out#1")));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("unknown_key = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("unknown_key"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("\nmodel\n").expect_err("syntax error expected");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_config_rejects_bad_verbosity() {
        let err = parse_config_str(r#"verbosity = "loud""#).expect_err("bad verbosity");
        assert!(format!("{err:#}").contains("loud"));
    }

    #[test]
    fn test_parse_float_rejects_non_finite() {
        assert!(parse_float("inf").is_err());
        assert!(parse_float("NaN").is_err());
        assert!(parse_float("").is_err());
    }

    #[test]
    fn test_verbosity_as_str() {
        assert_eq!(VerbositySetting::Default.as_str(), "default");
        assert_eq!(VerbositySetting::Verbose.as_str(), "verbose");
        assert_eq!(VerbositySetting::Quiet.as_str(), "quiet");
        assert_eq!(VerbositySetting::Debug.as_str(), "debug");
    }
}
