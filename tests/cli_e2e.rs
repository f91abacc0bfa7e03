//! End-to-end CLI tests for the review-trends binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary with an isolated config dir and no API key.
fn review_trends(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("review-trends").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env_remove("GEMINI_API_KEY")
        .env_remove("GEMINI_MODEL")
        .env_remove("TEMPERATURE")
        .env_remove("MAX_OUTPUT_TOKENS")
        .env_remove("RUST_LOG");
    cmd
}

fn write_reviews(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("reviews.json");
    std::fs::write(&path, body).unwrap();
    path
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let dir = TempDir::new().unwrap();
    review_trends(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daily topic trend analysis"))
        .stdout(predicate::str::contains("--target-date"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let dir = TempDir::new().unwrap();
    review_trends(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("review-trends"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let dir = TempDir::new().unwrap();
    review_trends(dir.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_requires_app_id_and_target_date() {
    let dir = TempDir::new().unwrap();
    review_trends(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--app-id"));
}

#[test]
fn test_binary_rejects_malformed_target_date() {
    let dir = TempDir::new().unwrap();
    review_trends(dir.path())
        .args(["--app-id", "com.example.food", "--target-date", "June 30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn test_binary_without_review_source_explains_options() {
    let dir = TempDir::new().unwrap();
    review_trends(dir.path())
        .args(["--app-id", "com.example.food", "--target-date", "2024-06-30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--reviews-file"));
}

#[test]
fn test_binary_empty_window_prints_guidance_and_succeeds() {
    let dir = TempDir::new().unwrap();
    let reviews = write_reviews(dir.path(), "[]");
    let output = dir.path().join("out");

    review_trends(dir.path())
        .args(["--app-id", "com.example.food", "--target-date", "2024-06-30"])
        .arg("--reviews-file")
        .arg(&reviews)
        .arg("--output-dir")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("No reviews found between 2024-05-31 and 2024-06-30"))
        .stdout(predicate::str::contains("app id"));

    assert!(!output.exists());
}

#[test]
fn test_binary_writes_reports_without_api_key() {
    let dir = TempDir::new().unwrap();
    let reviews = write_reviews(
        dir.path(),
        r#"[
            {"reviewId": "a", "content": "Rider was rude", "score": 1, "at": "2024-06-29T10:00:00Z"},
            {"reviewId": "b", "content": "Food was cold", "score": 2, "at": "2024-06-30T18:30:00"}
        ]"#,
    );
    let output = dir.path().join("out");

    review_trends(dir.path())
        .args(["--app-id", "com.example.food", "--target-date", "2024-06-30"])
        .args(["--matcher", "lexical", "-q"])
        .arg("--reviews-file")
        .arg(&reviews)
        .arg("--output-dir")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Reviews processed: 2"));

    assert!(output.join("trend_report_2024-06-30.csv").exists());
    assert!(output.join("topic_mapping_2024-06-30.json").exists());
    let meta = std::fs::read_to_string(output.join("metadata_2024-06-30.json")).unwrap();
    assert!(meta.contains("\"total_reviews_processed\": 2"));
}

#[test]
fn test_binary_rejects_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("review-trends");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "extraction_temperature = 9.0\n").unwrap();
    let reviews = write_reviews(dir.path(), "[]");

    review_trends(dir.path())
        .args(["--app-id", "com.example.food", "--target-date", "2024-06-30"])
        .arg("--reviews-file")
        .arg(&reviews)
        .assert()
        .failure()
        .stderr(predicate::str::contains("extraction_temperature"));
}
