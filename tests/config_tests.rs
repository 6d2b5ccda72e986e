//! Integration tests for the layered configuration pipeline.
//!
//! Covers source precedence (defaults < dot-env < environment), dot-env
//! parsing through the full pipeline, and alternate dot-env selection.

use dashboard_settings::config::{ConfigSource, ConfigurationManager, InitOptions, LogLevel};
use dashboard_settings::error::{InitError, ValidationReason};
use dashboard_settings::platform::PosixPlatform;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Options rooted at `dir` with a hermetic environment.
fn options(dir: &Path, env: &[(&str, &str)]) -> InitOptions {
    InitOptions::default()
        .with_working_dir(dir)
        .with_platform(Arc::new(PosixPlatform::with_env(HashMap::new())))
        .with_env(env.iter().map(|(k, v)| (k.to_string(), v.to_string())))
}

#[test]
fn test_environment_overrides_dotenv_overrides_defaults() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(".env"),
        "REPORT_DIR=file-reports\nMAX_ROWS=500\nLOG_LEVEL=debug\n",
    )
    .unwrap();

    let manager = ConfigurationManager::from_options(options(
        temp.path(),
        &[("APP_MAX_ROWS", "750")],
    ))
    .unwrap();
    let settings = manager.settings();

    // Environment wins over the file.
    assert_eq!(settings.max_rows(), 750);
    assert_eq!(manager.origin("MAX_ROWS"), Some(&ConfigSource::Environment));
    // File wins over defaults.
    assert_eq!(settings.log_level(), LogLevel::Debug);
    assert_eq!(settings.report_dir(), "file-reports");
    assert!(matches!(
        manager.origin("LOG_LEVEL"),
        Some(ConfigSource::DotEnvFile(_))
    ));
    // Untouched keys keep their defaults.
    assert_eq!(settings.cache_dir(), ".cache");
    assert_eq!(settings.cache_ttl_seconds(), 300);
    assert_eq!(manager.origin("CACHE_DIR"), Some(&ConfigSource::Defaults));
}

#[test]
fn test_malformed_dotenv_line_is_skipped() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(".env"),
        "REPORT_DIR=reports\nFOO=bar\nBADLINE\nBAZ=qux\n",
    )
    .unwrap();

    let manager = ConfigurationManager::from_options(options(temp.path(), &[])).unwrap();
    let issues = manager.source_issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].line, 3);
    assert_eq!(manager.origin("FOO"), manager.origin("BAZ"));
    assert!(matches!(manager.origin("BAZ"), Some(ConfigSource::DotEnvFile(_))));
}

#[test]
fn test_missing_dotenv_file_is_not_an_error() {
    let temp = TempDir::new().unwrap();
    let manager = ConfigurationManager::from_options(options(
        temp.path(),
        &[("APP_REPORT_DIR", "reports")],
    ))
    .unwrap();
    assert!(manager.source_issues().is_empty());
    assert_eq!(manager.settings().report_dir(), "reports");
}

#[test]
fn test_env_file_variable_selects_alternate_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".env"), "REPORT_DIR=default-file\n").unwrap();
    fs::write(temp.path().join("staging.env"), "REPORT_DIR=staging-file\nENVIRONMENT=staging\n")
        .unwrap();
    let alternate = temp.path().join("staging.env");

    let manager = ConfigurationManager::from_options(options(
        temp.path(),
        &[("APP_ENV_FILE", alternate.to_str().unwrap())],
    ))
    .unwrap();
    assert_eq!(manager.settings().report_dir(), "staging-file");
    assert_eq!(manager.settings().environment().as_str(), "staging");
    // The selector itself is not a setting.
    assert_eq!(manager.origin("ENV_FILE"), None);
}

#[test]
fn test_custom_prefix() {
    let temp = TempDir::new().unwrap();
    let manager = ConfigurationManager::from_options(
        options(
            temp.path(),
            &[("DASH_REPORT_DIR", "dash"), ("APP_REPORT_DIR", "ignored")],
        )
        .with_prefix("DASH_"),
    )
    .unwrap();
    assert_eq!(manager.settings().report_dir(), "dash");
}

#[test]
fn test_unreadable_dotenv_is_a_source_error() {
    let temp = TempDir::new().unwrap();
    // A directory where the file should be cannot be read as text.
    fs::create_dir(temp.path().join(".env")).unwrap();

    let result = ConfigurationManager::from_options(options(
        temp.path(),
        &[("APP_REPORT_DIR", "reports")],
    ));
    assert!(matches!(result, Err(InitError::Source(_))));
}

#[test]
fn test_invalid_value_in_file_is_reported_with_field() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".env"), "REPORT_DIR=r\nLOG_TO_FILE=sometimes\n").unwrap();

    match ConfigurationManager::from_options(options(temp.path(), &[])) {
        Err(InitError::Invalid(errors)) => {
            assert_eq!(errors.len(), 1);
            let err = errors.for_field("LOG_TO_FILE").next().unwrap();
            assert_eq!(err.reason, ValidationReason::TypeMismatch);
            assert_eq!(err.value.as_deref(), Some("sometimes"));
        }
        other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
    }
}
