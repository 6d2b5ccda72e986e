//! The validated settings snapshot.

use serde::{Serialize, Serializer};
use std::fmt;

/// Allowed `ENVIRONMENT` values.
pub const ENVIRONMENT_CHOICES: &[&str] = &["development", "staging", "production"];

/// Allowed `LOG_LEVEL` values.
pub const LOG_LEVEL_CHOICES: &[&str] = &["trace", "debug", "info", "warn", "error"];

const REDACTED: &str = "[redacted]";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" => Some(Environment::Development),
            "staging" => Some(Environment::Staging),
            "production" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Minimum log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// A value that never appears in any rendering of `Settings`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The actual value. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

/// Immutable, validated configuration.
///
/// Only [`validate`](super::validate) constructs one. Path fields hold the
/// configured text; [`PathResolver`](crate::paths::PathResolver) turns them
/// into filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub(crate) environment: Environment,
    pub(crate) app_root: Option<String>,
    pub(crate) report_dir: String,
    pub(crate) cache_dir: String,
    pub(crate) temp_dir: Option<String>,
    pub(crate) data_dir: String,
    pub(crate) logs_dir: String,
    pub(crate) database_file: String,
    pub(crate) max_rows: i64,
    pub(crate) cache_ttl_seconds: i64,
    pub(crate) session_ttl_seconds: i64,
    pub(crate) log_level: LogLevel,
    pub(crate) log_to_file: bool,
    pub(crate) log_separate_errors: bool,
    pub(crate) secret_key: Option<Secret>,
}

impl Settings {
    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn app_root(&self) -> Option<&str> {
        self.app_root.as_deref()
    }

    pub fn report_dir(&self) -> &str {
        &self.report_dir
    }

    pub fn cache_dir(&self) -> &str {
        &self.cache_dir
    }

    pub fn temp_dir(&self) -> Option<&str> {
        self.temp_dir.as_deref()
    }

    pub fn data_dir(&self) -> &str {
        &self.data_dir
    }

    pub fn logs_dir(&self) -> &str {
        &self.logs_dir
    }

    pub fn database_file(&self) -> &str {
        &self.database_file
    }

    pub fn max_rows(&self) -> i64 {
        self.max_rows
    }

    pub fn cache_ttl_seconds(&self) -> i64 {
        self.cache_ttl_seconds
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn log_to_file(&self) -> bool {
        self.log_to_file
    }

    pub fn log_separate_errors(&self) -> bool {
        self.log_separate_errors
    }

    pub fn secret_key(&self) -> Option<&Secret> {
        self.secret_key.as_ref()
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// `(KEY, display value)` pairs in schema order. Secrets are redacted.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        fn opt(value: Option<&str>) -> String {
            value.map(str::to_string).unwrap_or_else(|| "(unset)".to_string())
        }

        vec![
            ("ENVIRONMENT", self.environment.as_str().to_string()),
            ("APP_ROOT", opt(self.app_root.as_deref())),
            ("REPORT_DIR", self.report_dir.clone()),
            ("CACHE_DIR", self.cache_dir.clone()),
            ("TEMP_DIR", opt(self.temp_dir.as_deref())),
            ("DATA_DIR", self.data_dir.clone()),
            ("LOGS_DIR", self.logs_dir.clone()),
            ("DATABASE_FILE", self.database_file.clone()),
            ("MAX_ROWS", self.max_rows.to_string()),
            ("CACHE_TTL_SECONDS", self.cache_ttl_seconds.to_string()),
            ("SESSION_TTL_SECONDS", self.session_ttl_seconds.to_string()),
            ("LOG_LEVEL", self.log_level.as_str().to_string()),
            ("LOG_TO_FILE", self.log_to_file.to_string()),
            ("LOG_SEPARATE_ERRORS", self.log_separate_errors.to_string()),
            (
                "SECRET_KEY",
                match self.secret_key {
                    Some(_) => REDACTED.to_string(),
                    None => "(unset)".to_string(),
                },
            ),
        ]
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.entries() {
            writeln!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}
