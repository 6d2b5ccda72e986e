//! Declared settings schema.
//!
//! Every setting is a [`FieldSpec`] constant; [`SCHEMA`] lists them in display
//! order. The map key and the environment variable are derived from the field
//! name (`max_rows` -> `MAX_ROWS` -> `APP_MAX_ROWS`).

use super::source::RawConfigMap;
use super::types::{ENVIRONMENT_CHOICES, LOG_LEVEL_CHOICES};
use heck::ToShoutySnakeCase;

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer { min: i64, max: i64 },
    Boolean,
    Choice(&'static [&'static str]),
    /// Stored verbatim; interpreted by the path resolver.
    Path,
    /// Never rendered.
    Secret,
}

impl FieldKind {
    /// Human description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            FieldKind::Text => "text".to_string(),
            FieldKind::Integer { min, max } => format!("an integer in {}..={}", min, max),
            FieldKind::Boolean => format!("one of {}", BOOL_LITERALS.join(", ")),
            FieldKind::Choice(allowed) => format!("one of {}", allowed.join(", ")),
            FieldKind::Path => "a non-empty path".to_string(),
            FieldKind::Secret => "a secret".to_string(),
        }
    }
}

/// Accepted boolean spellings, compared case-insensitively.
pub const TRUTHY: &[&str] = &["1", "true", "yes", "on"];
pub const FALSY: &[&str] = &["0", "false", "no", "off"];
const BOOL_LITERALS: &[&str] = &["1", "true", "yes", "on", "0", "false", "no", "off"];

/// One declared setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// snake_case name, also the `Settings` accessor name.
    pub name: &'static str,
    pub kind: FieldKind,
    /// Literal used when the key is absent.
    pub default: Option<&'static str>,
    /// Missing with no default is an error.
    pub required: bool,
    pub help: &'static str,
}

impl FieldSpec {
    const fn optional(name: &'static str, kind: FieldKind, default: Option<&'static str>, help: &'static str) -> Self {
        Self {
            name,
            kind,
            default,
            required: false,
            help,
        }
    }

    const fn required(name: &'static str, kind: FieldKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            default: None,
            required: true,
            help,
        }
    }

    /// Key in a raw map (`MAX_ROWS`).
    pub fn key(&self) -> String {
        self.name.to_shouty_snake_case()
    }

    /// Environment variable (`APP_MAX_ROWS`).
    pub fn env_var(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.key())
    }

    pub fn is_secret(&self) -> bool {
        matches!(self.kind, FieldKind::Secret)
    }
}

pub const ENVIRONMENT: FieldSpec = FieldSpec::optional(
    "environment",
    FieldKind::Choice(ENVIRONMENT_CHOICES),
    Some("development"),
    "Deployment environment",
);
pub const APP_ROOT: FieldSpec = FieldSpec::optional(
    "app_root",
    FieldKind::Path,
    None,
    "Base directory for relative paths (default: working directory)",
);
pub const REPORT_DIR: FieldSpec =
    FieldSpec::required("report_dir", FieldKind::Path, "Report output directory");
pub const CACHE_DIR: FieldSpec =
    FieldSpec::optional("cache_dir", FieldKind::Path, Some(".cache"), "Cache directory");
pub const TEMP_DIR: FieldSpec = FieldSpec::optional(
    "temp_dir",
    FieldKind::Path,
    None,
    "Temporary storage root (default: platform temp directory)",
);
pub const DATA_DIR: FieldSpec =
    FieldSpec::optional("data_dir", FieldKind::Path, Some("data"), "Data directory");
pub const LOGS_DIR: FieldSpec =
    FieldSpec::optional("logs_dir", FieldKind::Path, Some("logs"), "Log directory");
pub const DATABASE_FILE: FieldSpec = FieldSpec::optional(
    "database_file",
    FieldKind::Text,
    Some("dashboard.db"),
    "SQLite database file name inside the data directory",
);
pub const MAX_ROWS: FieldSpec = FieldSpec::optional(
    "max_rows",
    FieldKind::Integer {
        min: 1,
        max: 1_000_000,
    },
    Some("10000"),
    "Maximum rows loaded per report",
);
pub const CACHE_TTL_SECONDS: FieldSpec = FieldSpec::optional(
    "cache_ttl_seconds",
    FieldKind::Integer { min: 0, max: 86_400 },
    Some("300"),
    "Lifetime of cached query results",
);
pub const SESSION_TTL_SECONDS: FieldSpec = FieldSpec::optional(
    "session_ttl_seconds",
    FieldKind::Integer {
        min: 60,
        max: 86_400,
    },
    Some("1800"),
    "Idle lifetime of a login session",
);
pub const LOG_LEVEL: FieldSpec = FieldSpec::optional(
    "log_level",
    FieldKind::Choice(LOG_LEVEL_CHOICES),
    Some("info"),
    "Minimum log level",
);
pub const LOG_TO_FILE: FieldSpec = FieldSpec::optional(
    "log_to_file",
    FieldKind::Boolean,
    Some("true"),
    "Also write logs under the log directory",
);
pub const LOG_SEPARATE_ERRORS: FieldSpec = FieldSpec::optional(
    "log_separate_errors",
    FieldKind::Boolean,
    Some("true"),
    "Write errors to a separate log file",
);
pub const SECRET_KEY: FieldSpec = FieldSpec::optional(
    "secret_key",
    FieldKind::Secret,
    None,
    "Session signing key",
);

/// All fields in display order.
pub static SCHEMA: &[FieldSpec] = &[
    ENVIRONMENT,
    APP_ROOT,
    REPORT_DIR,
    CACHE_DIR,
    TEMP_DIR,
    DATA_DIR,
    LOGS_DIR,
    DATABASE_FILE,
    MAX_ROWS,
    CACHE_TTL_SECONDS,
    SESSION_TTL_SECONDS,
    LOG_LEVEL,
    LOG_TO_FILE,
    LOG_SEPARATE_ERRORS,
    SECRET_KEY,
];

/// Look up a field by raw-map key.
pub fn field(key: &str) -> Option<&'static FieldSpec> {
    SCHEMA.iter().find(|spec| spec.key() == key)
}

/// The compiled-in defaults source.
pub fn default_map() -> RawConfigMap {
    SCHEMA
        .iter()
        .filter_map(|spec| spec.default.map(|d| (spec.key(), d.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_shouty_snake() {
        assert_eq!(MAX_ROWS.key(), "MAX_ROWS");
        assert_eq!(LOG_SEPARATE_ERRORS.key(), "LOG_SEPARATE_ERRORS");
        assert_eq!(REPORT_DIR.env_var("APP_"), "APP_REPORT_DIR");
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<String> = SCHEMA.iter().map(|s| s.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), SCHEMA.len());
    }

    #[test]
    fn test_default_map_skips_fields_without_default() {
        let defaults = default_map();
        assert_eq!(defaults.get("MAX_ROWS").map(String::as_str), Some("10000"));
        assert!(!defaults.contains_key("REPORT_DIR"));
        assert!(!defaults.contains_key("SECRET_KEY"));
        assert!(!defaults.contains_key("TEMP_DIR"));
    }

    #[test]
    fn test_required_fields_have_no_default() {
        for spec in SCHEMA {
            if spec.required {
                assert!(spec.default.is_none(), "{} is required but defaulted", spec.name);
            }
        }
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(field("CACHE_DIR"), Some(&CACHE_DIR));
        assert_eq!(field("cache_dir"), None);
        assert_eq!(field("UNKNOWN"), None);
    }
}
