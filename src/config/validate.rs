//! Schema validation: raw map in, `Settings` or every problem out.

use super::schema::{self, FALSY, FieldKind, FieldSpec, SCHEMA, TRUTHY};
use super::source::RawConfigMap;
use super::types::{Environment, LogLevel, Secret, Settings};
use crate::error::{ValidationError, ValidationErrors};
use tracing::debug;

/// Validate a merged map against the schema.
///
/// Every field is checked before returning; the error list covers all of
/// them. An empty value counts as absent.
pub fn validate(raw: &RawConfigMap) -> Result<Settings, ValidationErrors> {
    for key in raw.keys() {
        if schema::field(key).is_none() {
            debug!(key = %key, "Ignoring unknown configuration key");
        }
    }

    let mut check = Checker::new(raw);

    let environment = check
        .choice(&schema::ENVIRONMENT)
        .and_then(Environment::from_str)
        .unwrap_or_default();
    let app_root = check.path(&schema::APP_ROOT);
    let report_dir = check.path(&schema::REPORT_DIR).unwrap_or_default();
    let cache_dir = check.path(&schema::CACHE_DIR).unwrap_or_default();
    let temp_dir = check.path(&schema::TEMP_DIR);
    let data_dir = check.path(&schema::DATA_DIR).unwrap_or_default();
    let logs_dir = check.path(&schema::LOGS_DIR).unwrap_or_default();
    let database_file = check.text(&schema::DATABASE_FILE).unwrap_or_default();
    let max_rows = check.integer(&schema::MAX_ROWS).unwrap_or_default();
    let cache_ttl_seconds = check.integer(&schema::CACHE_TTL_SECONDS).unwrap_or_default();
    let session_ttl_seconds = check.integer(&schema::SESSION_TTL_SECONDS).unwrap_or_default();
    let log_level = check
        .choice(&schema::LOG_LEVEL)
        .and_then(LogLevel::from_str)
        .unwrap_or_default();
    let log_to_file = check.boolean(&schema::LOG_TO_FILE).unwrap_or_default();
    let log_separate_errors = check.boolean(&schema::LOG_SEPARATE_ERRORS).unwrap_or_default();
    let secret_key = check.secret(&schema::SECRET_KEY);

    debug_assert_eq!(check.visited, SCHEMA.len(), "every schema field is validated");

    if let Some(errors) = ValidationErrors::from_vec(check.errors) {
        return Err(errors);
    }

    Ok(Settings {
        environment,
        app_root,
        report_dir,
        cache_dir,
        temp_dir,
        data_dir,
        logs_dir,
        database_file,
        max_rows,
        cache_ttl_seconds,
        session_ttl_seconds,
        log_level,
        log_to_file,
        log_separate_errors,
        secret_key,
    })
}

/// Collects per-field errors. Each method returns `None` when the field is
/// absent (and optional) or invalid; invalid values are recorded.
struct Checker<'a> {
    raw: &'a RawConfigMap,
    errors: Vec<ValidationError>,
    visited: usize,
}

impl<'a> Checker<'a> {
    fn new(raw: &'a RawConfigMap) -> Self {
        Self {
            raw,
            errors: Vec::new(),
            visited: 0,
        }
    }

    /// The raw value, falling back to the field default.
    fn lookup(&mut self, spec: &FieldSpec) -> Option<&'a str> {
        self.visited += 1;
        let raw: &'a RawConfigMap = self.raw;
        let key = spec.key();
        let value = raw
            .get(&key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .or(spec.default);

        if value.is_none() && spec.required {
            self.errors.push(ValidationError::missing(&key));
        }
        value
    }

    fn reject(&mut self, spec: &FieldSpec, error: ValidationError, value: &str) {
        let error = if spec.is_secret() {
            error
        } else {
            error.with_value(value)
        };
        self.errors.push(error);
    }

    fn text(&mut self, spec: &FieldSpec) -> Option<String> {
        self.lookup(spec).map(str::to_string)
    }

    fn path(&mut self, spec: &FieldSpec) -> Option<String> {
        let value = self.lookup(spec)?;
        if value.contains('\0') {
            let error = ValidationError::type_mismatch(&spec.key(), &spec.kind.describe());
            self.reject(spec, error, value);
            return None;
        }
        Some(value.to_string())
    }

    fn integer(&mut self, spec: &FieldSpec) -> Option<i64> {
        let value = self.lookup(spec)?;
        let FieldKind::Integer { min, max } = spec.kind else {
            return None;
        };
        let key = spec.key();
        match value.parse::<i64>() {
            Ok(n) if (min..=max).contains(&n) => Some(n),
            Ok(_) => {
                self.reject(spec, ValidationError::out_of_range(&key, min, max), value);
                None
            }
            Err(_) => {
                let error = ValidationError::type_mismatch(&key, &spec.kind.describe());
                self.reject(spec, error, value);
                None
            }
        }
    }

    fn boolean(&mut self, spec: &FieldSpec) -> Option<bool> {
        let value = self.lookup(spec)?;
        let lowered = value.to_ascii_lowercase();
        if TRUTHY.contains(&lowered.as_str()) {
            Some(true)
        } else if FALSY.contains(&lowered.as_str()) {
            Some(false)
        } else {
            let error = ValidationError::type_mismatch(&spec.key(), &spec.kind.describe());
            self.reject(spec, error, value);
            None
        }
    }

    /// Canonical (lowercase) spelling of the chosen value.
    fn choice(&mut self, spec: &FieldSpec) -> Option<&'static str> {
        let value = self.lookup(spec)?;
        let FieldKind::Choice(allowed) = spec.kind else {
            return None;
        };
        match allowed.iter().find(|c| c.eq_ignore_ascii_case(value)) {
            Some(canonical) => Some(*canonical),
            None => {
                let error = ValidationError::invalid_choice(&spec.key(), allowed);
                self.reject(spec, error, value);
                None
            }
        }
    }

    fn secret(&mut self, spec: &FieldSpec) -> Option<Secret> {
        self.lookup(spec).map(Secret::new)
    }
}
