//! Structured error types for the settings pipeline and path resolution.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure while reading a configuration source.
#[derive(Debug, Error)]
pub enum SourceLoadError {
    /// The dot-env file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A dot-env line that was skipped. Recoverable: loading continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedLine {
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for MalformedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.path.display(),
            self.line,
            self.reason
        )
    }
}

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationReason {
    MissingRequired,
    TypeMismatch,
    InvalidChoice,
    OutOfRange,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationReason::MissingRequired => "missing required value",
            ValidationReason::TypeMismatch => "type mismatch",
            ValidationReason::InvalidChoice => "invalid choice",
            ValidationReason::OutOfRange => "out of range",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    /// Offending raw value. `None` when missing or when the field is secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub reason: ValidationReason,
    pub detail: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: ValidationReason, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: None,
            reason,
            detail: detail.into(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    // Convenience constructors

    pub fn missing(field: &str) -> Self {
        Self::new(
            field,
            ValidationReason::MissingRequired,
            format!("{} is required and has no default", field),
        )
    }

    pub fn type_mismatch(field: &str, expected: &str) -> Self {
        Self::new(
            field,
            ValidationReason::TypeMismatch,
            format!("expected {}", expected),
        )
    }

    pub fn invalid_choice(field: &str, allowed: &[&str]) -> Self {
        Self::new(
            field,
            ValidationReason::InvalidChoice,
            format!("expected one of: {}", allowed.join(", ")),
        )
    }

    pub fn out_of_range(field: &str, min: i64, max: i64) -> Self {
        Self::new(
            field,
            ValidationReason::OutOfRange,
            format!("expected a value between {} and {}", min, max),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(ref value) => write!(
                f,
                "{}: {} (got {:?}; {})",
                self.field, self.reason, value, self.detail
            ),
            None => write!(f, "{}: {} ({})", self.field, self.reason, self.detail),
        }
    }
}

/// Every validation failure from a single `validate` call. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Returns `None` for an empty list.
    pub fn from_vec(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn as_slice(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Errors reported for one field.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.0.iter().filter(move |e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} invalid setting(s):", self.0.len())?;
        for err in &self.0 {
            writeln!(f, "  - {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Error kinds for path resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathErrorKind {
    InvalidConfiguration,
    CreateFailed,
    TempAllocationFailed,
}

/// Structured error for path resolution.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PathResolutionError {
    pub kind: PathErrorKind,
    pub message: String,
    pub path: Option<PathBuf>,
    #[source]
    pub source: Option<std::io::Error>,
}

impl PathResolutionError {
    pub fn new(kind: PathErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_source(mut self, source: std::io::Error) -> Self {
        self.source = Some(source);
        self
    }

    // Convenience constructors

    pub fn unknown_logical(name: &str) -> Self {
        Self::new(
            PathErrorKind::InvalidConfiguration,
            format!("Unknown logical path: {}", name),
        )
    }

    pub fn working_dir(source: std::io::Error) -> Self {
        Self::new(
            PathErrorKind::InvalidConfiguration,
            format!("Cannot determine the working directory: {}", source),
        )
        .with_source(source)
    }

    pub fn non_utf8(path: &Path) -> Self {
        Self::new(
            PathErrorKind::InvalidConfiguration,
            format!("Path is not valid UTF-8: {}", path.display()),
        )
        .with_path(path)
    }

    pub fn reserved_segment(path: &str, segment: &str) -> Self {
        Self::new(
            PathErrorKind::InvalidConfiguration,
            format!("Path {} contains reserved name '{}'", path, segment),
        )
        .with_path(path)
    }

    pub fn not_a_directory(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(
            PathErrorKind::CreateFailed,
            format!("{} exists and is not a directory", path.display()),
        )
        .with_path(path)
    }

    pub fn create_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::new(
            PathErrorKind::CreateFailed,
            format!("Failed to create {}: {}", path.display(), source),
        )
        .with_path(path)
        .with_source(source)
    }

    pub fn temp_exhausted(dir: impl Into<PathBuf>, attempts: u32) -> Self {
        let dir = dir.into();
        Self::new(
            PathErrorKind::TempAllocationFailed,
            format!(
                "No unique temporary name under {} after {} attempts",
                dir.display(),
                attempts
            ),
        )
        .with_path(dir)
    }

    pub fn temp_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        Self::new(
            PathErrorKind::TempAllocationFailed,
            format!("Failed to allocate {}: {}", path.display(), source),
        )
        .with_path(path)
        .with_source(source)
    }
}

/// Fatal failure of the startup pipeline.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Source(#[from] SourceLoadError),

    #[error("configuration is invalid\n{0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Paths(#[from] PathResolutionError),

    #[error("configuration has already been initialized in this process")]
    AlreadyInitialized,
}

/// Result type for path operations.
pub type PathResult<T> = std::result::Result<T, PathResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_from_empty_vec() {
        assert!(ValidationErrors::from_vec(Vec::new()).is_none());
    }

    #[test]
    fn test_validation_errors_display_lists_every_field() {
        let errors = ValidationErrors::from_vec(vec![
            ValidationError::missing("REPORT_DIR"),
            ValidationError::type_mismatch("MAX_ROWS", "an integer").with_value("abc"),
        ])
        .unwrap();
        let text = errors.to_string();
        assert!(text.starts_with("2 invalid setting(s):"));
        assert!(text.contains("REPORT_DIR: missing required value"));
        assert!(text.contains("MAX_ROWS: type mismatch (got \"abc\"; expected an integer)"));
    }

    #[test]
    fn test_reason_serializes_screaming_snake() {
        let json = serde_json::to_string(&ValidationReason::MissingRequired).unwrap();
        assert_eq!(json, "\"MISSING_REQUIRED\"");
    }

    #[test]
    fn test_path_error_kinds() {
        let err = PathResolutionError::unknown_logical("nowhere");
        assert_eq!(err.kind, PathErrorKind::InvalidConfiguration);
        assert!(err.to_string().contains("nowhere"));

        let err = PathResolutionError::temp_exhausted("/tmp", 8);
        assert_eq!(err.kind, PathErrorKind::TempAllocationFailed);
        assert_eq!(err.path.as_deref(), Some(std::path::Path::new("/tmp")));
    }
}
