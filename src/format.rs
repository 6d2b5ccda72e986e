//! Output formatting for settings, validation reports and resolved paths.

use crate::config::{FieldSpec, Settings};
use crate::error::{MalformedLine, ValidationErrors};
use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// One row of the `paths` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathRow {
    pub name: String,
    pub path: PathBuf,
    /// `None` for a dry run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        _ => Ok(serde_json::to_string_pretty(value)? + "\n"),
    }
}

/// Render settings. Secrets are always redacted.
pub fn format_settings(settings: &Settings, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let entries = settings.entries();
            let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            let mut out = String::new();
            for (key, value) in entries {
                out.push_str(&format!("{:<width$}  {}\n", key, value, width = width));
            }
            Ok(out)
        }
        _ => serialize(settings, format),
    }
}

/// Render every validation failure, one per field.
pub fn format_validation_errors(errors: &ValidationErrors, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = format!("Configuration is invalid ({} error(s)):\n", errors.len());
            for err in errors.iter() {
                out.push_str(&format!("  {:<22} {}", err.field, err.reason));
                if let Some(ref value) = err.value {
                    out.push_str(&format!(" (got {:?})", value));
                }
                out.push_str(&format!(": {}\n", err.detail));
            }
            Ok(out)
        }
        _ => {
            let mut wrapper = BTreeMap::new();
            wrapper.insert("errors", errors.as_slice());
            serialize(&wrapper, format)
        }
    }
}

/// Render resolved (or located) paths.
pub fn format_paths(rows: &[PathRow], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
            let mut out = String::new();
            for row in rows {
                let marker = match row.created {
                    Some(true) => "  (created)",
                    _ => "",
                };
                out.push_str(&format!(
                    "{:<width$}  {}{}\n",
                    row.name,
                    row.path.display(),
                    marker,
                    width = width
                ));
            }
            Ok(out)
        }
        _ => serialize(&rows, format),
    }
}

/// One row of the `schema` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaRow {
    pub key: String,
    pub env_var: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    pub required: bool,
    pub help: &'static str,
}

impl SchemaRow {
    pub fn new(spec: &FieldSpec, prefix: &str) -> Self {
        Self {
            key: spec.key(),
            env_var: spec.env_var(prefix),
            kind: spec.kind.describe(),
            default: spec.default,
            required: spec.required,
            help: spec.help,
        }
    }
}

/// Render the declared settings.
pub fn format_schema(fields: &[FieldSpec], prefix: &str, format: OutputFormat) -> Result<String> {
    let rows: Vec<SchemaRow> = fields.iter().map(|f| SchemaRow::new(f, prefix)).collect();
    match format {
        OutputFormat::Text => {
            let width = rows.iter().map(|r| r.env_var.len()).max().unwrap_or(0);
            let mut out = String::new();
            for row in &rows {
                let default = match (row.default, row.required) {
                    (Some(d), _) => format!("default {}", d),
                    (None, true) => "required".to_string(),
                    (None, false) => "optional".to_string(),
                };
                out.push_str(&format!(
                    "{:<width$}  {} ({}; {})\n",
                    row.env_var,
                    row.help,
                    row.kind,
                    default,
                    width = width
                ));
            }
            Ok(out)
        }
        _ => serialize(&rows, format),
    }
}

/// Render skipped dot-env lines as warnings.
pub fn format_source_issues(issues: &[MalformedLine]) -> String {
    let mut out = String::new();
    for issue in issues {
        out.push_str(&format!("warning: skipped {}\n", issue));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawConfigMap, SCHEMA, validate};
    use crate::error::ValidationError;

    fn settings() -> Settings {
        let mut raw = RawConfigMap::new();
        raw.insert("REPORT_DIR".into(), "reports".into());
        raw.insert("SECRET_KEY".into(), "hunter2".into());
        validate(&raw).unwrap()
    }

    #[test]
    fn test_settings_text_redacts_secret() {
        let out = format_settings(&settings(), OutputFormat::Text).unwrap();
        assert!(out.contains("REPORT_DIR"));
        assert!(out.contains("[redacted]"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn test_settings_json_redacts_secret() {
        let out = format_settings(&settings(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["report_dir"], "reports");
        assert_eq!(value["secret_key"], "[redacted]");
    }

    #[test]
    fn test_settings_yaml() {
        let out = format_settings(&settings(), OutputFormat::Yaml).unwrap();
        assert!(out.contains("report_dir: reports"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn test_validation_errors_list_every_field() {
        let errors = ValidationErrors::from_vec(vec![
            ValidationError::missing("REPORT_DIR"),
            ValidationError::type_mismatch("MAX_ROWS", "integer").with_value("abc"),
        ])
        .unwrap();

        let text = format_validation_errors(&errors, OutputFormat::Text).unwrap();
        assert!(text.contains("2 error(s)"));
        assert!(text.contains("REPORT_DIR"));
        assert!(text.contains("\"abc\""));

        let json = format_validation_errors(&errors, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["errors"][1]["reason"], "TYPE_MISMATCH");
        assert!(value["errors"][0].get("value").is_none());
    }

    #[test]
    fn test_paths_dry_run_has_no_marker() {
        let rows = vec![PathRow {
            name: "cache_dir".into(),
            path: PathBuf::from("/srv/app/.cache"),
            created: None,
        }];
        let out = format_paths(&rows, OutputFormat::Text).unwrap();
        assert!(out.starts_with("cache_dir"));
        assert!(!out.contains("created"));

        let json = format_paths(&rows, OutputFormat::Json).unwrap();
        assert!(!json.contains("created"));
    }

    #[test]
    fn test_schema_listing_uses_prefix() {
        let text = format_schema(SCHEMA, "DASH_", OutputFormat::Text).unwrap();
        assert_eq!(text.lines().count(), SCHEMA.len());
        assert!(text.contains("DASH_REPORT_DIR"));
        assert!(text.contains("required"));
        assert!(text.contains("default 10000"));

        let json = format_schema(SCHEMA, "APP_", OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["key"], "ENVIRONMENT");
        assert_eq!(value[0]["env_var"], "APP_ENVIRONMENT");
    }
}
