//! Raw configuration sources.
//!
//! Each source produces a flat string map without interpreting types. Keys are
//! the un-prefixed field keys (`MAX_ROWS`, not `APP_MAX_ROWS`).

use super::schema;
use crate::error::{MalformedLine, SourceLoadError};
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Flat key/value map produced by one source.
pub type RawConfigMap = BTreeMap<String, String>;

/// Prefix for environment variables unless overridden.
pub const DEFAULT_ENV_PREFIX: &str = "APP_";

/// Key (after the prefix) of the variable naming an alternate dot-env file.
pub const ENV_FILE_KEY: &str = "ENV_FILE";

/// Dot-env file used when no override is set, relative to the working directory.
pub const DEFAULT_DOTENV_FILE: &str = ".env";

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("static key pattern"));

/// A configuration source, ordered by precedence (lowest first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Compiled-in defaults (lowest priority)
    Defaults,
    /// A `KEY=VALUE` file
    DotEnvFile(PathBuf),
    /// Process environment (highest priority)
    Environment,
}

impl ConfigSource {
    /// Precedence rank. Higher wins on key collision.
    pub fn rank(&self) -> u8 {
        match self {
            ConfigSource::Defaults => 0,
            ConfigSource::DotEnvFile(_) => 1,
            ConfigSource::Environment => 2,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Defaults => write!(f, "defaults"),
            ConfigSource::DotEnvFile(path) => write!(f, "dotenv ({})", path.display()),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// Output of loading one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLoad {
    pub map: RawConfigMap,
    /// Lines that were skipped. Only dot-env files produce these.
    pub issues: Vec<MalformedLine>,
}

/// Reads raw maps from configuration sources.
///
/// The environment is captured once at construction, so loading is
/// repeatable and tests can inject variables without touching the process.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    prefix: String,
    env: Vec<(String, String)>,
}

impl SourceLoader {
    /// Loader over a snapshot of the process environment.
    pub fn from_process_env(prefix: impl Into<String>) -> Self {
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self {
            prefix: prefix.into(),
            env,
        }
    }

    /// Loader over an explicit set of variables.
    pub fn with_env<K, V>(prefix: impl Into<String>, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            env: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Raw value of a variable in the captured environment.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Dot-env file to read: `<prefix>ENV_FILE` if set, else `./.env`.
    pub fn dotenv_path(&self, working_dir: &Path) -> PathBuf {
        let var = format!("{}{}", self.prefix, ENV_FILE_KEY);
        match self.env_var(&var).filter(|v| !v.is_empty()) {
            Some(path) => working_dir.join(path),
            None => working_dir.join(DEFAULT_DOTENV_FILE),
        }
    }

    /// Load one source.
    pub fn load(&self, source: &ConfigSource) -> Result<SourceLoad, SourceLoadError> {
        let load = match source {
            ConfigSource::Defaults => SourceLoad {
                map: schema::default_map(),
                issues: Vec::new(),
            },
            ConfigSource::DotEnvFile(path) => self.load_dotenv(path)?,
            ConfigSource::Environment => self.load_env(),
        };
        debug!(source = %source, keys = load.map.len(), "Loaded configuration source");
        Ok(load)
    }

    fn load_env(&self) -> SourceLoad {
        let mut map = RawConfigMap::new();
        for (name, value) in &self.env {
            let Some(key) = name.strip_prefix(&self.prefix) else {
                continue;
            };
            if key.is_empty() || key == ENV_FILE_KEY {
                continue;
            }
            map.insert(key.to_string(), value.clone());
        }
        SourceLoad {
            map,
            issues: Vec::new(),
        }
    }

    fn load_dotenv(&self, path: &Path) -> Result<SourceLoad, SourceLoadError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No dot-env file");
                return Ok(SourceLoad::default());
            }
            Err(source) => {
                return Err(SourceLoadError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let load = parse_dotenv(path, &content, &self.prefix);
        for issue in &load.issues {
            warn!(path = %issue.path.display(), line = issue.line, "Skipping malformed line: {}", issue.reason);
        }
        Ok(load)
    }
}

/// Parse dot-env text.
///
/// Each line is read on its own so a bad line is skipped and recorded with
/// its line number while the rest still load. Values follow dotenvy's rules
/// (quoting, escapes, `$VAR` substitution, trailing ` # comment`); a key
/// starting with `prefix` is stored without it.
pub fn parse_dotenv(path: &Path, content: &str, prefix: &str) -> SourceLoad {
    let mut load = SourceLoad::default();

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let malformed = |reason: &str| MalformedLine {
            path: path.to_path_buf(),
            line: line_no,
            reason: reason.to_string(),
        };

        let body = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, _)) = body.split_once('=') else {
            load.issues.push(malformed("missing '='"));
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            load.issues.push(malformed("empty key"));
            continue;
        }
        if !KEY_PATTERN.is_match(key) {
            load.issues.push(malformed(&format!("invalid key '{}'", key)));
            continue;
        }

        let value = match parse_line(trimmed) {
            Ok(value) => value,
            Err(reason) => {
                load.issues.push(malformed(&reason));
                continue;
            }
        };

        let key = match key.strip_prefix(prefix) {
            Some(rest) if !rest.is_empty() && !prefix.is_empty() => rest,
            _ => key,
        };
        load.map.insert(key.to_string(), value);
    }

    load
}

/// Value of one `KEY=VALUE` line.
fn parse_line(line: &str) -> Result<String, String> {
    match dotenvy::from_read_iter(line.as_bytes()).next() {
        Some(Ok((_, value))) => Ok(value),
        Some(Err(e)) => Err(format!("invalid value: {}", e)),
        None => Err("no assignment".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> SourceLoad {
        parse_dotenv(Path::new(".env"), content, DEFAULT_ENV_PREFIX)
    }

    #[test]
    fn test_malformed_line_is_skipped_and_recorded() {
        let load = parse("FOO=bar\nBADLINE\nBAZ=qux");
        assert_eq!(load.map.len(), 2);
        assert_eq!(load.map["FOO"], "bar");
        assert_eq!(load.map["BAZ"], "qux");
        assert_eq!(load.issues.len(), 1);
        assert_eq!(load.issues[0].line, 2);
    }

    #[test]
    fn test_empty_key_is_malformed() {
        let load = parse("=value\nOK=1");
        assert_eq!(load.issues.len(), 1);
        assert_eq!(load.issues[0].line, 1);
        assert_eq!(load.issues[0].reason, "empty key");
        assert_eq!(load.map["OK"], "1");
    }

    #[test]
    fn test_comments_blank_lines_and_export() {
        let load = parse("# header\n\nexport REPORT_DIR=/srv/reports\n  MAX_ROWS = 50  \n");
        assert!(load.issues.is_empty());
        assert_eq!(load.map["REPORT_DIR"], "/srv/reports");
        assert_eq!(load.map["MAX_ROWS"], "50");
    }

    #[test]
    fn test_quoted_values() {
        let load = parse(
            "A=\"hello world\"\nB='single # kept'\nC=\"line\\nbreak\"\nD=plain # comment\nE=a=b",
        );
        assert!(load.issues.is_empty());
        assert_eq!(load.map["A"], "hello world");
        assert_eq!(load.map["B"], "single # kept");
        assert_eq!(load.map["C"], "line\nbreak");
        assert_eq!(load.map["D"], "plain");
        assert_eq!(load.map["E"], "a=b");
    }

    #[test]
    fn test_unquoted_whitespace_needs_quotes() {
        let load = parse("TITLE=Monthly report\nOK=\"Monthly report\"\nX=\"a\" b");
        assert_eq!(load.issues.len(), 2);
        assert_eq!(load.issues[0].line, 1);
        assert_eq!(load.issues[1].line, 3);
        assert!(load.issues[0].reason.starts_with("invalid value"));
        assert_eq!(load.map["OK"], "Monthly report");
    }

    #[test]
    fn test_unterminated_quote_is_malformed() {
        let load = parse("A=\"open\nB=1");
        assert_eq!(load.issues.len(), 1);
        assert_eq!(load.issues[0].line, 1);
        assert_eq!(load.map.get("A"), None);
    }

    #[test]
    fn test_prefixed_keys_are_stripped() {
        let load = parse("APP_MAX_ROWS=5\nAPP_=x");
        assert_eq!(load.map["MAX_ROWS"], "5");
        assert_eq!(load.map["APP_"], "x");
    }

    #[test]
    fn test_invalid_key_characters() {
        let load = parse("BAD KEY=1\n1ABC=2");
        assert_eq!(load.issues.len(), 2);
        assert!(load.map.is_empty());
    }

    #[test]
    fn test_env_source_filters_by_prefix() {
        let loader = SourceLoader::with_env(
            "APP_",
            [
                ("APP_MAX_ROWS", "10"),
                ("APP_ENV_FILE", "custom.env"),
                ("PATH", "/usr/bin"),
                ("APP_", "ignored"),
            ],
        );
        let load = loader.load(&ConfigSource::Environment).unwrap();
        assert_eq!(load.map.len(), 1);
        assert_eq!(load.map["MAX_ROWS"], "10");
    }

    #[test]
    fn test_dotenv_path_override() {
        let base = Path::new("/work");
        let loader = SourceLoader::with_env("APP_", [("APP_ENV_FILE", "conf/prod.env")]);
        assert_eq!(loader.dotenv_path(base), PathBuf::from("/work/conf/prod.env"));

        let loader = SourceLoader::with_env("APP_", Vec::<(String, String)>::new());
        assert_eq!(loader.dotenv_path(base), PathBuf::from("/work/.env"));
    }

    #[test]
    fn test_missing_dotenv_is_empty() {
        let loader = SourceLoader::with_env("APP_", Vec::<(String, String)>::new());
        let load = loader
            .load(&ConfigSource::DotEnvFile(PathBuf::from(
                "/definitely/not/here/.env",
            )))
            .unwrap();
        assert!(load.map.is_empty());
        assert!(load.issues.is_empty());
    }

    #[test]
    fn test_rank_order() {
        assert!(ConfigSource::Defaults.rank() < ConfigSource::DotEnvFile(PathBuf::new()).rank());
        assert!(ConfigSource::DotEnvFile(PathBuf::new()).rank() < ConfigSource::Environment.rank());
    }
}
