//! Startup orchestration: load, merge, validate, bind a path resolver.

use super::merge::merge_with_origins;
use super::source::{ConfigSource, DEFAULT_ENV_PREFIX, SourceLoader};
use super::types::Settings;
use super::validate::validate;
use crate::error::{InitError, MalformedLine, PathResolutionError};
use crate::paths::PathResolver;
use crate::platform::{PlatformAdapter, host_platform};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Inputs to the pipeline. Defaults read the real process state.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Environment variable prefix.
    pub prefix: String,
    /// Variables to use instead of the process environment.
    pub env: Option<Vec<(String, String)>>,
    /// Dot-env file; when unset, `<prefix>ENV_FILE` or `./.env`.
    pub env_file: Option<PathBuf>,
    /// Directory treated as the working directory.
    pub working_dir: Option<PathBuf>,
    pub platform: Option<Arc<dyn PlatformAdapter>>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ENV_PREFIX.to_string(),
            env: None,
            env_file: None,
            working_dir: None,
            platform: None,
        }
    }
}

impl InitOptions {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_env<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_platform(mut self, platform: Arc<dyn PlatformAdapter>) -> Self {
        self.platform = Some(platform);
        self
    }
}

/// The validated settings and the resolver bound to them.
///
/// This is the only sanctioned way for the rest of the application to see
/// configuration; nothing else reads the environment or the dot-env file.
#[derive(Debug)]
pub struct ConfigurationManager {
    settings: Arc<Settings>,
    paths: PathResolver,
    sources: Vec<ConfigSource>,
    origins: BTreeMap<String, ConfigSource>,
    source_issues: Vec<MalformedLine>,
}

impl ConfigurationManager {
    /// Process entry point using the real environment. Succeeds at most once.
    pub fn initialize() -> Result<Self, InitError> {
        Self::initialize_with(InitOptions::default())
    }

    /// Process entry point with explicit options. Succeeds at most once.
    pub fn initialize_with(options: InitOptions) -> Result<Self, InitError> {
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(InitError::AlreadyInitialized);
        }
        Self::from_options(options)
    }

    /// Run the pipeline without the once-per-process guard.
    pub fn from_options(options: InitOptions) -> Result<Self, InitError> {
        let working_dir = match options.working_dir {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(PathResolutionError::working_dir)?,
        };
        let loader = match options.env {
            Some(vars) => SourceLoader::with_env(options.prefix, vars),
            None => SourceLoader::from_process_env(options.prefix),
        };
        let env_file = match options.env_file {
            Some(path) => resolve_against(&working_dir, path),
            None => loader.dotenv_path(&working_dir),
        };
        let platform = options.platform.unwrap_or_else(host_platform);

        let sources = vec![
            ConfigSource::Defaults,
            ConfigSource::DotEnvFile(env_file),
            ConfigSource::Environment,
        ];

        let mut maps = Vec::with_capacity(sources.len());
        let mut source_issues = Vec::new();
        for source in &sources {
            let load = loader.load(source)?;
            source_issues.extend(load.issues);
            maps.push((source.clone(), load.map));
        }

        let (merged, origins) = merge_with_origins(maps);
        let settings = match validate(&merged) {
            Ok(settings) => Arc::new(settings),
            Err(errors) => {
                warn!(count = errors.len(), "Configuration rejected");
                return Err(InitError::Invalid(errors));
            }
        };

        let paths = PathResolver::with_working_dir(Arc::clone(&settings), platform, &working_dir)?;
        info!(
            environment = settings.environment().as_str(),
            skipped_lines = source_issues.len(),
            "Configuration initialized"
        );

        Ok(Self {
            settings,
            paths,
            sources,
            origins,
            source_issues,
        })
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// Sources read, lowest precedence first.
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Which source supplied each raw key.
    pub fn origin(&self, key: &str) -> Option<&ConfigSource> {
        self.origins.get(key)
    }

    /// Dot-env lines that were skipped.
    pub fn source_issues(&self) -> &[MalformedLine] {
        &self.source_issues
    }
}

fn resolve_against(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
