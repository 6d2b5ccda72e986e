//! Logical path resolution and scoped temporary storage.
//!
//! This module turns symbolic resource names into concrete directories:
//! - Maps each [`LogicalPath`] to a base directory configured in `Settings`
//! - Expands a leading `~` to the home directory
//! - Joins relative paths onto the application root, then normalizes them
//!   through the [`PlatformAdapter`] (no filesystem I/O until creation)
//! - Rejects reserved device names before touching the filesystem
//! - Creates directories lazily and tolerates concurrent creation
//! - Allocates uniquely named temp files/directories that are removed when
//!   their [`ScopedTemp`] handle goes away

use crate::config::Settings;
use crate::error::{PathErrorKind, PathResolutionError, PathResult};
use crate::platform::PlatformAdapter;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Directory created under the temp root for the `temp_workspace` path.
pub const APP_DIR_NAME: &str = "dashboard";

/// Exclusive-create attempts before temp allocation gives up.
pub const MAX_TEMP_ATTEMPTS: u32 = 8;

/// Symbolic resource location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalPath {
    ReportOutputDir,
    CacheDir,
    TempWorkspace,
    DataDir,
    LogsDir,
}

impl LogicalPath {
    pub const ALL: [LogicalPath; 5] = [
        LogicalPath::ReportOutputDir,
        LogicalPath::CacheDir,
        LogicalPath::TempWorkspace,
        LogicalPath::DataDir,
        LogicalPath::LogsDir,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalPath::ReportOutputDir => "report_output_dir",
            LogicalPath::CacheDir => "cache_dir",
            LogicalPath::TempWorkspace => "temp_workspace",
            LogicalPath::DataDir => "data_dir",
            LogicalPath::LogsDir => "logs_dir",
        }
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalPath {
    type Err = PathResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogicalPath::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PathResolutionError::unknown_logical(s))
    }
}

/// Extension of every log file.
pub const LOG_FILE_SUFFIX: &str = "log";

/// Log files kept under the logs directory.
///
/// Files roll over daily as `<prefix>.<date>.log`; older ones are pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFile {
    Info,
    Errors,
}

impl LogFile {
    pub fn file_prefix(&self) -> &'static str {
        match self {
            LogFile::Info => "dashboard_info",
            LogFile::Errors => "dashboard_errors",
        }
    }

    /// Rolled files kept, one per day.
    pub fn retention_days(&self) -> usize {
        match self {
            LogFile::Info => 30,
            LogFile::Errors => 90,
        }
    }
}

/// An absolute, normalized path plus whether this call created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub created: bool,
}

/// Kind of temporary allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempKind {
    Dir,
    File,
}

/// Source of candidate temp names. Uniqueness is enforced by exclusive
/// creation, not by the namer.
pub trait TempNamer: Send + Sync + fmt::Debug {
    fn candidate(&self, prefix: &str) -> String;
}

/// Random word pair plus process id and sub-second clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct PetnameNamer;

impl TempNamer for PetnameNamer {
    fn candidate(&self, prefix: &str) -> String {
        use petname::{Generator, Petnames};

        let words = Petnames::medium()
            .generate_one(2, "-")
            .unwrap_or_else(|| "tmp".to_string());
        let nanos = chrono::Utc::now().timestamp_subsec_nanos();
        format!("{}{}-{}-{:08x}", prefix, words, std::process::id(), nanos)
    }
}

/// Temporary file or directory removed when dropped.
///
/// Removal happens on every exit path of the owning scope, including `?`
/// propagation and panics. Call [`keep`](ScopedTemp::keep) to opt out.
#[derive(Debug)]
pub struct ScopedTemp {
    path: PathBuf,
    kind: TempKind,
    armed: bool,
}

impl ScopedTemp {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> TempKind {
        self.kind
    }

    /// Remove the allocation now, reporting failure.
    pub fn release(mut self) -> io::Result<()> {
        self.armed = false;
        remove_temp(&self.path, self.kind)
    }

    /// Disown the allocation; it stays on disk.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl AsRef<Path> for ScopedTemp {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedTemp {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = remove_temp(&self.path, self.kind) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove temporary entry");
        }
    }
}

fn remove_temp(path: &Path, kind: TempKind) -> io::Result<()> {
    let result = match kind {
        TempKind::Dir => fs::remove_dir_all(path),
        TempKind::File => fs::remove_file(path),
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Resolves logical paths against one settings snapshot.
pub struct PathResolver {
    settings: Arc<Settings>,
    platform: Arc<dyn PlatformAdapter>,
    /// Absolute, normalized root for relative settings.
    root: String,
    namer: Arc<dyn TempNamer>,
    /// Directories known to exist, keyed by case-folded path.
    known: Mutex<HashMap<String, PathBuf>>,
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathResolver")
            .field("root", &self.root)
            .field("platform", &self.platform.name())
            .field("namer", &self.namer)
            .finish_non_exhaustive()
    }
}

impl PathResolver {
    /// Resolver rooted at the current working directory (or `APP_ROOT`).
    pub fn new(settings: Arc<Settings>, platform: Arc<dyn PlatformAdapter>) -> PathResult<Self> {
        let cwd = std::env::current_dir().map_err(PathResolutionError::working_dir)?;
        Self::with_working_dir(settings, platform, &cwd)
    }

    /// Resolver treating `working_dir` as the current directory.
    ///
    /// Fails when `working_dir` is not valid UTF-8, since every resolved
    /// path is built from its text.
    pub fn with_working_dir(
        settings: Arc<Settings>,
        platform: Arc<dyn PlatformAdapter>,
        working_dir: &Path,
    ) -> PathResult<Self> {
        let Some(working_dir) = working_dir.to_str() else {
            return Err(PathResolutionError::non_utf8(working_dir));
        };
        let base = platform.normalize(working_dir);
        let root = match settings.app_root() {
            Some(app_root) => {
                let expanded = expand_home(platform.as_ref(), app_root);
                platform.join(&base.to_string_lossy(), &expanded)
            }
            None => base,
        };
        let root = root.to_string_lossy().into_owned();
        debug!(root = %root, platform = platform.name(), "Path resolver ready");

        Ok(Self {
            settings,
            platform,
            root,
            namer: Arc::new(PetnameNamer),
            known: Mutex::new(HashMap::new()),
        })
    }

    /// Replace the temp name source.
    pub fn with_namer(mut self, namer: Arc<dyn TempNamer>) -> Self {
        self.namer = namer;
        self
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn platform(&self) -> &Arc<dyn PlatformAdapter> {
        &self.platform
    }

    /// Root that relative settings are joined onto.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Normalize a configured path value into an absolute path.
    fn absolute(&self, configured: &str) -> PathResult<PathBuf> {
        let expanded = expand_home(self.platform.as_ref(), configured);
        let path = self.platform.join(&self.root, &expanded);
        let text = path.to_string_lossy();
        if let Some(segment) = self.platform.reserved_segment(&text) {
            return Err(PathResolutionError::reserved_segment(&text, segment));
        }
        Ok(path)
    }

    /// Root for temporary allocations: `TEMP_DIR` or the platform default.
    ///
    /// A relative platform default (`TMPDIR=scratch`) is joined onto the root.
    pub fn temp_root(&self) -> PathResult<PathBuf> {
        match self.settings.temp_dir() {
            Some(dir) => self.absolute(dir),
            None => self.absolute(&self.platform.user_temp_root().to_string_lossy()),
        }
    }

    /// Where `logical` lives, without touching the filesystem.
    pub fn locate(&self, logical: LogicalPath) -> PathResult<PathBuf> {
        let configured = match logical {
            LogicalPath::ReportOutputDir => self.settings.report_dir(),
            LogicalPath::CacheDir => self.settings.cache_dir(),
            LogicalPath::DataDir => self.settings.data_dir(),
            LogicalPath::LogsDir => self.settings.logs_dir(),
            LogicalPath::TempWorkspace => {
                let temp_root = self.temp_root()?;
                return self.absolute(&format!(
                    "{}{}{}",
                    temp_root.to_string_lossy(),
                    self.platform.separator(),
                    APP_DIR_NAME
                ));
            }
        };
        self.absolute(configured)
    }

    /// Resolve `logical` to an existing directory, creating it if needed.
    pub fn resolve(&self, logical: LogicalPath) -> PathResult<ResolvedPath> {
        let path = self.locate(logical)?;
        let created = self.ensure_dir(&path)?;
        if created {
            info!(logical = %logical, path = %path.display(), "Created directory");
        }
        Ok(ResolvedPath { path, created })
    }

    /// Resolve a logical path given by name (`"cache_dir"`).
    pub fn resolve_name(&self, name: &str) -> PathResult<ResolvedPath> {
        self.resolve(name.parse()?)
    }

    /// Create `path` (and parents) unless it is already a directory.
    ///
    /// Returns whether this call created the final directory. Under a race
    /// exactly one caller sees `true`.
    fn ensure_dir(&self, path: &Path) -> PathResult<bool> {
        let key = self.platform.fold_case(&path.to_string_lossy());
        let cached = self
            .known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&key);
        if cached && path.is_dir() {
            return Ok(false);
        }

        let created = match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => false,
            Ok(_) => return Err(PathResolutionError::not_a_directory(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.create_dir(path)?,
            Err(e) => return Err(PathResolutionError::create_failed(path, e)),
        };

        self.known
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, path.to_path_buf());
        Ok(created)
    }

    fn create_dir(&self, path: &Path) -> PathResult<bool> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| PathResolutionError::create_failed(parent, e))?;
        }
        match fs::create_dir(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if path.is_dir() {
                    debug!(path = %path.display(), "Directory created concurrently");
                    Ok(false)
                } else {
                    Err(PathResolutionError::not_a_directory(path))
                }
            }
            Err(e) => Err(PathResolutionError::create_failed(path, e)),
        }
    }

    /// Allocate a uniquely named temp file or directory under [`temp_root`].
    ///
    /// [`temp_root`]: PathResolver::temp_root
    pub fn scoped_temp(&self, prefix: &str, kind: TempKind) -> PathResult<ScopedTemp> {
        if prefix.chars().any(|c| self.platform.is_separator(c) || c == '\0') {
            return Err(PathResolutionError::new(
                PathErrorKind::InvalidConfiguration,
                format!("Temp prefix '{}' must be a plain name", prefix),
            ));
        }

        let dir = self.temp_root()?;
        fs::create_dir_all(&dir).map_err(|e| PathResolutionError::temp_io(&dir, e))?;

        for attempt in 1..=MAX_TEMP_ATTEMPTS {
            let name = self.namer.candidate(prefix);
            if self.platform.is_reserved_name(&name) {
                debug!(name = %name, "Skipping reserved temp name");
                continue;
            }
            let candidate = dir.join(&name);
            let result = match kind {
                TempKind::Dir => fs::create_dir(&candidate),
                TempKind::File => fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&candidate)
                    .map(drop),
            };
            match result {
                Ok(()) => {
                    debug!(path = %candidate.display(), attempt, "Allocated temporary entry");
                    return Ok(ScopedTemp {
                        path: candidate,
                        kind,
                        armed: true,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %candidate.display(), attempt, "Temp name collision, retrying");
                }
                Err(e) => return Err(PathResolutionError::temp_io(candidate, e)),
            }
        }

        Err(PathResolutionError::temp_exhausted(dir, MAX_TEMP_ATTEMPTS))
    }

    /// Run `f` with a scoped temp entry; the entry is removed afterwards
    /// whether `f` succeeds, fails, or panics.
    pub fn with_temp<T, E, F>(&self, prefix: &str, kind: TempKind, f: F) -> Result<T, E>
    where
        F: FnOnce(&Path) -> Result<T, E>,
        E: From<PathResolutionError>,
    {
        let temp = self.scoped_temp(prefix, kind)?;
        f(temp.path())
    }

    /// Database file inside the (created) data directory.
    pub fn database_path(&self) -> PathResult<PathBuf> {
        let data = self.resolve(LogicalPath::DataDir)?;
        Ok(data.path.join(self.settings.database_file()))
    }

    /// SQLite connection URL for [`database_path`](PathResolver::database_path).
    pub fn database_url(&self) -> PathResult<String> {
        let path = self.database_path()?;
        Ok(format!(
            "sqlite:///{}",
            path.to_string_lossy().replace('\\', "/")
        ))
    }
}

/// Replace a leading `~` segment with the home directory.
fn expand_home(platform: &dyn PlatformAdapter, configured: &str) -> String {
    let Some(rest) = configured.strip_prefix('~') else {
        return configured.to_string();
    };
    if !(rest.is_empty() || rest.starts_with(|c: char| platform.is_separator(c))) {
        // `~user` is not expanded.
        return configured.to_string();
    }
    match platform.home_dir() {
        Some(home) => format!("{}{}", home.to_string_lossy(), rest),
        None => configured.to_string(),
    }
}
