//! Platform path conventions.
//!
//! Everything that differs between Windows-style and POSIX-style hosts lives
//! behind [`PlatformAdapter`]:
//! - separators and drive/UNC prefixes
//! - `.`/`..` folding (pure string manipulation, no filesystem I/O)
//! - reserved device names (`CON`, `NUL`, `COM1`, ...)
//! - temp and home directory discovery
//! - case folding for path equality
//!
//! Both adapters compile on every target, so Windows rules can be exercised
//! from a POSIX test run and vice versa.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment lookup used for temp/home discovery.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

fn process_env() -> EnvLookup {
    Arc::new(|key: &str| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

fn fixed_env(vars: HashMap<String, String>) -> EnvLookup {
    Arc::new(move |key: &str| vars.get(key).cloned().filter(|v| !v.is_empty()))
}

/// OS-specific path rules.
pub trait PlatformAdapter: Send + Sync + fmt::Debug {
    /// Short name used in logs ("posix" or "windows").
    fn name(&self) -> &'static str;

    /// Separator used when joining segments.
    fn separator(&self) -> char;

    /// Whether `c` separates segments on this platform.
    fn is_separator(&self, c: char) -> bool;

    /// Canonical form of `path` without touching the filesystem.
    fn normalize(&self, path: &str) -> PathBuf;

    fn is_absolute(&self, path: &str) -> bool;

    /// Whether a single path segment is a reserved device name.
    fn is_reserved_name(&self, segment: &str) -> bool;

    /// Root directory for temporary storage.
    fn user_temp_root(&self) -> PathBuf;

    fn home_dir(&self) -> Option<PathBuf>;

    /// Key used when comparing two paths for equality.
    fn fold_case(&self, path: &str) -> String;

    /// Join `path` onto `base` unless `path` is already absolute, then normalize.
    fn join(&self, base: &str, path: &str) -> PathBuf {
        if self.is_absolute(path) {
            self.normalize(path)
        } else {
            self.normalize(&format!("{}{}{}", base, self.separator(), path))
        }
    }

    /// First reserved segment of `path`, if any.
    fn reserved_segment<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.split(|c: char| self.is_separator(c))
            .find(|segment| self.is_reserved_name(segment))
    }

    /// Whether two path strings name the same location.
    fn same_path(&self, a: &str, b: &str) -> bool {
        let a = self.normalize(a);
        let b = self.normalize(b);
        self.fold_case(&a.to_string_lossy()) == self.fold_case(&b.to_string_lossy())
    }
}

/// Adapter for the platform this binary was compiled for.
pub fn host_platform() -> Arc<dyn PlatformAdapter> {
    if cfg!(windows) {
        Arc::new(WindowsPlatform::new())
    } else {
        Arc::new(PosixPlatform::new())
    }
}

/// Fold `.` and `..` out of a segment list.
///
/// `anchored` paths drop a `..` that would climb above the root; relative
/// paths keep leading `..` segments.
fn fold_segments<'a>(segments: impl Iterator<Item = &'a str>, anchored: bool) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => match out.last() {
                Some(last) if *last != ".." => {
                    out.pop();
                }
                _ if anchored => {}
                _ => out.push(".."),
            },
            name => out.push(name),
        }
    }
    out
}

/// POSIX-style rules: `/` separator, case-sensitive, no reserved names.
#[derive(Clone)]
pub struct PosixPlatform {
    env: EnvLookup,
}

impl PosixPlatform {
    /// Adapter reading the process environment.
    pub fn new() -> Self {
        Self { env: process_env() }
    }

    /// Adapter with a fixed environment (for tests).
    pub fn with_env(vars: HashMap<String, String>) -> Self {
        Self {
            env: fixed_env(vars),
        }
    }
}

impl Default for PosixPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PosixPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosixPlatform").finish_non_exhaustive()
    }
}

impl PlatformAdapter for PosixPlatform {
    fn name(&self) -> &'static str {
        "posix"
    }

    fn separator(&self) -> char {
        '/'
    }

    fn is_separator(&self, c: char) -> bool {
        c == '/'
    }

    fn normalize(&self, path: &str) -> PathBuf {
        let anchored = path.starts_with('/');
        let segments = fold_segments(path.split('/'), anchored);
        let joined = segments.join("/");
        match (anchored, joined.is_empty()) {
            (true, _) => PathBuf::from(format!("/{}", joined)),
            (false, true) => PathBuf::from("."),
            (false, false) => PathBuf::from(joined),
        }
    }

    fn is_absolute(&self, path: &str) -> bool {
        path.starts_with('/')
    }

    fn is_reserved_name(&self, _segment: &str) -> bool {
        false
    }

    fn user_temp_root(&self) -> PathBuf {
        match (self.env)("TMPDIR") {
            Some(dir) => self.normalize(&dir),
            None => PathBuf::from("/tmp"),
        }
    }

    fn home_dir(&self) -> Option<PathBuf> {
        (self.env)("HOME")
            .map(|home| self.normalize(&home))
            .or_else(dirs::home_dir)
    }

    fn fold_case(&self, path: &str) -> String {
        path.to_string()
    }
}

const WINDOWS_DEVICE_NAMES: &[&str] = &["CON", "PRN", "AUX", "NUL"];

/// Windows-style rules: `\` (and `/`) separators, drive letters, UNC shares,
/// case-insensitive comparison, reserved device names.
#[derive(Clone)]
pub struct WindowsPlatform {
    env: EnvLookup,
}

/// Leading, non-foldable part of a Windows path.
#[derive(Debug, PartialEq, Eq)]
enum WindowsAnchor {
    /// `foo\bar`
    Relative,
    /// `\foo` (current drive root)
    Root,
    /// `C:foo`
    Drive(char),
    /// `C:\foo`
    DriveRoot(char),
    /// `\\server\share\foo`
    Unc(String, String),
}

impl WindowsPlatform {
    /// Adapter reading the process environment.
    pub fn new() -> Self {
        Self { env: process_env() }
    }

    /// Adapter with a fixed environment (for tests).
    pub fn with_env(vars: HashMap<String, String>) -> Self {
        Self {
            env: fixed_env(vars),
        }
    }

    fn is_sep(c: char) -> bool {
        c == '\\' || c == '/'
    }

    /// Skip leading separators, then split off one segment.
    fn take_segment(text: &str) -> (&str, &str) {
        let text = text.trim_start_matches(Self::is_sep);
        match text.find(Self::is_sep) {
            Some(end) => (&text[..end], &text[end..]),
            None => (text, ""),
        }
    }

    /// Split off the anchor, returning it with the remaining text.
    fn split_anchor(path: &str) -> (WindowsAnchor, &str) {
        let mut chars = path.chars();
        let first = chars.next();
        let second = chars.next();
        let third = chars.next();

        match (first, second) {
            (Some(a), Some(b)) if Self::is_sep(a) && Self::is_sep(b) => {
                let (server, rest) = Self::take_segment(&path[2..]);
                let (share, rest) = Self::take_segment(rest);
                (
                    WindowsAnchor::Unc(server.to_string(), share.to_string()),
                    rest,
                )
            }
            (Some(a), _) if Self::is_sep(a) => (WindowsAnchor::Root, &path[1..]),
            (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => {
                let drive = letter.to_ascii_uppercase();
                match third {
                    Some(c) if Self::is_sep(c) => (WindowsAnchor::DriveRoot(drive), &path[3..]),
                    _ => (WindowsAnchor::Drive(drive), &path[2..]),
                }
            }
            _ => (WindowsAnchor::Relative, path),
        }
    }
}

impl Default for WindowsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WindowsPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowsPlatform").finish_non_exhaustive()
    }
}

impl PlatformAdapter for WindowsPlatform {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn separator(&self) -> char {
        '\\'
    }

    fn is_separator(&self, c: char) -> bool {
        Self::is_sep(c)
    }

    fn normalize(&self, path: &str) -> PathBuf {
        let (anchor, rest) = Self::split_anchor(path);
        let anchored = !matches!(anchor, WindowsAnchor::Relative | WindowsAnchor::Drive(_));
        let joined = fold_segments(rest.split(Self::is_sep), anchored).join("\\");

        let text = match anchor {
            WindowsAnchor::Relative if joined.is_empty() => ".".to_string(),
            WindowsAnchor::Relative => joined,
            WindowsAnchor::Root => format!("\\{}", joined),
            WindowsAnchor::Drive(d) => format!("{}:{}", d, joined),
            WindowsAnchor::DriveRoot(d) => format!("{}:\\{}", d, joined),
            WindowsAnchor::Unc(server, share) if joined.is_empty() => {
                format!("\\\\{}\\{}", server, share)
            }
            WindowsAnchor::Unc(server, share) => format!("\\\\{}\\{}\\{}", server, share, joined),
        };
        PathBuf::from(text)
    }

    fn is_absolute(&self, path: &str) -> bool {
        matches!(
            Self::split_anchor(path).0,
            WindowsAnchor::DriveRoot(_) | WindowsAnchor::Unc(_, _)
        )
    }

    fn is_reserved_name(&self, segment: &str) -> bool {
        if segment.is_empty() || segment == "." || segment == ".." {
            return false;
        }
        if segment.ends_with('.') || segment.ends_with(' ') {
            return true;
        }
        // `nul.txt` is as reserved as `nul`.
        let stem = segment.split('.').next().unwrap_or(segment).trim_end();
        let upper = stem.to_ascii_uppercase();
        if WINDOWS_DEVICE_NAMES.contains(&upper.as_str()) {
            return true;
        }
        match upper.as_bytes() {
            [b'C', b'O', b'M', d] | [b'L', b'P', b'T', d] => (b'1'..=b'9').contains(d),
            _ => false,
        }
    }

    fn user_temp_root(&self) -> PathBuf {
        if let Some(dir) = (self.env)("TMP").or_else(|| (self.env)("TEMP")) {
            return self.normalize(&dir);
        }
        if let Some(profile) = (self.env)("USERPROFILE") {
            return self.join(&profile, "AppData\\Local\\Temp");
        }
        PathBuf::from("C:\\Windows\\Temp")
    }

    fn home_dir(&self) -> Option<PathBuf> {
        (self.env)("USERPROFILE")
            .map(|home| self.normalize(&home))
            .or_else(dirs::home_dir)
    }

    fn fold_case(&self, path: &str) -> String {
        path.to_lowercase()
    }

    fn join(&self, base: &str, path: &str) -> PathBuf {
        match Self::split_anchor(path).0 {
            WindowsAnchor::DriveRoot(_) | WindowsAnchor::Unc(_, _) => self.normalize(path),
            // `\foo` stays on the base's drive.
            WindowsAnchor::Root => match Self::split_anchor(base).0 {
                WindowsAnchor::DriveRoot(d) | WindowsAnchor::Drive(d) => {
                    self.normalize(&format!("{}:{}", d, path))
                }
                _ => self.normalize(path),
            },
            _ => self.normalize(&format!("{}\\{}", base, path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_posix_normalize() {
        let p = PosixPlatform::with_env(HashMap::new());
        assert_eq!(p.normalize("/foo/bar/../baz/./qux"), PathBuf::from("/foo/baz/qux"));
        assert_eq!(p.normalize("//foo///bar/"), PathBuf::from("/foo/bar"));
        assert_eq!(p.normalize("/../etc"), PathBuf::from("/etc"));
        assert_eq!(p.normalize("../a/./b/.."), PathBuf::from("../a"));
        assert_eq!(p.normalize("a/.."), PathBuf::from("."));
        assert_eq!(p.normalize("/"), PathBuf::from("/"));
    }

    #[test]
    fn test_posix_backslash_is_not_a_separator() {
        let p = PosixPlatform::with_env(HashMap::new());
        assert_eq!(p.normalize("a\\b"), PathBuf::from("a\\b"));
        assert!(!p.is_reserved_name("CON"));
    }

    #[test]
    fn test_posix_temp_root() {
        let p = PosixPlatform::with_env(env(&[("TMPDIR", "/var/tmp/")]));
        assert_eq!(p.user_temp_root(), PathBuf::from("/var/tmp"));

        let p = PosixPlatform::with_env(HashMap::new());
        assert_eq!(p.user_temp_root(), PathBuf::from("/tmp"));
    }

    #[test]
    fn test_posix_case_sensitive() {
        let p = PosixPlatform::with_env(HashMap::new());
        assert!(!p.same_path("/Reports", "/reports"));
        assert!(p.same_path("/reports/./x", "/reports/x"));
    }

    #[test]
    fn test_windows_split_anchor() {
        assert_eq!(
            WindowsPlatform::split_anchor("c:\\x").0,
            WindowsAnchor::DriveRoot('C')
        );
        assert_eq!(WindowsPlatform::split_anchor("c:x").0, WindowsAnchor::Drive('C'));
        assert_eq!(WindowsPlatform::split_anchor("\\x").0, WindowsAnchor::Root);
        assert_eq!(
            WindowsPlatform::split_anchor("\\\\srv\\share\\x").0,
            WindowsAnchor::Unc("srv".to_string(), "share".to_string())
        );
        assert_eq!(WindowsPlatform::split_anchor("x").0, WindowsAnchor::Relative);
    }

    #[test]
    fn test_windows_reserved_names() {
        let w = WindowsPlatform::with_env(HashMap::new());
        for name in ["CON", "con", "Prn", "AUX", "nul", "COM1", "com9", "LPT1", "lpt9", "nul.txt"] {
            assert!(w.is_reserved_name(name), "{} should be reserved", name);
        }
        for name in ["COM0", "LPT10", "console", "reports", "data.csv", ".", ".."] {
            assert!(!w.is_reserved_name(name), "{} should not be reserved", name);
        }
        assert!(w.is_reserved_name("trailing."));
        assert!(w.is_reserved_name("trailing "));
    }
}
