//! Source file discovery.
//!
//! Glob expansion relative to the working tree, literal entry checks, and
//! ordered manifest selection where `!pattern` removes earlier matches and
//! a later positive pattern adds them back.

use glob::{glob, MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Error during source discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    InvalidPattern(String, glob::PatternError),
    /// A literal (non-glob) source path does not exist
    MissingSource(PathBuf),
    /// IO error during file enumeration
    Io(std::io::Error),
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryError::InvalidPattern(pattern, err) => {
                write!(f, "Invalid glob pattern '{}': {}", pattern, err)
            }
            DiscoveryError::MissingSource(path) => {
                write!(f, "Source file not found: {}", path.display())
            }
            DiscoveryError::Io(err) => write!(f, "IO error during discovery: {}", err),
        }
    }
}

impl std::error::Error for DiscoveryError {}

impl From<std::io::Error> for DiscoveryError {
    fn from(err: std::io::Error) -> Self {
        DiscoveryError::Io(err)
    }
}

/// Options used for every relative-path match: `*` never crosses `/` and
/// wildcards never match a leading `.`, so dotfiles need an explicit pattern.
pub(crate) fn match_options() -> MatchOptions {
    MatchOptions { case_sensitive: true, require_literal_separator: true, require_literal_leading_dot: true }
}

/// Whether a pattern contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Discover files matching a glob pattern under `base_dir`.
///
/// Directories are never returned. Results are sorted.
pub fn discover_files(base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let base = Pattern::escape(&base_dir.to_string_lossy());
    let full_pattern = format!("{}/{}", base.trim_end_matches('/'), pattern);

    let paths = glob::glob_with(&full_pattern, match_options())
        .map_err(|e| DiscoveryError::InvalidPattern(pattern.to_string(), e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                tracing::warn!("error reading path: {}", e);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Expand an ordered list of sources.
///
/// Glob entries that match nothing contribute nothing. A literal entry
/// that does not exist is an error. Order is preserved; duplicates keep
/// their first position.
pub fn expand_sources(base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut seen = BTreeSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let matched = if is_glob(pattern) {
            discover_files(base_dir, pattern)?
        } else {
            let path = base_dir.join(pattern);
            if !path.is_file() {
                return Err(DiscoveryError::MissingSource(path));
            }
            vec![path]
        };

        for path in matched {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

/// List the direct children of `dir` that are files, sorted.
///
/// A missing directory is empty input.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A compiled manifest entry.
#[derive(Debug, Clone)]
pub struct ManifestPattern {
    pattern: Pattern,
    negated: bool,
}

impl ManifestPattern {
    /// Parse one manifest entry, with an optional leading `!`.
    pub fn parse(entry: &str) -> Result<Self, DiscoveryError> {
        let (negated, body) = match entry.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, entry),
        };
        let pattern =
            Pattern::new(body).map_err(|e| DiscoveryError::InvalidPattern(entry.to_string(), e))?;
        Ok(Self { pattern, negated })
    }

    /// Whether this entry removes matches.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether a `/`-separated relative path matches this entry's glob.
    pub fn matches(&self, relative: &str) -> bool {
        self.pattern.matches_with(relative, match_options())
    }
}

/// Decide whether a relative path is selected by an ordered manifest.
///
/// The last entry that matches wins; no match means not selected.
pub fn is_selected(patterns: &[ManifestPattern], relative: &str) -> bool {
    patterns
        .iter()
        .rev()
        .find(|p| p.matches(relative))
        .map(|p| !p.is_negated())
        .unwrap_or(false)
}

/// Select files under `base_dir` with an ordered manifest.
///
/// Returns sorted paths relative to `base_dir`.
pub fn select_manifest(base_dir: &Path, entries: &[String]) -> Result<Vec<PathBuf>, DiscoveryError> {
    let patterns = entries
        .iter()
        .map(|e| ManifestPattern::parse(e))
        .collect::<Result<Vec<_>, _>>()?;

    if !base_dir.is_dir() {
        return Ok(Vec::new());
    }

    let all = format!("{}/**/*", Pattern::escape(&base_dir.to_string_lossy()).trim_end_matches('/'));
    let walker = glob(&all).map_err(|e| DiscoveryError::InvalidPattern(all.clone(), e))?;

    let mut selected = Vec::new();
    for entry in walker {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("error reading path: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Ok(relative) = path.strip_prefix(base_dir) else {
            continue;
        };
        let key = relative_key(relative);
        if is_selected(&patterns, &key) {
            selected.push(relative.to_path_buf());
        }
    }

    selected.sort();
    Ok(selected)
}

/// `/`-joined form of a relative path, used for matching.
pub fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
