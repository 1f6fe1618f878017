//! Build context containing configuration and state for a run.

use crate::config::SiteConfig;
use crate::reload::Reloader;
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for every task.
///
/// Paths in the configuration are relative: `project.root` and
/// `project.out` to the project directory, everything else to the working
/// tree (`project.root`).
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: SiteConfig,
    /// Directory holding sitepipe.toml (or the cwd without one)
    project_dir: PathBuf,
    /// Reload signal fan-out shared with the dev server
    reloader: Reloader,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: SiteConfig, project_dir: PathBuf) -> Self {
        Self { config, project_dir, reloader: Reloader::new(), verbose: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Get the project directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Working tree holding sources and derived assets.
    pub fn root_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.root)
    }

    /// Packaged output directory.
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Resolve a path inside the working tree.
    pub fn in_root(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else if path.as_os_str().is_empty() || path == Path::new(".") {
            self.root_dir()
        } else {
            self.root_dir().join(path)
        }
    }

    /// Reload signal fan-out.
    pub fn reloader(&self) -> &Reloader {
        &self.reloader
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Share an existing reloader.
    pub fn with_reloader(mut self, reloader: Reloader) -> Self {
        self.reloader = reloader;
        self
    }

    /// Resolve a path relative to the project directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::resolve_path(&self.project_dir, path)
    }
}
