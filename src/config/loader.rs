//! Configuration loading and discovery for `sitepipe.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::SiteConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for during discovery
pub const CONFIG_FILE: &str = "sitepipe.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML parsing error
    #[error("Failed to parse sitepipe.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// A loaded configuration together with the directory it is anchored to.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Parsed and validated configuration
    pub config: SiteConfig,
    /// Directory relative config paths are resolved against
    pub base_dir: PathBuf,
    /// File the configuration was read from, if any
    pub source: Option<PathBuf>,
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the working tree
    pub root: Option<PathBuf>,
    /// Override the output directory
    pub out: Option<PathBuf>,
    /// Override the dev server port
    pub port: Option<u16>,
}

/// Find sitepipe.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    find_config_from(cwd)
}

/// Find sitepipe.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a sitepipe.toml file.
///
/// An explicit path must exist. Without one, the file is discovered with
/// [`find_config`]; when nothing is found the defaults are anchored to the
/// current directory.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            let config = load_config_file(&p)?;
            let base_dir = project_root(&p)
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            tracing::debug!(config = %p.display(), "loaded configuration");
            Ok(LoadedConfig { config, base_dir, source: Some(p) })
        }
        None => {
            let base_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            tracing::debug!("no sitepipe.toml found, using defaults");
            Ok(LoadedConfig { config: default_config(), base_dir, source: None })
        }
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    parse_config(&contents)
}

/// Parse and validate configuration text.
pub fn parse_config(contents: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Default configuration when no sitepipe.toml is found.
///
/// The project name is taken from the current directory.
pub fn default_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    if let Some(name) = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    {
        config.project.name = name;
    }
    config
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut SiteConfig, overrides: &CliOverrides) {
    if let Some(ref root) = overrides.root {
        config.project.root = root.clone();
    }
    if let Some(ref out) = overrides.out {
        config.project.out = out.clone();
    }
    if let Some(port) = overrides.port {
        config.server.port = port;
    }
}

/// Get the project root directory from a config file path.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// Absolute paths are returned unchanged.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
