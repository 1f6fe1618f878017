//! Configuration module for the sitepipe asset pipeline
//!
//! Provides types and parsing for `sitepipe.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{
    default_config, find_config, find_config_from, load_config, merge_cli_overrides,
    parse_config, resolve_path, CliOverrides, ConfigError, LoadedConfig, CONFIG_FILE,
};
pub use schema::*;
