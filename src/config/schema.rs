//! Configuration schema types for `sitepipe.toml`
//!
//! Defines the structure and validation rules for a site's asset pipeline.
//! Every section is optional; the defaults describe the conventional
//! `source/` working tree and `build/` output directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project layout section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,
    /// Working tree holding sources and derived assets
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Packaged output directory
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_name() -> String {
    "site".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("source")
}

fn default_out() -> PathBuf {
    PathBuf::from("build")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { name: default_name(), root: default_root(), out: default_out() }
    }
}

/// Stylesheet pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Entry stylesheets (paths or globs, relative to the working tree)
    #[serde(default = "default_style_sources")]
    pub sources: Vec<String>,
    /// Extra Sass load paths
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
    /// Bundle file name
    #[serde(default = "default_style_bundle")]
    pub bundle: String,
    /// Directory the bundle is written to
    #[serde(default = "default_style_dest")]
    pub dest: PathBuf,
    /// Browserslist queries used for vendor prefixing
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    /// Emit compressed CSS
    #[serde(default = "default_true")]
    pub compressed: bool,
}

fn default_style_sources() -> Vec<String> {
    vec!["sass/style.sass".to_string()]
}

fn default_style_bundle() -> String {
    "style.min.css".to_string()
}

fn default_style_dest() -> PathBuf {
    PathBuf::from("css")
}

fn default_browsers() -> Vec<String> {
    vec!["last 10 versions".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            sources: default_style_sources(),
            load_paths: Vec::new(),
            bundle: default_style_bundle(),
            dest: default_style_dest(),
            browsers: default_browsers(),
            compressed: true,
        }
    }
}

/// Script pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    /// Scripts concatenated into the bundle, in order
    #[serde(default = "default_script_sources")]
    pub sources: Vec<String>,
    /// Bundle file name
    #[serde(default = "default_script_bundle")]
    pub bundle: String,
    /// Directory the bundle is written to
    #[serde(default = "default_script_dest")]
    pub dest: PathBuf,
}

fn default_script_sources() -> Vec<String> {
    vec!["js/main.js".to_string()]
}

fn default_script_bundle() -> String {
    "main.min.js".to_string()
}

fn default_script_dest() -> PathBuf {
    PathBuf::from("js")
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            sources: default_script_sources(),
            bundle: default_script_bundle(),
            dest: default_script_dest(),
        }
    }
}

/// Raster image pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Glob selecting raw raster sources; SVG matches are ignored
    #[serde(default = "default_image_sources")]
    pub sources: String,
    /// Folder derived images are written to
    #[serde(default = "default_image_dest")]
    pub dest: PathBuf,
    /// AVIF quality (1-100)
    #[serde(default = "default_avif_quality")]
    pub avif_quality: u8,
    /// AVIF encoder speed (1 slowest - 10 fastest)
    #[serde(default = "default_avif_speed")]
    pub avif_speed: u8,
    /// JPEG re-encode quality used by the optimizer (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_image_sources() -> String {
    "img/src/*.*".to_string()
}

fn default_image_dest() -> PathBuf {
    PathBuf::from("img")
}

fn default_avif_quality() -> u8 {
    50
}

fn default_avif_speed() -> u8 {
    6
}

fn default_jpeg_quality() -> u8 {
    80
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            sources: default_image_sources(),
            dest: default_image_dest(),
            avif_quality: default_avif_quality(),
            avif_speed: default_avif_speed(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// SVG sprite settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteConfig {
    /// Glob selecting icon sources
    #[serde(default = "default_sprite_sources")]
    pub sources: String,
    /// Directory the sprite is written to
    #[serde(default = "default_image_dest")]
    pub dest: PathBuf,
    /// Sprite file name
    #[serde(default = "default_sprite_file")]
    pub file: String,
    /// Write a preview page next to the sprite
    #[serde(default = "default_true")]
    pub example: bool,
    /// Sub-directory of `dest` holding the preview page
    #[serde(default = "default_example_dir")]
    pub example_dir: PathBuf,
}

fn default_sprite_sources() -> String {
    "img/*.svg".to_string()
}

fn default_sprite_file() -> String {
    "sprite.svg".to_string()
}

fn default_example_dir() -> PathBuf {
    PathBuf::from("stack")
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            sources: default_sprite_sources(),
            dest: default_image_dest(),
            file: default_sprite_file(),
            example: true,
            example_dir: default_example_dir(),
        }
    }
}

/// Web font pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontsConfig {
    /// Folder with raw font sources
    #[serde(default = "default_font_src")]
    pub src: PathBuf,
    /// Folder web fonts are written to
    #[serde(default = "default_font_dest")]
    pub dest: PathBuf,
}

fn default_font_src() -> PathBuf {
    PathBuf::from("fonts/src")
}

fn default_font_dest() -> PathBuf {
    PathBuf::from("fonts")
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self { src: default_font_src(), dest: default_font_dest() }
    }
}

/// HTML page assembly settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    /// Glob selecting page templates
    #[serde(default = "default_page_sources")]
    pub sources: String,
    /// Folders searched for included fragments
    #[serde(default = "default_include_paths")]
    pub include_paths: Vec<PathBuf>,
    /// Directory assembled pages are written to
    #[serde(default = "default_page_dest")]
    pub dest: PathBuf,
}

fn default_page_sources() -> String {
    "pages/*.html".to_string()
}

fn default_include_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("html")]
}

fn default_page_dest() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            sources: default_page_sources(),
            include_paths: default_include_paths(),
            dest: default_page_dest(),
        }
    }
}

/// Development server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on (0 picks a free port)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// A watch rule: when a path matching any pattern changes, run `action`.
///
/// `action` is a task name (`styles`, `images`, ...) or `reload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRuleConfig {
    /// Globs relative to the working tree
    pub patterns: Vec<String>,
    /// Task to run, or `reload` for a full browser reload
    pub action: String,
}

impl WatchRuleConfig {
    fn new(patterns: &[&str], action: &str) -> Self {
        Self {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            action: action.to_string(),
        }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
    /// Path-pattern to action rules
    #[serde(default = "default_watch_rules")]
    pub rules: Vec<WatchRuleConfig>,
}

fn default_debounce_ms() -> u32 {
    100
}

fn default_watch_rules() -> Vec<WatchRuleConfig> {
    vec![
        WatchRuleConfig::new(&["sass/**/*.sass", "sass/**/*.scss"], "styles"),
        WatchRuleConfig::new(&["img/src/**"], "images"),
        WatchRuleConfig::new(&["js/main.js"], "scripts"),
        WatchRuleConfig::new(&["html/**/*", "pages/*"], "pages"),
        WatchRuleConfig::new(&["*.html"], "reload"),
    ]
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false, rules: default_watch_rules() }
    }
}

/// Packaging manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Ordered globs; `!` negates, later entries override earlier ones
    #[serde(default = "default_package_patterns")]
    pub patterns: Vec<String>,
}

fn default_package_patterns() -> Vec<String> {
    [
        "css/style.min.css",
        "!img/**/*.html",
        "img/*.*",
        "!img/*.svg",
        "img/sprite.svg",
        "fonts/*.*",
        "js/main.min.js",
        "*.html",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self { patterns: default_package_patterns() }
    }
}

/// Complete sitepipe.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Project layout
    #[serde(default)]
    pub project: ProjectConfig,
    /// Stylesheet pipeline
    #[serde(default)]
    pub styles: StylesConfig,
    /// Script pipeline
    #[serde(default)]
    pub scripts: ScriptsConfig,
    /// Image pipeline
    #[serde(default)]
    pub images: ImagesConfig,
    /// Sprite pipeline
    #[serde(default)]
    pub sprite: SpriteConfig,
    /// Font pipeline
    #[serde(default)]
    pub fonts: FontsConfig,
    /// Page pipeline
    #[serde(default)]
    pub pages: PagesConfig,
    /// Dev server
    #[serde(default)]
    pub server: ServerConfig,
    /// Watcher
    #[serde(default)]
    pub watch: WatchConfig,
    /// Packaging manifest
    #[serde(default)]
    pub package: PackageConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "images.avif_quality")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitepipe.toml: '{}' {}", self.field, self.message)
    }
}

impl SiteConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: &str| {
            errors.push(ConfigValidationError { field, message: message.to_string() });
        };

        if self.project.root.as_os_str().is_empty() {
            push("project.root".to_string(), "must be a non-empty path");
        }
        if self.project.out.as_os_str().is_empty() {
            push("project.out".to_string(), "must be a non-empty path");
        }

        if self.styles.bundle.is_empty() {
            push("styles.bundle".to_string(), "must be a non-empty file name");
        }
        if self.scripts.bundle.is_empty() {
            push("scripts.bundle".to_string(), "must be a non-empty file name");
        }

        for (field, value) in [
            ("images.avif_quality", self.images.avif_quality),
            ("images.jpeg_quality", self.images.jpeg_quality),
        ] {
            if !(1..=100).contains(&value) {
                push(field.to_string(), "must be between 1 and 100");
            }
        }
        if !(1..=10).contains(&self.images.avif_speed) {
            push("images.avif_speed".to_string(), "must be between 1 and 10");
        }

        if self.sprite.file.is_empty() {
            push("sprite.file".to_string(), "must be a non-empty file name");
        }

        let globs = self
            .styles
            .sources
            .iter()
            .map(|p| ("styles.sources", p.as_str()))
            .chain(self.scripts.sources.iter().map(|p| ("scripts.sources", p.as_str())))
            .chain(std::iter::once(("images.sources", self.images.sources.as_str())))
            .chain(std::iter::once(("sprite.sources", self.sprite.sources.as_str())))
            .chain(std::iter::once(("pages.sources", self.pages.sources.as_str())))
            .chain(
                self.package
                    .patterns
                    .iter()
                    .map(|p| ("package.patterns", p.trim_start_matches('!'))),
            );
        for (field, pattern) in globs {
            if let Err(e) = glob::Pattern::new(pattern) {
                push(field.to_string(), &format!("contains an invalid glob '{}': {}", pattern, e));
            }
        }

        if self.package.patterns.iter().all(|p| p.starts_with('!')) {
            push(
                "package.patterns".to_string(),
                "must contain at least one non-negated glob pattern",
            );
        }

        for (i, rule) in self.watch.rules.iter().enumerate() {
            if rule.patterns.is_empty() {
                push(format!("watch.rules[{}].patterns", i), "must not be empty");
            }
            if rule.action.parse::<crate::watch::WatchAction>().is_err() {
                push(
                    format!("watch.rules[{}].action", i),
                    &format!("unknown action '{}'", rule.action),
                );
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_conventional_layout() {
        let config: SiteConfig = toml::from_str("").unwrap();
        assert_eq!(config.project.root, PathBuf::from("source"));
        assert_eq!(config.project.out, PathBuf::from("build"));
        assert_eq!(config.styles.sources, vec!["sass/style.sass"]);
        assert_eq!(config.styles.bundle, "style.min.css");
        assert_eq!(config.styles.browsers, vec!["last 10 versions"]);
        assert_eq!(config.scripts.bundle, "main.min.js");
        assert_eq!(config.images.sources, "img/src/*.*");
        assert_eq!(config.images.avif_quality, 50);
        assert_eq!(config.sprite.file, "sprite.svg");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.watch.rules.len(), 5);
        assert_eq!(config.package.patterns.len(), 8);
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[project]
name = "landing"
root = "site"
out = "dist"

[styles]
sources = ["scss/main.scss"]
bundle = "app.css"
browsers = ["> 1%", "not dead"]
compressed = false

[scripts]
sources = ["js/vendor.js", "js/app.js"]

[images]
avif_quality = 70
jpeg_quality = 90

[server]
port = 8080

[watch]
debounce_ms = 250

[[watch.rules]]
patterns = ["scss/**/*.scss"]
action = "styles"

[package]
patterns = ["css/*.css", "*.html"]
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.project.name, "landing");
        assert_eq!(config.project.root, PathBuf::from("site"));
        assert_eq!(config.project.out, PathBuf::from("dist"));
        assert_eq!(config.styles.bundle, "app.css");
        assert_eq!(config.styles.browsers.len(), 2);
        assert!(!config.styles.compressed);
        assert_eq!(config.scripts.sources.len(), 2);
        assert_eq!(config.images.avif_quality, 70);
        assert_eq!(config.images.jpeg_quality, 90);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.watch.debounce_ms, 250);
        assert_eq!(config.watch.rules.len(), 1);
        assert_eq!(config.package.patterns, vec!["css/*.css", "*.html"]);
        assert!(config.is_valid());
    }

    #[test]
    fn test_validation_quality_range() {
        let toml = r#"
[images]
avif_quality = 0
jpeg_quality = 101
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "images.avif_quality"));
        assert!(errors.iter().any(|e| e.field == "images.jpeg_quality"));
    }

    #[test]
    fn test_validation_unknown_watch_action() {
        let toml = r#"
[[watch.rules]]
patterns = ["*.md"]
action = "publish"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "watch.rules[0].action"));
    }

    #[test]
    fn test_validation_invalid_glob() {
        let toml = r#"
[package]
patterns = ["css/[.css"]
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "package.patterns"));
    }

    #[test]
    fn test_validation_only_negated_package_patterns() {
        let toml = r#"
[package]
patterns = ["!img/*.svg"]
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert!(!config.is_valid());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigValidationError {
            field: "images.avif_speed".to_string(),
            message: "must be between 1 and 10".to_string(),
        };
        assert_eq!(err.to_string(), "sitepipe.toml: 'images.avif_speed' must be between 1 and 10");
    }
}
