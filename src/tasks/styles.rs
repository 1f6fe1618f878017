//! Stylesheet pipeline: Sass entry files to one prefixed, minified bundle.
//!
//! Each entry is compiled with `grass` (indented syntax for `.sass`, SCSS
//! otherwise). The concatenated CSS is then handed to `lightningcss`, which
//! adds vendor prefixes for the configured browserslist query and prints
//! the result. Output is deterministic for identical input.

use super::{write_output, TaskError, TaskOutcome};
use crate::build::{expand_sources, BuildContext};
use crate::config::StylesConfig;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::path::{Path, PathBuf};

/// Compile one Sass or SCSS file.
pub fn compile_sass(path: &Path, load_paths: &[PathBuf], compressed: bool) -> Result<String, TaskError> {
    let style = if compressed { grass::OutputStyle::Compressed } else { grass::OutputStyle::Expanded };
    let options = grass::Options::default().style(style).load_paths(load_paths);

    grass::from_path(path, &options)
        .map_err(|e| TaskError::Sass { path: path.to_path_buf(), message: e.to_string() })
}

/// Resolve browserslist queries to lightningcss targets.
pub fn browser_targets(queries: &[String]) -> Result<Targets, TaskError> {
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| TaskError::Css(format!("invalid browser query: {}", e)))?;
    Ok(Targets::from(browsers))
}

/// Prefix (and optionally minify) compiled CSS.
pub fn finalize_css(css: &str, filename: &str, targets: Targets, minify: bool) -> Result<String, TaskError> {
    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions { filename: filename.to_string(), ..ParserOptions::default() },
    )
    .map_err(|e| TaskError::Css(e.to_string()))?;

    sheet
        .minify(MinifyOptions { targets, ..MinifyOptions::default() })
        .map_err(|e| TaskError::Css(e.to_string()))?;

    let printed = sheet
        .to_css(PrinterOptions { minify, targets, ..PrinterOptions::default() })
        .map_err(|e| TaskError::Css(e.to_string()))?;

    Ok(printed.code)
}

/// Build the stylesheet bundle text for a configuration.
pub fn build_bundle(root: &Path, config: &StylesConfig) -> Result<String, TaskError> {
    let entries = expand_sources(root, &config.sources)?;
    let load_paths: Vec<PathBuf> = config.load_paths.iter().map(|p| root.join(p)).collect();

    let mut compiled = String::new();
    for entry in &entries {
        tracing::debug!(entry = %entry.display(), "compiling sass");
        let css = compile_sass(entry, &load_paths, config.compressed)?;
        compiled.push_str(&css);
        if !compiled.ends_with('\n') {
            compiled.push('\n');
        }
    }

    let targets = browser_targets(&config.browsers)?;
    finalize_css(&compiled, &config.bundle, targets, config.compressed)
}

/// Run the `styles` task.
pub fn run(ctx: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let config = &ctx.config().styles;
    let root = ctx.root_dir();

    let css = build_bundle(&root, config)?;
    let dest = ctx.in_root(&config.dest).join(&config.bundle);

    let mut outcome = TaskOutcome::new();
    outcome.push(write_output(&dest, css.as_bytes())?);
    Ok(outcome)
}
