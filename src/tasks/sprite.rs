//! SVG sprite pipeline (stack mode).
//!
//! All icons are nested inside one root `<svg>`, each as its own
//! `<svg id="...">`. A small stylesheet hides every icon except the one
//! targeted by the URL fragment, so `sprite.svg#name` renders a single icon.

use super::{file_stem, read_text, write_output, TaskError, TaskOutcome};
use crate::build::{discover_files, BuildContext};
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const STACK_STYLE: &str = ":root>svg{display:none}:root>svg:target{display:block}";

/// Root `<svg ...>` open tag; group 2 is `/` when self-closing.
static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<svg\b([^>]*?)(/?)>").expect("valid regex"));

/// `name="value"` or `name='value'`.
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// One icon parsed from an SVG file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteIcon {
    /// Fragment identifier
    pub id: String,
    /// `viewBox`, kept or derived from width/height
    pub view_box: Option<String>,
    /// `preserveAspectRatio`, when present
    pub aspect: Option<String>,
    /// Markup between the root open and close tags
    pub inner: String,
}

/// Turn a file stem into a usable fragment identifier.
pub fn icon_id(stem: &str) -> String {
    let id: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    if id.is_empty() {
        "icon".to_string()
    } else {
        id
    }
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    ATTR_RE.captures_iter(attrs).find_map(|c| {
        if c.get(1)?.as_str() == name {
            c.get(2).or_else(|| c.get(3)).map(|m| m.as_str())
        } else {
            None
        }
    })
}

fn length(value: &str) -> Option<f64> {
    let trimmed = value.trim().trim_end_matches("px");
    trimmed.parse::<f64>().ok().filter(|v| *v > 0.0)
}

/// Parse the root element of an SVG document.
pub fn parse_icon(id: String, svg: &str) -> Result<SpriteIcon, String> {
    let open = OPEN_TAG_RE.captures(svg).ok_or("no <svg> root element")?;
    let whole = open.get(0).ok_or("no <svg> root element")?;
    let attrs = open.get(1).map(|m| m.as_str()).unwrap_or("");
    let self_closing = open.get(2).is_some_and(|m| !m.as_str().is_empty());

    let inner = if self_closing {
        String::new()
    } else {
        let rest = &svg[whole.end()..];
        let close = rest.rfind("</svg>").ok_or("unterminated <svg> root element")?;
        rest[..close].trim().to_string()
    };

    let view_box = attribute(attrs, "viewBox").map(str::to_string).or_else(|| {
        let w = attribute(attrs, "width").and_then(length)?;
        let h = attribute(attrs, "height").and_then(length)?;
        Some(format!("0 0 {} {}", w, h))
    });
    let aspect = attribute(attrs, "preserveAspectRatio").map(str::to_string);

    Ok(SpriteIcon { id, view_box, aspect, inner })
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;")
}

/// Render icons into one stacked sprite document.
pub fn render_stack(icons: &[SpriteIcon]) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    let _ = write!(out, r#"<svg xmlns="{}" xmlns:xlink="{}">"#, SVG_NS, XLINK_NS);
    let _ = write!(out, "<style>{}</style>", STACK_STYLE);
    for icon in icons {
        out.push_str("<svg");
        if let Some(vb) = &icon.view_box {
            let _ = write!(out, r#" viewBox="{}""#, escape_attr(vb));
        }
        if let Some(aspect) = &icon.aspect {
            let _ = write!(out, r#" preserveAspectRatio="{}""#, escape_attr(aspect));
        }
        let _ = write!(out, r#" id="{}" xmlns="{}">"#, escape_attr(&icon.id), SVG_NS);
        out.push_str(&icon.inner);
        out.push_str("</svg>");
    }
    out.push_str("</svg>");
    out
}

/// Render the preview page; `sprite_href` is relative to the page.
pub fn render_example(icons: &[SpriteIcon], sprite_href: &str, sprite_name: &str) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>SVG stack sprite</title>\n<style>\n");
    out.push_str("body{font-family:sans-serif;margin:2em}\n");
    out.push_str("ul{list-style:none;display:flex;flex-wrap:wrap;gap:1.5em;padding:0}\n");
    out.push_str("li{text-align:center}\nimg{width:64px;height:64px;display:block;margin:0 auto .5em}\n");
    out.push_str("</style>\n</head>\n<body>\n");
    let _ = writeln!(out, "<h1>{} ({} icons)</h1>", escape_attr(sprite_name), icons.len());
    out.push_str("<ul>\n");
    for icon in icons {
        let id = escape_attr(&icon.id);
        let _ = writeln!(
            out,
            "<li><img src=\"{}#{}\" alt=\"{}\"><code>{}#{}</code></li>",
            sprite_href, id, id, sprite_name, id
        );
    }
    out.push_str("</ul>\n</body>\n</html>\n");
    out
}

/// Load icons from SVG files, assigning unique ids in path order.
pub fn load_icons(paths: &[PathBuf]) -> Result<Vec<SpriteIcon>, TaskError> {
    let mut used = HashSet::new();
    let mut icons = Vec::with_capacity(paths.len());
    for path in paths {
        let base = icon_id(&file_stem(path));
        let mut id = base.clone();
        let mut n = 2;
        while !used.insert(id.clone()) {
            id = format!("{}-{}", base, n);
            n += 1;
        }
        let text = read_text(path)?;
        let icon = parse_icon(id, &text)
            .map_err(|message| TaskError::Svg { path: path.to_path_buf(), message })?;
        icons.push(icon);
    }
    Ok(icons)
}

fn is_sprite_output(path: &Path, sprite: &Path) -> bool {
    if path == sprite {
        return true;
    }
    match (std::fs::canonicalize(path), std::fs::canonicalize(sprite)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Run the `sprite` task.
pub fn run(ctx: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let config = &ctx.config().sprite;
    let dest = ctx.in_root(&config.dest);
    let sprite_path = dest.join(&config.file);

    let sources: Vec<PathBuf> = discover_files(&ctx.root_dir(), &config.sources)?
        .into_iter()
        .filter(|p| !is_sprite_output(p, &sprite_path))
        .collect();

    let stem = file_stem(Path::new(&config.file));
    let page = dest.join(&config.example_dir).join(format!("{}.stack.html", stem));

    let mut outcome = TaskOutcome::new();
    if sources.is_empty() {
        // Outputs from earlier icons must not outlive them.
        remove_stale(&sprite_path)?;
        remove_stale(&page)?;
        tracing::info!("no SVG icons found, sprite not written");
        return Ok(outcome);
    }

    let icons = load_icons(&sources)?;
    outcome.push(write_output(&sprite_path, render_stack(&icons).as_bytes())?);

    if config.example {
        let href = format!("../{}", config.file);
        outcome.push(write_output(&page, render_example(&icons, &href, &config.file).as_bytes())?);
    }

    Ok(outcome)
}

fn remove_stale(path: &Path) -> Result<(), TaskError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale sprite output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TaskError::io(path, e)),
    }
}
