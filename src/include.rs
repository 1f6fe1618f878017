//! Include directive resolution for page templates
//!
//! Recognized directive lines (the directive must be alone on its line):
//!
//! ```text
//! <!--=include partials/header.html -->
//! <!-- =include "partials/header.html" -->
//! //=include parts/nav.html
//! /*=include parts/nav.html */
//! <!--=require partials/analytics.html -->
//! ```
//!
//! `include` inserts the file every time; `require` inserts it at most once
//! per page. Targets are looked up next to the including file first, then
//! in each include path. Glob targets insert every match in sorted order.
//! Inserted lines take the directive's indentation.

use crate::build::{discover_files, is_glob};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Error type for include resolution failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IncludeError {
    /// Circular include detected
    #[error("Circular include detected: {}", .0.display())]
    CircularInclude(PathBuf),
    /// IO error reading file
    #[error("Error reading include file '{}': {1}", .0.display())]
    IoError(PathBuf, String),
}

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:<!--|//|/\*)\s*=\s*(include|require)\s+(.+?)\s*(?:-->|\*/)?\s*$")
        .expect("valid regex")
});

/// Directive flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Insert every time
    Include,
    /// Insert once per page
    Require,
}

/// A parsed directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'a> {
    /// Leading whitespace of the directive line
    pub indent: &'a str,
    /// Include or require
    pub kind: DirectiveKind,
    /// Target path or glob, quotes removed
    pub target: &'a str,
}

/// Parse a single line (without its line ending) as a directive.
pub fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let caps = DIRECTIVE_RE.captures(line)?;
    let indent = caps.get(1)?.as_str();
    let kind = match caps.get(2)?.as_str() {
        "require" => DirectiveKind::Require,
        _ => DirectiveKind::Include,
    };
    let target = caps.get(3)?.as_str().trim_matches(|c| c == '"' || c == '\'');
    if target.is_empty() {
        return None;
    }
    Some(Directive { indent, kind, target })
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Per-page expansion state.
struct PageState {
    stack: Vec<PathBuf>,
    inserted: HashSet<PathBuf>,
}

/// Resolves include directives against a set of include paths.
#[derive(Debug, Clone, Default)]
pub struct IncludeResolver {
    include_paths: Vec<PathBuf>,
    warnings: Vec<String>,
}

impl IncludeResolver {
    /// Create a resolver searching `include_paths` after the including file's directory.
    pub fn new(include_paths: Vec<PathBuf>) -> Self {
        Self { include_paths, warnings: Vec::new() }
    }

    /// Warnings collected so far (missing targets).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Drain collected warnings.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Find the files a target refers to.
    pub fn locate(&self, target: &str, including_dir: &Path) -> Vec<PathBuf> {
        let candidates = std::iter::once(including_dir).chain(self.include_paths.iter().map(PathBuf::as_path));
        for dir in candidates {
            if is_glob(target) {
                match discover_files(dir, target) {
                    Ok(found) if !found.is_empty() => return found,
                    _ => continue,
                }
            } else {
                let path = dir.join(target);
                if path.is_file() {
                    return vec![path];
                }
            }
        }
        Vec::new()
    }

    /// Read `path` and expand every directive in it.
    pub fn resolve_file(&mut self, path: &Path) -> Result<String, IncludeError> {
        let text = fs::read_to_string(path)
            .map_err(|e| IncludeError::IoError(path.to_path_buf(), e.to_string()))?;
        let mut state = PageState { stack: vec![canonical(path)], inserted: HashSet::new() };
        self.expand(path, &text, &mut state)
    }

    fn expand(&mut self, path: &Path, text: &str, state: &mut PageState) -> Result<String, IncludeError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut out = String::with_capacity(text.len());

        for raw in text.split_inclusive('\n') {
            let (line, ending) = split_line_ending(raw);
            let Some(directive) = parse_directive(line) else {
                out.push_str(raw);
                continue;
            };

            let targets = self.locate(directive.target, dir);
            if targets.is_empty() {
                let message =
                    format!("{}: include target '{}' not found", path.display(), directive.target);
                tracing::warn!("{}", message);
                self.warnings.push(message);
                continue;
            }

            for target in targets {
                let key = canonical(&target);
                if state.stack.contains(&key) {
                    return Err(IncludeError::CircularInclude(target));
                }
                if directive.kind == DirectiveKind::Require && state.inserted.contains(&key) {
                    continue;
                }
                state.inserted.insert(key.clone());

                let body = fs::read_to_string(&target)
                    .map_err(|e| IncludeError::IoError(target.clone(), e.to_string()))?;
                state.stack.push(key);
                let expanded = self.expand(&target, &body, state)?;
                state.stack.pop();

                for included in expanded.split_inclusive('\n') {
                    if !split_line_ending(included).0.is_empty() {
                        out.push_str(directive.indent);
                    }
                    out.push_str(included);
                }
                if !expanded.is_empty() && !expanded.ends_with('\n') {
                    out.push_str(ending);
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, body: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_parse_directive_forms() {
        for (line, target) in [
            ("<!--=include header.html -->", "header.html"),
            ("<!-- =include \"header.html\" -->", "header.html"),
            ("  //=include parts/nav.html", "parts/nav.html"),
            ("/*=include 'a.css' */", "a.css"),
        ] {
            let d = parse_directive(line).unwrap_or_else(|| panic!("no directive in {}", line));
            assert_eq!(d.target, target);
            assert_eq!(d.kind, DirectiveKind::Include);
        }
        let d = parse_directive("\t<!--=require x.html -->").unwrap();
        assert_eq!(d.kind, DirectiveKind::Require);
        assert_eq!(d.indent, "\t");
    }

    #[test]
    fn test_parse_directive_rejects_plain_lines() {
        assert!(parse_directive("<!-- a normal comment -->").is_none());
        assert!(parse_directive("<p>include me</p>").is_none());
        assert!(parse_directive("// include x").is_none());
    }

    #[test]
    fn test_include_with_indentation() {
        let temp = TempDir::new().unwrap();
        let html = temp.path().join("html");
        write(&html, "nav.html", "<nav>\n  <a>Home</a>\n</nav>\n");
        let page = write(temp.path(), "pages/index.html", "<body>\n    <!--=include nav.html -->\n</body>\n");

        let mut resolver = IncludeResolver::new(vec![html]);
        let out = resolver.resolve_file(&page).unwrap();
        assert_eq!(out, "<body>\n    <nav>\n      <a>Home</a>\n    </nav>\n</body>\n");
        assert!(resolver.warnings().is_empty());
    }

    #[test]
    fn test_local_directory_wins() {
        let temp = TempDir::new().unwrap();
        let html = temp.path().join("html");
        write(&html, "part.html", "shared");
        write(temp.path(), "pages/part.html", "local");
        let page = write(temp.path(), "pages/index.html", "<!--=include part.html -->\n");

        let out = IncludeResolver::new(vec![html]).resolve_file(&page).unwrap();
        assert_eq!(out, "local\n");
    }

    #[test]
    fn test_nested_includes_resolve_from_their_own_directory() {
        let temp = TempDir::new().unwrap();
        let html = temp.path().join("html");
        write(&html, "layout/head.html", "<head>\n<!--=include meta.html -->\n</head>\n");
        write(&html, "layout/meta.html", "<meta charset=\"utf-8\">\n");
        let page = write(temp.path(), "pages/index.html", "<!--=include layout/head.html -->\n");

        let out = IncludeResolver::new(vec![html]).resolve_file(&page).unwrap();
        assert_eq!(out, "<head>\n<meta charset=\"utf-8\">\n</head>\n");
    }

    #[test]
    fn test_require_inserts_once() {
        let temp = TempDir::new().unwrap();
        let html = temp.path().join("html");
        write(&html, "once.html", "ONCE\n");
        let page = write(
            temp.path(),
            "pages/index.html",
            "<!--=require once.html -->\n<!--=require once.html -->\n<!--=include once.html -->\n",
        );

        let out = IncludeResolver::new(vec![html]).resolve_file(&page).unwrap();
        assert_eq!(out, "ONCE\nONCE\n");
    }

    #[test]
    fn test_glob_target() {
        let temp = TempDir::new().unwrap();
        let html = temp.path().join("html");
        write(&html, "cards/b.html", "B\n");
        write(&html, "cards/a.html", "A\n");
        let page = write(temp.path(), "pages/index.html", "<!--=include cards/*.html -->\n");

        let out = IncludeResolver::new(vec![html]).resolve_file(&page).unwrap();
        assert_eq!(out, "A\nB\n");
    }

    #[test]
    fn test_missing_target_warns_and_drops_line() {
        let temp = TempDir::new().unwrap();
        let page = write(temp.path(), "pages/index.html", "a\n<!--=include nope.html -->\nb\n");

        let mut resolver = IncludeResolver::new(vec![]);
        let out = resolver.resolve_file(&page).unwrap();
        assert_eq!(out, "a\nb\n");
        assert_eq!(resolver.warnings().len(), 1);
        assert!(resolver.warnings()[0].contains("nope.html"));
    }

    #[test]
    fn test_circular_include() {
        let temp = TempDir::new().unwrap();
        let html = temp.path().join("html");
        write(&html, "a.html", "<!--=include b.html -->\n");
        write(&html, "b.html", "<!--=include a.html -->\n");
        let page = write(temp.path(), "pages/index.html", "<!--=include a.html -->\n");

        let err = IncludeResolver::new(vec![html]).resolve_file(&page).unwrap_err();
        assert!(matches!(err, IncludeError::CircularInclude(p) if p.ends_with("a.html")));
    }

    #[test]
    fn test_self_include_is_circular() {
        let temp = TempDir::new().unwrap();
        let page = write(temp.path(), "pages/index.html", "<!--=include index.html -->\n");
        let err = IncludeResolver::new(vec![]).resolve_file(&page).unwrap_err();
        assert!(matches!(err, IncludeError::CircularInclude(_)));
    }

    #[test]
    fn test_fragment_without_trailing_newline() {
        let temp = TempDir::new().unwrap();
        let html = temp.path().join("html");
        write(&html, "x.html", "X");
        let page = write(temp.path(), "pages/index.html", "<!--=include x.html -->\nY\n");

        let out = IncludeResolver::new(vec![html]).resolve_file(&page).unwrap();
        assert_eq!(out, "X\nY\n");
    }
}
