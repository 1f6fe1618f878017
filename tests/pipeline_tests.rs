//! Pipeline integration tests
//!
//! Each test builds a throwaway site tree with `tempfile` and drives tasks
//! through the public runner, checking files on disk.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use image::{Rgb, RgbImage};
use sitepipe::build::{BuildContext, Plan, TaskName, TaskRunner};
use sitepipe::config::default_config;
use sitepipe::font::{woff, woff2, Sfnt, Table, FLAVOR_TRUETYPE};

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a runner over a temporary project; the working tree is `source/`.
fn create_test_runner() -> (TempDir, TaskRunner) {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("source")).unwrap();
    let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
    (temp, TaskRunner::new(ctx))
}

fn root(temp: &TempDir) -> PathBuf {
    temp.path().join("source")
}

/// Create a test file with content under `dir`.
fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn create_test_image(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbImage::from_fn(24, 24, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 90]));
    img.save(path).unwrap();
}

/// Every file under `dir` as a sorted set of `/`-joined relative paths.
fn tree(dir: &Path) -> BTreeSet<String> {
    fn walk(base: &Path, dir: &Path, out: &mut BTreeSet<String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap();
                let key: Vec<_> = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect();
                out.insert(key.join("/"));
            }
        }
    }
    let mut out = BTreeSet::new();
    if dir.exists() {
        walk(dir, dir, &mut out);
    }
    out
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn sample_font() -> Sfnt {
    let mut head = vec![0u8; 54];
    head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
    Sfnt::new(
        FLAVOR_TRUETYPE,
        vec![
            Table { tag: *b"cmap", data: vec![0, 0, 0, 0] },
            Table { tag: *b"glyf", data: vec![1u8; 40] },
            Table { tag: *b"head", data: head },
            Table { tag: *b"hhea", data: vec![0u8; 36] },
            Table { tag: *b"loca", data: vec![0, 0, 0, 20] },
            Table { tag: *b"maxp", data: vec![0, 1, 0, 0, 0, 1] },
        ],
    )
    .unwrap()
}

// ============================================================================
// Images
// ============================================================================

#[test]
fn test_images_first_run_writes_three_per_source_then_nothing() {
    let (temp, runner) = create_test_runner();
    let src = root(&temp).join("img/src");
    create_test_image(&src.join("hero.png"));
    create_test_image(&src.join("photo.jpg"));

    let first = runner.run(&Plan::Task(TaskName::Images));
    assert!(first.is_success(), "{}", first.summary());
    assert_eq!(first.all_outputs().len(), 6);
    assert_eq!(
        tree(&root(&temp).join("img")),
        set(&[
            "hero.avif",
            "hero.png",
            "hero.webp",
            "photo.avif",
            "photo.jpg",
            "photo.webp",
            "src/hero.png",
            "src/photo.jpg",
        ])
    );

    let second = runner.run(&Plan::Task(TaskName::Images));
    assert!(second.is_success());
    assert!(second.all_outputs().is_empty());
}

#[test]
fn test_images_ignore_dotfiles_and_extensionless_files() {
    let (temp, runner) = create_test_runner();
    let src = root(&temp).join("img/src");
    create_test_image(&src.join("a.png"));
    create_test_file(&src, ".gitkeep", b"");
    create_test_file(&src, ".DS_Store", b"\0\0\0\x01Bud1");
    create_test_file(&src, "LICENSE", b"all rights reserved");

    let result = runner.run(&Plan::Task(TaskName::Images));
    assert!(result.is_success(), "{}", result.summary());
    assert_eq!(
        tree(&root(&temp).join("img")),
        set(&["a.avif", "a.png", "a.webp", "src/.DS_Store", "src/.gitkeep", "src/LICENSE", "src/a.png"])
    );
}

#[test]
fn test_images_skip_avif_sources_with_warning() {
    let (temp, runner) = create_test_runner();
    let src = root(&temp).join("img/src");
    create_test_image(&src.join("a.png"));
    create_test_file(&src, "b.avif", b"\0\0\0\x1cftypavif");

    let result = runner.run(&Plan::Task(TaskName::Images));
    assert!(result.is_success(), "{}", result.summary());
    assert_eq!(result.all_outputs().len(), 3);
    assert!(result.all_warnings().iter().any(|w| w.contains("b.avif")));
    assert!(!root(&temp).join("img/b.webp").exists());
}

// ============================================================================
// Styles
// ============================================================================

#[test]
fn test_styles_output_is_deterministic() {
    let (temp, runner) = create_test_runner();
    create_test_file(
        &root(&temp),
        "sass/style.sass",
        b"$accent: #336699\n\n.card\n  display: flex\n  color: $accent\n  user-select: none\n",
    );

    assert!(runner.run(&Plan::Task(TaskName::Styles)).is_success());
    let css = root(&temp).join("css/style.min.css");
    let first = fs::read(&css).unwrap();

    assert!(runner.run(&Plan::Task(TaskName::Styles)).is_success());
    assert_eq!(fs::read(&css).unwrap(), first);

    let text = String::from_utf8(first).unwrap();
    assert!(text.contains(".card{"));
}

#[test]
fn test_styles_missing_entry_fails() {
    let (_temp, runner) = create_test_runner();
    let result = runner.run(&Plan::Task(TaskName::Styles));
    assert_eq!(result.failed_count(), 1);
}

// ============================================================================
// Scripts
// ============================================================================

#[test]
fn test_scripts_bundle_is_minified() {
    let (temp, runner) = create_test_runner();
    create_test_file(
        &root(&temp),
        "js/main.js",
        b"function greet(name) {\n  // say hello\n  console.log('hi ' + name);\n}\ngreet('there');\n",
    );

    let result = runner.run(&Plan::Task(TaskName::Scripts));
    assert!(result.is_success(), "{}", result.summary());
    let min = fs::read_to_string(root(&temp).join("js/main.min.js")).unwrap();
    assert!(!min.contains("say hello"));
    assert!(min.contains("console.log"));
    assert!(!min.contains('\n'));
}

// ============================================================================
// Pages
// ============================================================================

#[test]
fn test_pages_contain_fragments_and_no_markers() {
    let (temp, runner) = create_test_runner();
    let site = root(&temp);
    create_test_file(&site, "html/head.html", b"<title>Demo</title>\n");
    create_test_file(&site, "html/footer.html", b"<footer>&copy; demo</footer>\n");
    create_test_file(
        &site,
        "pages/index.html",
        b"<html>\n<head>\n  <!--=include head.html -->\n</head>\n<body>\n  //=include footer.html\n</body>\n</html>\n",
    );

    let result = runner.run(&Plan::Task(TaskName::Pages));
    assert!(result.is_success(), "{}", result.summary());

    let html = fs::read_to_string(site.join("index.html")).unwrap();
    assert!(html.contains("  <title>Demo</title>\n"));
    assert!(html.contains("  <footer>&copy; demo</footer>\n"));
    assert!(!html.contains("=include"));
}

// ============================================================================
// Sprite
// ============================================================================

#[test]
fn test_sprite_with_zero_inputs_writes_nothing() {
    let (temp, runner) = create_test_runner();
    let result = runner.run(&Plan::Task(TaskName::Sprite));
    assert!(result.is_success());
    assert!(!root(&temp).join("img/sprite.svg").exists());
    assert!(tree(&root(&temp)).is_empty());
}

#[test]
fn test_sprite_collects_icons() {
    let (temp, runner) = create_test_runner();
    let site = root(&temp);
    create_test_file(&site, "img/arrow.svg", br#"<svg viewBox="0 0 10 10"><path d="M0 0L10 5Z"/></svg>"#);
    create_test_file(&site, "img/close.svg", br#"<svg width="16" height="16"><path d="M1 1L15 15"/></svg>"#);

    let result = runner.run(&Plan::Task(TaskName::Sprite));
    assert!(result.is_success(), "{}", result.summary());

    let sprite = fs::read_to_string(site.join("img/sprite.svg")).unwrap();
    assert!(sprite.contains("id=\"arrow\""));
    assert!(sprite.contains("id=\"close\""));
    assert!(site.join("img/stack/sprite.stack.html").exists());
}

#[test]
fn test_sprite_removes_outputs_once_icons_are_gone() {
    let (temp, runner) = create_test_runner();
    let site = root(&temp);
    let icon = create_test_file(&site, "img/arrow.svg", br#"<svg viewBox="0 0 10 10"><path d="M0 0L10 5Z"/></svg>"#);

    assert!(runner.run(&Plan::Task(TaskName::Sprite)).is_success());
    assert!(site.join("img/sprite.svg").exists());
    assert!(site.join("img/stack/sprite.stack.html").exists());

    fs::remove_file(icon).unwrap();
    let result = runner.run(&Plan::Task(TaskName::Sprite));
    assert!(result.is_success(), "{}", result.summary());
    assert!(!site.join("img/sprite.svg").exists());
    assert!(!site.join("img/stack/sprite.stack.html").exists());
}

// ============================================================================
// Fonts
// ============================================================================

#[test]
fn test_fonts_produce_woff_ttf_and_woff2() {
    let (temp, runner) = create_test_runner();
    let site = root(&temp);
    let font = sample_font();
    create_test_file(&site, "fonts/src/Demo.ttf", &font.to_bytes());

    let result = runner.run(&Plan::Task(TaskName::Fonts));
    assert!(result.is_success(), "{}", result.summary());

    let fonts = site.join("fonts");
    assert_eq!(fs::read(fonts.join("Demo.ttf")).unwrap(), font.to_bytes());
    let woff_bytes = fs::read(fonts.join("Demo.woff")).unwrap();
    assert_eq!(u32::from_be_bytes(woff_bytes[0..4].try_into().unwrap()), woff::SIGNATURE);
    assert_eq!(woff::decode(&woff_bytes).unwrap(), font);
    let woff2_bytes = fs::read(fonts.join("Demo.woff2")).unwrap();
    assert_eq!(u32::from_be_bytes(woff2_bytes[0..4].try_into().unwrap()), woff2::SIGNATURE);
    assert_eq!(woff2_bytes.len() % 4, 0);
}

// ============================================================================
// Packaging
// ============================================================================

#[test]
fn test_build_project_leaves_exact_manifest_selection() {
    let (temp, runner) = create_test_runner();
    let site = root(&temp);
    for rel in [
        "css/style.min.css",
        "css/legacy.css",
        "img/photo.jpg",
        "img/photo.webp",
        "img/icon.svg",
        "img/sprite.svg",
        "img/stack/sprite.stack.html",
        "img/src/photo.jpg",
        "fonts/Demo.woff2",
        "fonts/src/Demo.ttf",
        "js/main.js",
        "js/main.min.js",
        "sass/style.sass",
        "html/footer.html",
        "pages/index.html",
        "index.html",
        "about.html",
    ] {
        create_test_file(&site, rel, rel.as_bytes());
    }
    create_test_file(temp.path(), "build/old/stale.css", b"stale");

    let result = runner.run(&Plan::build_project());
    assert!(result.is_success(), "{}", result.summary());

    assert_eq!(
        tree(&temp.path().join("build")),
        set(&[
            "about.html",
            "css/style.min.css",
            "fonts/Demo.woff2",
            "img/photo.jpg",
            "img/photo.webp",
            "img/sprite.svg",
            "index.html",
            "js/main.min.js",
        ])
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("build/img/sprite.svg")).unwrap(),
        "img/sprite.svg"
    );
}

#[test]
fn test_build_project_named_plan_matches_alias() {
    assert_eq!(Plan::named("buildProject").unwrap(), Plan::build_project());
    assert_eq!(Plan::named("build-project").unwrap(), Plan::build_project());
}

// ============================================================================
// Composite plans
// ============================================================================

#[test]
fn test_parallel_pass_reports_each_task() {
    let (temp, runner) = create_test_runner();
    let site = root(&temp);
    create_test_file(&site, "sass/style.sass", b".a\n  color: red\n");
    create_test_file(&site, "js/main.js", b"console.log(1);\n");
    create_test_file(&site, "pages/index.html", b"<p>home</p>\n");
    create_test_image(&site.join("img/src/a.png"));

    let plan = Plan::Parallel(vec![
        Plan::Task(TaskName::Styles),
        Plan::Task(TaskName::Images),
        Plan::Task(TaskName::Scripts),
        Plan::Task(TaskName::Pages),
    ]);
    let result = runner.run(&plan);

    assert!(result.is_success(), "{}", result.summary());
    let order: Vec<_> = result.tasks.iter().map(|t| t.task).collect();
    assert_eq!(order, vec![TaskName::Styles, TaskName::Images, TaskName::Scripts, TaskName::Pages]);
    assert!(site.join("css/style.min.css").exists());
    assert!(site.join("img/a.avif").exists());
    assert!(site.join("js/main.min.js").exists());
    assert!(site.join("index.html").exists());
}
