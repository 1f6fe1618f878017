//! Web font pipeline.
//!
//! Stage 1 turns every `ttf`/`otf`/`woff` source into `<stem>.woff` and,
//! for TrueType outlines, `<stem>.ttf`. Stage 2 then reads every `*.ttf` in
//! the destination and writes `<stem>.woff2`. Stage 2 starts only after all
//! stage 1 writes are done.

use super::{extension, file_stem, read_bytes, write_output, TaskError, TaskOutcome};
use crate::build::{discover_files, list_files, BuildContext};
use crate::font::{woff, woff2, Outlines, Sfnt};
use std::path::{Path, PathBuf};

/// Source extensions stage 1 accepts.
pub const FONT_SOURCE_EXTENSIONS: [&str; 3] = ["ttf", "otf", "woff"];

fn parse(path: &Path, bytes: &[u8]) -> Result<Sfnt, TaskError> {
    Sfnt::parse(bytes).map_err(|source| TaskError::Font { path: path.to_path_buf(), source })
}

/// Convert one source into `.woff` (and `.ttf` when possible).
pub fn convert_source(source: &Path, dest: &Path) -> Result<TaskOutcome, TaskError> {
    let mut outcome = TaskOutcome::new();
    let bytes = read_bytes(source)?;
    let font = parse(source, &bytes)?;
    let stem = file_stem(source);

    let woff = woff::encode(&font).map_err(|e| TaskError::Font { path: source.to_path_buf(), source: e })?;
    outcome.push(write_output(&dest.join(format!("{}.woff", stem)), &woff)?);

    match font.outlines() {
        Outlines::TrueType => {
            let ttf_path = dest.join(format!("{}.ttf", stem));
            let ttf = if extension(source) == "ttf" { bytes } else { font.to_bytes() };
            outcome.push(write_output(&ttf_path, &ttf)?);
        }
        Outlines::Cff => {
            outcome.warn(format!(
                "{}: CFF outlines cannot be written as TrueType; no .ttf or .woff2 produced",
                source.display()
            ));
        }
    }

    Ok(outcome)
}

/// Stage 1 over every file in `src_dir`.
pub fn convert_sources(src_dir: &Path, dest: &Path) -> Result<TaskOutcome, TaskError> {
    let mut outcome = TaskOutcome::new();
    for source in list_files(src_dir)? {
        if !FONT_SOURCE_EXTENSIONS.contains(&extension(&source).as_str()) {
            outcome.warn(format!("{}: not a font source, skipped", source.display()));
            continue;
        }
        outcome.merge(convert_source(&source, dest)?);
    }
    Ok(outcome)
}

/// Stage 2: `<dest>/*.ttf` to `<dest>/<stem>.woff2`.
pub fn compress_truetype(dest: &Path) -> Result<Vec<PathBuf>, TaskError> {
    let mut written = Vec::new();
    for ttf in discover_files(dest, "*.ttf")? {
        let bytes = read_bytes(&ttf)?;
        let font = parse(&ttf, &bytes)?;
        let encoded =
            woff2::encode(&font).map_err(|e| TaskError::Font { path: ttf.clone(), source: e })?;
        written.push(write_output(&dest.join(format!("{}.woff2", file_stem(&ttf))), &encoded)?);
    }
    Ok(written)
}

/// Run the `fonts` task.
pub fn run(ctx: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let config = &ctx.config().fonts;
    let src_dir = ctx.in_root(&config.src);
    let dest = ctx.in_root(&config.dest);

    let mut outcome = convert_sources(&src_dir, &dest)?;
    outcome.outputs.extend(compress_truetype(&dest)?);
    Ok(outcome)
}
