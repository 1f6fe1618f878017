//! Script pipeline: concatenate sources, minify with `minify-js`.

use super::{read_text, write_output, TaskError, TaskOutcome};
use crate::build::{expand_sources, BuildContext};
use minify_js::{minify, Session, TopLevelMode};
use std::path::Path;

/// Minify one script. `origin` only labels errors.
pub fn minify_script(source: &str, origin: &Path) -> Result<Vec<u8>, TaskError> {
    let session = Session::new();
    let mut out = Vec::with_capacity(source.len());
    minify(&session, TopLevelMode::Global, source.as_bytes(), &mut out).map_err(|e| {
        TaskError::Script { path: origin.to_path_buf(), message: e.to_string() }
    })?;
    Ok(out)
}

/// Run the `scripts` task.
pub fn run(ctx: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let config = &ctx.config().scripts;
    let root = ctx.root_dir();
    let sources = expand_sources(&root, &config.sources)?;
    let dest = ctx.in_root(&config.dest).join(&config.bundle);

    let mut bundle = String::new();
    for source in &sources {
        let text = read_text(source)?;
        bundle.push_str(&text);
        if !bundle.ends_with('\n') {
            bundle.push('\n');
        }
    }

    // Errors point at the single source when there is one.
    let origin = match sources.as_slice() {
        [only] => only.clone(),
        _ => dest.clone(),
    };
    let minified = minify_script(&bundle, &origin)?;

    let mut outcome = TaskOutcome::new();
    outcome.push(write_output(&dest, &minified)?);
    Ok(outcome)
}
