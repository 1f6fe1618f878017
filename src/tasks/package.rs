//! Clean and package steps.
//!
//! `clean` removes the output directory. `copy` evaluates the ordered
//! package manifest against the working tree and copies every selected
//! file into the output directory under the same relative path.

use super::{TaskError, TaskOutcome};
use crate::build::{select_manifest, BuildContext};
use std::fs;
use std::path::{Path, PathBuf};

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    })
}

/// Remove the output directory. A missing directory is fine.
pub fn clean(ctx: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let out = ctx.out_dir();
    let root = ctx.root_dir();

    if absolute(&root).starts_with(absolute(&out)) {
        return Err(TaskError::UnsafeClean { out, root });
    }

    match fs::remove_dir_all(&out) {
        Ok(()) => tracing::debug!(dir = %out.display(), "removed output directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(TaskError::io(&out, e)),
    }
    Ok(TaskOutcome::new())
}

/// Copy the manifest selection into the output directory.
pub fn copy(ctx: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let root = ctx.root_dir();
    let out = ctx.out_dir();
    let out_abs = absolute(&out);

    let mut outcome = TaskOutcome::new();
    for relative in select_manifest(&root, &ctx.config().package.patterns)? {
        let from = root.join(&relative);
        if absolute(&from).starts_with(&out_abs) {
            continue;
        }
        let to = out.join(&relative);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
        }
        fs::copy(&from, &to).map_err(|e| TaskError::io(&from, e))?;
        outcome.push(to);
    }

    if outcome.outputs.is_empty() {
        outcome.warn(format!("package manifest selected no files under {}", root.display()));
    }
    Ok(outcome)
}
