//! Asset pipelines.
//!
//! Each submodule exposes `run(&BuildContext) -> Result<TaskOutcome, TaskError>`.
//! [`run_task`] dispatches by [`TaskName`]; the long-running `watching`
//! task lives in [`crate::watch`] and is driven by the runner instead.

pub mod fonts;
pub mod images;
pub mod package;
pub mod pages;
pub mod scripts;
pub mod sprite;
pub mod styles;

use crate::build::{BuildContext, DiscoveryError, TaskName};
use crate::font::FontError;
use crate::include::IncludeError;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error that aborts a task.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// Glob expansion or a missing entry file
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// Filesystem failure
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Sass compilation failure
    #[error("{}: {message}", .path.display())]
    Sass { path: PathBuf, message: String },
    /// CSS prefixing or minification failure
    #[error("css: {0}")]
    Css(String),
    /// JavaScript syntax error
    #[error("{}: {message}", .path.display())]
    Script { path: PathBuf, message: String },
    /// Image decode or encode failure
    #[error("{}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Malformed SVG icon
    #[error("{}: {message}", .path.display())]
    Svg { path: PathBuf, message: String },
    /// Malformed or unsupported font
    #[error("{}: {source}", .path.display())]
    Font {
        path: PathBuf,
        #[source]
        source: FontError,
    },
    /// Include resolution failure
    #[error(transparent)]
    Include(#[from] IncludeError),
    /// Cleaning would delete the working tree
    #[error("refusing to clean {}: it contains the working tree {}", .out.display(), .root.display())]
    UnsafeClean { out: PathBuf, root: PathBuf },
    /// Task cannot be run directly
    #[error("task '{0}' cannot be run here")]
    Unsupported(TaskName),
}

impl TaskError {
    /// Wrap an IO error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io { path: path.into(), source }
    }
}

/// What a successful task produced.
#[derive(Debug, Clone, Default)]
pub struct TaskOutcome {
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Non-fatal problems
    pub warnings: Vec<String>,
}

impl TaskOutcome {
    /// Create an empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a written file.
    pub fn push(&mut self, path: PathBuf) {
        self.outputs.push(path);
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Merge another outcome into this one.
    pub fn merge(&mut self, other: TaskOutcome) {
        self.outputs.extend(other.outputs);
        self.warnings.extend(other.warnings);
    }
}

/// Write `bytes` to `path`, creating parent directories.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<PathBuf, TaskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| TaskError::io(path, e))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(path.to_path_buf())
}

/// Read a file, attributing errors to its path.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, TaskError> {
    fs::read(path).map_err(|e| TaskError::io(path, e))
}

/// Read a UTF-8 file, attributing errors to its path.
pub fn read_text(path: &Path) -> Result<String, TaskError> {
    fs::read_to_string(path).map_err(|e| TaskError::io(path, e))
}

/// File stem as an owned string.
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Lowercased extension, empty when absent.
pub(crate) fn extension(path: &Path) -> String {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()).unwrap_or_default()
}

/// Run one finite task.
pub fn run_task(ctx: &BuildContext, task: TaskName) -> Result<TaskOutcome, TaskError> {
    match task {
        TaskName::Styles => styles::run(ctx),
        TaskName::Scripts => scripts::run(ctx),
        TaskName::Images => images::run(ctx),
        TaskName::Sprite => sprite::run(ctx),
        TaskName::Fonts => fonts::run(ctx),
        TaskName::Pages => pages::run(ctx),
        TaskName::Clean => package::clean(ctx),
        TaskName::Build => package::copy(ctx),
        TaskName::Watching => Err(TaskError::Unsupported(task)),
    }
}
