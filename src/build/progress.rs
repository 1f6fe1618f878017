//! Task progress reporting.
//!
//! The runner emits [`ProgressEvent`]s; a [`ProgressReporter`] decides how
//! to show them. [`ConsoleProgress`] prints gulp-style start/finish lines,
//! [`NullProgress`] discards everything (tests, watch-mode reruns).

use super::result::TaskStatus;
use super::task::TaskName;
use std::io::Write;
use std::sync::Mutex;

/// Events emitted while a plan runs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A plan started
    RunStarted {
        /// Human-readable plan description
        plan: String,
        /// Number of tasks in the plan
        total_tasks: usize,
    },
    /// A task started
    TaskStarted {
        /// Task name
        task: TaskName,
    },
    /// A task finished
    TaskCompleted {
        /// Task name
        task: TaskName,
        /// Final status
        status: TaskStatus,
        /// Duration in milliseconds
        duration_ms: u64,
        /// Number of files written
        outputs: usize,
    },
    /// A plan finished
    RunCompleted {
        /// Whether every task succeeded
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        /// Number of failed tasks
        failed: usize,
    },
    /// A non-fatal problem
    Warning {
        /// Task that produced the warning (if applicable)
        task: Option<TaskName>,
        /// Warning message
        message: String,
    },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);

    /// Check if this reporter wants verbose output.
    fn is_verbose(&self) -> bool {
        false
    }
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a new null progress reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    use_colors: bool,
    verbose: bool,
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl ConsoleProgress {
    /// Create a console progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { use_colors: true, verbose: false, output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a console progress reporter that writes to a custom output.
    ///
    /// Colors are off for custom outputs.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { use_colors: false, verbose: false, output: Mutex::new(Box::new(output)) }
    }

    /// Set whether to use colors.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, code: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn magenta(&self, text: &str) -> String {
        self.color(text, "\x1b[35m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { plan, total_tasks } => {
                if self.verbose {
                    self.writeln(&format!(
                        "{} Running {} ({} task{})",
                        self.cyan("[sitepipe]"),
                        plan,
                        total_tasks,
                        if total_tasks == 1 { "" } else { "s" }
                    ));
                }
            }
            ProgressEvent::TaskStarted { task } => {
                self.writeln(&format!(
                    "{} Starting '{}'...",
                    self.cyan("[sitepipe]"),
                    self.cyan(task.as_str())
                ));
            }
            ProgressEvent::TaskCompleted { task, status, duration_ms, outputs } => match status {
                TaskStatus::Success => {
                    let files = if self.verbose {
                        format!(", {} file{}", outputs, if outputs == 1 { "" } else { "s" })
                    } else {
                        String::new()
                    };
                    self.writeln(&format!(
                        "{} Finished '{}' after {}{}",
                        self.cyan("[sitepipe]"),
                        self.cyan(task.as_str()),
                        self.magenta(&format_duration(duration_ms)),
                        files
                    ));
                }
                TaskStatus::Skipped => {
                    self.writeln(&format!(
                        "{} Skipped '{}'",
                        self.cyan("[sitepipe]"),
                        self.yellow(task.as_str())
                    ));
                }
                TaskStatus::Failed(err) => {
                    self.writeln(&format!(
                        "{} '{}' errored after {}",
                        self.cyan("[sitepipe]"),
                        self.red(task.as_str()),
                        self.magenta(&format_duration(duration_ms))
                    ));
                    self.writeln(&format!("        {}", self.red(&err)));
                }
            },
            ProgressEvent::RunCompleted { success, duration_ms, failed } => {
                if !success {
                    self.writeln(&format!(
                        "{} {} task{} failed after {}",
                        self.red("[error]"),
                        failed,
                        if failed == 1 { "" } else { "s" },
                        format_duration(duration_ms)
                    ));
                }
            }
            ProgressEvent::Warning { task, message } => {
                let prefix = match task {
                    Some(t) => format!("{}: ", t),
                    None => String::new(),
                };
                self.writeln(&format!("{} {}{}", self.yellow("[warn]"), prefix, message));
            }
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Format a millisecond duration for humans.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{} ms", ms)
    } else if ms < 60_000 {
        format!("{:.2} s", ms as f64 / 1000.0)
    } else {
        format!("{} min {} s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture() -> (ConsoleProgress, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (ConsoleProgress::with_output(SharedBuf(Arc::clone(&buf))), buf)
    }

    fn text(buf: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&buf.lock().unwrap()).into_owned()
    }

    #[test]
    fn test_null_progress() {
        let reporter = NullProgress::new();
        reporter.report(ProgressEvent::TaskStarted { task: TaskName::Styles });
        assert!(!reporter.is_verbose());
    }

    #[test]
    fn test_console_task_lifecycle() {
        let (reporter, buf) = capture();
        reporter.report(ProgressEvent::TaskStarted { task: TaskName::Styles });
        reporter.report(ProgressEvent::TaskCompleted {
            task: TaskName::Styles,
            status: TaskStatus::Success,
            duration_ms: 150,
            outputs: 1,
        });

        let out = text(&buf);
        assert!(out.contains("Starting 'styles'..."));
        assert!(out.contains("Finished 'styles' after 150 ms"));
        assert!(!out.contains("\x1b["));
    }

    #[test]
    fn test_console_failure_prints_message() {
        let (reporter, buf) = capture();
        reporter.report(ProgressEvent::TaskCompleted {
            task: TaskName::Scripts,
            status: TaskStatus::Failed("js/main.js: unexpected token".to_string()),
            duration_ms: 12,
            outputs: 0,
        });
        reporter.report(ProgressEvent::RunCompleted { success: false, duration_ms: 12, failed: 1 });

        let out = text(&buf);
        assert!(out.contains("'scripts' errored after 12 ms"));
        assert!(out.contains("unexpected token"));
        assert!(out.contains("1 task failed"));
    }

    #[test]
    fn test_console_verbose_run_started() {
        let (reporter, buf) = capture();
        let reporter = reporter.with_verbose(true);
        reporter.report(ProgressEvent::RunStarted {
            plan: "series(clean, build)".to_string(),
            total_tasks: 2,
        });
        assert!(text(&buf).contains("Running series(clean, build) (2 tasks)"));
    }

    #[test]
    fn test_console_warning() {
        let (reporter, buf) = capture();
        reporter.report(ProgressEvent::Warning {
            task: Some(TaskName::Fonts),
            message: "skipping readme.txt".to_string(),
        });
        assert!(text(&buf).contains("[warn] fonts: skipping readme.txt"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42 ms");
        assert_eq!(format_duration(1500), "1.50 s");
        assert_eq!(format_duration(125_000), "2 min 5 s");
    }
}
