//! Task result types.
//!
//! Contains types for representing the outcome of a plan run.

use super::task::TaskName;
use std::path::PathBuf;
use std::time::Duration;

/// Status of a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task completed
    Success,
    /// Task did not run because an earlier step in its series failed
    Skipped,
    /// Task failed with error
    Failed(String),
}

impl TaskStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed(_))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running a single task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task that ran
    pub task: TaskName,
    /// Final status
    pub status: TaskStatus,
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Run duration
    pub duration: Duration,
    /// Warning messages (if any)
    pub warnings: Vec<String>,
}

impl TaskResult {
    /// Create a successful result.
    pub fn success(task: TaskName, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { task, status: TaskStatus::Success, outputs, duration, warnings: vec![] }
    }

    /// Create a skipped result.
    pub fn skipped(task: TaskName) -> Self {
        Self {
            task,
            status: TaskStatus::Skipped,
            outputs: vec![],
            duration: Duration::ZERO,
            warnings: vec![],
        }
    }

    /// Create a failed result.
    pub fn failed(task: TaskName, error: String, duration: Duration) -> Self {
        Self { task, status: TaskStatus::Failed(error), outputs: vec![], duration, warnings: vec![] }
    }

    /// Add warnings to the result.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of running a complete plan.
#[derive(Debug, Default)]
pub struct RunResult {
    /// Results for each task, in plan order
    pub tasks: Vec<TaskResult>,
    /// Total wall-clock duration
    pub total_duration: Duration,
}

impl RunResult {
    /// Create a new empty run result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task result.
    pub fn add_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    /// Append every task result of another run.
    pub fn extend(&mut self, other: RunResult) {
        self.tasks.extend(other.tasks);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Number of successful tasks.
    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_success()).count()
    }

    /// Number of skipped tasks.
    pub fn skipped_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, TaskStatus::Skipped)).count()
    }

    /// Number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Whether the run had no failures.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Result of a specific task, if it ran.
    pub fn get(&self, task: TaskName) -> Option<&TaskResult> {
        self.tasks.iter().find(|r| r.task == task)
    }

    /// All files written.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.tasks.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// All warnings.
    pub fn all_warnings(&self) -> Vec<&String> {
        self.tasks.iter().flat_map(|r| r.warnings.iter()).collect()
    }

    /// Failed task results.
    pub fn failures(&self) -> Vec<&TaskResult> {
        self.tasks.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let skipped = self.skipped_count();
        let failed = self.failed_count();
        let total = self.tasks.len();

        if failed > 0 {
            lines.push(format!(
                "Run failed: {} succeeded, {} skipped, {} failed ({} total)",
                success, skipped, failed, total
            ));
            for task in self.failures() {
                lines.push(format!("  - {}: {}", task.task, task.status));
            }
        } else {
            lines.push(format!(
                "Run succeeded: {} tasks, {} files written in {:?}",
                total,
                self.all_outputs().len(),
                self.total_duration
            ));
        }

        let warnings = self.all_warnings();
        if !warnings.is_empty() {
            lines.push(format!("Warnings ({}): ", warnings.len()));
            for warning in warnings.iter().take(5) {
                lines.push(format!("  - {}", warning));
            }
            if warnings.len() > 5 {
                lines.push(format!("  ... and {} more", warnings.len() - 5));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_display() {
        assert_eq!(TaskStatus::Success.to_string(), "success");
        assert_eq!(TaskStatus::Skipped.to_string(), "skipped");
        assert_eq!(TaskStatus::Failed("boom".to_string()).to_string(), "failed: boom");
    }

    #[test]
    fn test_skipped_is_neither_success_nor_failure() {
        assert!(!TaskStatus::Skipped.is_success());
        assert!(!TaskStatus::Skipped.is_failure());
    }

    #[test]
    fn test_run_result_counts() {
        let mut result = RunResult::new();
        result.add_result(TaskResult::success(
            TaskName::Styles,
            vec![PathBuf::from("css/style.min.css")],
            Duration::ZERO,
        ));
        result.add_result(TaskResult::failed(
            TaskName::Clean,
            "permission denied".to_string(),
            Duration::ZERO,
        ));
        result.add_result(TaskResult::skipped(TaskName::Build));

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.skipped_count(), 1);
        assert_eq!(result.failed_count(), 1);
        assert!(!result.is_success());
        assert_eq!(result.all_outputs().len(), 1);
        assert!(result.get(TaskName::Build).is_some());
        assert!(result.get(TaskName::Fonts).is_none());
    }

    #[test]
    fn test_summary_lists_failures() {
        let mut result = RunResult::new();
        result.add_result(TaskResult::failed(
            TaskName::Scripts,
            "js/main.js: unexpected token".to_string(),
            Duration::ZERO,
        ));

        let summary = result.summary();
        assert!(summary.contains("Run failed"));
        assert!(summary.contains("scripts: failed: js/main.js: unexpected token"));
    }

    #[test]
    fn test_summary_truncates_warnings() {
        let mut result = RunResult::new();
        let warnings = (0..7).map(|i| format!("warning {}", i)).collect();
        result.add_result(
            TaskResult::success(TaskName::Fonts, vec![], Duration::ZERO).with_warnings(warnings),
        );

        let summary = result.summary();
        assert!(summary.contains("Warnings (7)"));
        assert!(summary.contains("... and 2 more"));
    }
}
