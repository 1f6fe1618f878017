//! Plan execution.
//!
//! The runner walks a [`Plan`] tree: series children run in order and stop
//! at the first failure (the rest are reported as skipped, except that
//! `watching` still starts), parallel children run on scoped threads and
//! are all awaited. After a task succeeds, its reload signal is published.

use crate::build::{
    BuildContext, NullProgress, Plan, ProgressEvent, ProgressReporter, RunResult, TaskName,
    TaskResult,
};
use crate::reload::ReloadSignal;
use std::sync::Arc;
use std::time::Instant;

/// Executes plans against a build context.
pub struct TaskRunner {
    /// Build context
    context: BuildContext,
    /// Progress sink
    progress: Arc<dyn ProgressReporter>,
    /// Whether to only report what would run
    dry_run: bool,
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("context", &self.context)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl TaskRunner {
    /// Create a runner that reports nothing.
    pub fn new(context: BuildContext) -> Self {
        Self { context, progress: Arc::new(NullProgress::new()), dry_run: false }
    }

    /// Set the progress reporter.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Set dry-run mode (tasks are listed, not executed).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// The progress reporter.
    pub fn progress(&self) -> &Arc<dyn ProgressReporter> {
        &self.progress
    }

    /// Run a plan to completion.
    pub fn run(&self, plan: &Plan) -> RunResult {
        let start = Instant::now();
        self.progress.report(ProgressEvent::RunStarted {
            plan: plan.to_string(),
            total_tasks: plan.tasks().len(),
        });

        let mut result = self.execute(plan);
        result.total_duration = start.elapsed();

        self.progress.report(ProgressEvent::RunCompleted {
            success: result.is_success(),
            duration_ms: result.total_duration.as_millis() as u64,
            failed: result.failed_count(),
        });
        result
    }

    fn execute(&self, plan: &Plan) -> RunResult {
        match plan {
            Plan::Task(task) => {
                let mut result = RunResult::new();
                result.add_result(self.run_task(*task));
                result
            }
            Plan::Series(children) => self.execute_series(children),
            Plan::Parallel(children) => self.execute_parallel(children),
        }
    }

    fn execute_series(&self, children: &[Plan]) -> RunResult {
        let mut result = RunResult::new();
        let mut failed = false;
        for child in children {
            if failed && *child != Plan::Task(TaskName::Watching) {
                for task in child.tasks() {
                    let skipped = TaskResult::skipped(task);
                    self.report_completed(&skipped);
                    result.add_result(skipped);
                }
                continue;
            }
            let child_result = self.execute(child);
            failed |= !child_result.is_success();
            result.extend(child_result);
        }
        result
    }

    fn execute_parallel(&self, children: &[Plan]) -> RunResult {
        if children.len() <= 1 {
            return children.iter().fold(RunResult::new(), |mut acc, child| {
                acc.extend(self.execute(child));
                acc
            });
        }

        let mut result = RunResult::new();
        std::thread::scope(|s| {
            let handles: Vec<_> =
                children.iter().map(|child| (child, s.spawn(move || self.execute(child)))).collect();

            for (child, handle) in handles {
                match handle.join() {
                    Ok(child_result) => result.extend(child_result),
                    Err(_) => {
                        for task in child.tasks() {
                            result.add_result(TaskResult::failed(
                                task,
                                "task panicked".to_string(),
                                std::time::Duration::ZERO,
                            ));
                        }
                    }
                }
            }
        });
        result
    }

    /// Run a single task, including `watching`.
    pub fn run_task(&self, task: TaskName) -> TaskResult {
        self.progress.report(ProgressEvent::TaskStarted { task });

        if self.dry_run {
            let result = TaskResult::skipped(task);
            self.report_completed(&result);
            return result;
        }

        let start = Instant::now();
        let _span = tracing::info_span!("task", name = task.as_str()).entered();

        let result = if task == TaskName::Watching {
            match crate::watch::watch(self) {
                Ok(()) => TaskResult::success(task, vec![], start.elapsed()),
                Err(e) => TaskResult::failed(task, e.to_string(), start.elapsed()),
            }
        } else {
            match crate::tasks::run_task(&self.context, task) {
                Ok(outcome) => {
                    for warning in &outcome.warnings {
                        self.progress.report(ProgressEvent::Warning {
                            task: Some(task),
                            message: warning.clone(),
                        });
                    }
                    if let Some(signal) = ReloadSignal::for_task(task) {
                        self.context.reloader().notify(signal);
                    }
                    TaskResult::success(task, outcome.outputs, start.elapsed())
                        .with_warnings(outcome.warnings)
                }
                Err(e) => {
                    tracing::error!(task = task.as_str(), "{}", e);
                    TaskResult::failed(task, e.to_string(), start.elapsed())
                }
            }
        };

        self.report_completed(&result);
        result
    }

    fn report_completed(&self, result: &TaskResult) {
        self.progress.report(ProgressEvent::TaskCompleted {
            task: result.task,
            status: result.status.clone(),
            duration_ms: result.duration.as_millis() as u64,
            outputs: result.outputs.len(),
        });
    }
}
