//! Watch mode: dev server plus rule-driven task reruns
//!
//! Change events under the working root are debounced, matched against the
//! configured watch rules, and turned into task reruns or a full browser
//! reload. A failing rerun is reported and watching continues.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;

use crate::build::{match_options, relative_key, Plan, RunResult, TaskName, TaskRunner, UnknownTask};
use crate::config::WatchConfig;
use crate::reload::ReloadSignal;
use crate::server::{DevServer, ServerError};

/// Error during watch mode
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("failed to watch {}: {source}", .path.display())]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// Watch rule glob did not parse
    #[error("invalid watch pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// Watch rule names something that cannot be rerun
    #[error("invalid watch action: {0}")]
    Action(#[from] UnknownTask),
    /// Channel receive error
    #[error("watch channel closed: {0}")]
    Channel(String),
    /// Working root not found
    #[error("working root not found: {}", .0.display())]
    RootNotFound(PathBuf),
    /// Dev server failed to start
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// What a matching change triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    /// Rerun a task
    Run(TaskName),
    /// Reload every connected browser
    Reload,
}

impl FromStr for WatchAction {
    type Err = UnknownTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "reload" {
            return Ok(WatchAction::Reload);
        }
        match s.parse::<TaskName>()? {
            TaskName::Watching => Err(UnknownTask(s.to_string())),
            task => Ok(WatchAction::Run(task)),
        }
    }
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchAction::Run(task) => write!(f, "{}", task),
            WatchAction::Reload => f.write_str("reload"),
        }
    }
}

/// One pattern group and its action.
#[derive(Debug, Clone)]
pub struct WatchRule {
    patterns: Vec<glob::Pattern>,
    action: WatchAction,
}

impl WatchRule {
    /// Whether a root-relative path (with `/` separators) matches.
    pub fn matches(&self, relative: &str) -> bool {
        self.patterns.iter().any(|p| p.matches_with(relative, match_options()))
    }

    /// The rule's action.
    pub fn action(&self) -> WatchAction {
        self.action
    }
}

/// Work derived from a batch of changed paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Tasks to rerun, in rule order, without duplicates
    pub tasks: Vec<TaskName>,
    /// Whether a full reload was requested
    pub reload: bool,
}

impl ChangeSet {
    /// Whether nothing needs to happen.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && !self.reload
    }
}

/// Ordered watch rules.
#[derive(Debug, Clone)]
pub struct WatchRules {
    rules: Vec<WatchRule>,
}

impl WatchRules {
    /// Compile the configured rules.
    pub fn from_config(config: &WatchConfig) -> Result<Self, WatchError> {
        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            let patterns = rule
                .patterns
                .iter()
                .map(|p| {
                    glob::Pattern::new(p)
                        .map_err(|source| WatchError::Pattern { pattern: p.clone(), source })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(WatchRule { patterns, action: rule.action.parse()? });
        }
        Ok(Self { rules })
    }

    /// The compiled rules.
    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    /// Classify root-relative changed paths. Each path may match several rules.
    pub fn classify<S: AsRef<str>>(&self, changed: &[S]) -> ChangeSet {
        let mut set = ChangeSet::default();
        for rule in &self.rules {
            if !changed.iter().any(|path| rule.matches(path.as_ref())) {
                continue;
            }
            match rule.action {
                WatchAction::Run(task) if !set.tasks.contains(&task) => set.tasks.push(task),
                WatchAction::Run(_) => {}
                WatchAction::Reload => set.reload = true,
            }
        }
        set
    }
}

/// Tracks failing tasks across reruns for recovery detection
#[derive(Debug, Default)]
pub struct ErrorTracker {
    failing: HashSet<TaskName>,
}

impl ErrorTracker {
    /// Create a new error tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run; returns tasks that failed before and succeeded now.
    pub fn update(&mut self, result: &RunResult) -> Vec<TaskName> {
        let mut fixed = Vec::new();
        for task_result in &result.tasks {
            if task_result.status.is_failure() {
                self.failing.insert(task_result.task);
            } else if task_result.is_success() && self.failing.remove(&task_result.task) {
                fixed.push(task_result.task);
            }
        }
        fixed
    }

    /// Check if there are any tracked errors
    pub fn has_errors(&self) -> bool {
        !self.failing.is_empty()
    }

    /// Get the number of failing tasks
    pub fn error_count(&self) -> usize {
        self.failing.len()
    }
}

/// Watcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for changes
    Idle,
    /// Rerunning tasks
    Rebuilding,
}

/// Outcome of one handled batch.
#[derive(Debug)]
pub struct ChangeReport {
    /// What the batch asked for
    pub changes: ChangeSet,
    /// Result of the reruns
    pub result: RunResult,
    /// Tasks that recovered
    pub fixed: Vec<TaskName>,
}

/// Rule evaluation and rerun bookkeeping for a running watcher.
pub struct WatchSession<'a> {
    runner: &'a TaskRunner,
    rules: WatchRules,
    roots: Vec<PathBuf>,
    state: WatchState,
    errors: ErrorTracker,
}

impl<'a> WatchSession<'a> {
    /// Create a session for the runner's working root.
    pub fn new(runner: &'a TaskRunner) -> Result<Self, WatchError> {
        let ctx = runner.context();
        let rules = WatchRules::from_config(&ctx.config().watch)?;
        let root = ctx.root_dir();
        let mut roots = vec![root.clone()];
        if let Ok(canonical) = root.canonicalize() {
            if canonical != root {
                roots.push(canonical);
            }
        }
        Ok(Self { runner, rules, roots, state: WatchState::Idle, errors: ErrorTracker::new() })
    }

    /// Current state.
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Failure tracker.
    pub fn errors(&self) -> &ErrorTracker {
        &self.errors
    }

    /// Root-relative form of a changed path, if it lies under the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        if path.is_relative() {
            return Some(relative_key(path));
        }
        self.roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .map(relative_key)
            .filter(|key| !key.is_empty())
    }

    /// Rerun whatever the changed paths call for.
    pub fn handle_changes(&mut self, changed: &[PathBuf]) -> ChangeReport {
        let relative: Vec<String> = changed.iter().filter_map(|p| self.relative(p)).collect();
        let changes = self.rules.classify(&relative);

        let mut result = RunResult::new();
        if !changes.tasks.is_empty() {
            self.state = WatchState::Rebuilding;
            let plan = Plan::Parallel(changes.tasks.iter().copied().map(Plan::Task).collect());
            result = self.runner.run(&plan);
        }
        if changes.reload {
            self.runner.context().reloader().notify(ReloadSignal::Full);
        }

        let fixed = self.errors.update(&result);
        self.state = WatchState::Idle;
        ChangeReport { changes, result, fixed }
    }
}

/// Clear the terminal screen
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn print_report(report: &ChangeReport) {
    for task in &report.fixed {
        println!("[{}] Fixed: {}", timestamp(), task);
    }
    for failure in report.result.failures() {
        eprintln!("[{}] Error in '{}': {}", timestamp(), failure.task, failure.status);
    }
    if report.changes.reload {
        println!("[{}] Reloading browsers", timestamp());
    }
}

/// Serve the working root and rerun tasks on change.
///
/// Blocks until the event channel closes; task failures never end it.
pub fn watch(runner: &TaskRunner) -> Result<(), WatchError> {
    let ctx = runner.context();
    let config = &ctx.config().watch;
    let root = ctx.root_dir();
    if !root.is_dir() {
        return Err(WatchError::RootNotFound(root));
    }

    let mut session = WatchSession::new(runner)?;
    let server = DevServer::start(ctx)?;
    println!("[{}] Serving {} at {}", timestamp(), root.display(), server.url());

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(config.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|source| WatchError::WatchPath { path: root.clone(), source })?;

    println!("[{}] Watching {} for changes...", timestamp(), root.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<PathBuf> = events
                    .into_iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .map(|e| e.path)
                    .collect();
                if changed.is_empty() {
                    continue;
                }
                tracing::debug!(count = changed.len(), "change batch");

                if config.clear_screen {
                    clear_screen();
                }
                let report = session.handle_changes(&changed);
                if report.changes.is_empty() {
                    continue;
                }
                print_report(&report);
            }
            Ok(Err(error)) => {
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
            }
            Err(e) => return Err(WatchError::Channel(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildContext;
    use crate::config::default_config;
    use std::fs;
    use tempfile::TempDir;

    fn default_rules() -> WatchRules {
        WatchRules::from_config(&WatchConfig::default()).unwrap()
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("reload".parse::<WatchAction>().unwrap(), WatchAction::Reload);
        assert_eq!("styles".parse::<WatchAction>().unwrap(), WatchAction::Run(TaskName::Styles));
        assert!("watching".parse::<WatchAction>().is_err());
        assert!("deploy".parse::<WatchAction>().is_err());
    }

    #[test]
    fn test_classify_default_rules() {
        let rules = default_rules();
        let cases: &[(&str, &[TaskName], bool)] = &[
            ("sass/style.sass", &[TaskName::Styles], false),
            ("sass/partials/_grid.scss", &[TaskName::Styles], false),
            ("img/src/photo.jpg", &[TaskName::Images], false),
            ("img/src/deep/icon.png", &[TaskName::Images], false),
            ("js/main.js", &[TaskName::Scripts], false),
            ("js/main.min.js", &[], false),
            ("html/header.html", &[TaskName::Pages], false),
            ("pages/index.html", &[TaskName::Pages], false),
            ("index.html", &[], true),
            ("css/style.min.css", &[], false),
            ("img/photo.avif", &[], false),
        ];
        for (path, tasks, reload) in cases {
            let set = rules.classify(&[*path]);
            assert_eq!(set.tasks, *tasks, "tasks for {}", path);
            assert_eq!(set.reload, *reload, "reload for {}", path);
        }
    }

    #[test]
    fn test_classify_batch_dedups() {
        let set = default_rules().classify(&["sass/a.sass", "sass/b.scss", "index.html"]);
        assert_eq!(set.tasks, vec![TaskName::Styles]);
        assert!(set.reload);
    }

    #[test]
    fn test_invalid_rule_action() {
        let mut config = WatchConfig::default();
        config.rules[0].action = "watching".to_string();
        assert!(matches!(WatchRules::from_config(&config), Err(WatchError::Action(_))));
    }

    #[test]
    fn test_error_tracker_detects_fixed_tasks() {
        use crate::build::TaskResult;
        let mut tracker = ErrorTracker::new();

        let mut first = RunResult::new();
        first.add_result(TaskResult::failed(TaskName::Styles, "bad".into(), Duration::ZERO));
        first.add_result(TaskResult::success(TaskName::Pages, vec![], Duration::ZERO));
        assert!(tracker.update(&first).is_empty());
        assert_eq!(tracker.error_count(), 1);

        let mut second = RunResult::new();
        second.add_result(TaskResult::success(TaskName::Styles, vec![], Duration::ZERO));
        assert_eq!(tracker.update(&second), vec![TaskName::Styles]);
        assert!(!tracker.has_errors());
    }

    #[test]
    fn test_top_level_html_change_reloads_only() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let runner = TaskRunner::new(ctx);
        let mut rx = runner.context().reloader().subscribe();
        let mut session = WatchSession::new(&runner).unwrap();

        let changed = temp.path().join("source/index.html");
        let report = session.handle_changes(&[changed]);

        assert!(report.result.tasks.is_empty());
        assert!(report.changes.reload);
        assert_eq!(rx.try_recv().unwrap(), ReloadSignal::Full);
        assert!(rx.try_recv().is_err());
        assert_eq!(session.state(), WatchState::Idle);
    }

    #[test]
    fn test_failed_rerun_keeps_session_alive() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("source");
        fs::create_dir_all(root.join("js")).unwrap();
        fs::write(root.join("js/main.js"), "let = ;").unwrap();

        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let runner = TaskRunner::new(ctx);
        let mut session = WatchSession::new(&runner).unwrap();

        let report = session.handle_changes(&[root.join("js/main.js")]);
        assert_eq!(report.result.failed_count(), 1);
        assert!(session.errors().has_errors());

        fs::write(root.join("js/main.js"), "let a = 1;\nconsole.log(a);\n").unwrap();
        let report = session.handle_changes(&[root.join("js/main.js")]);
        assert!(report.result.is_success());
        assert_eq!(report.fixed, vec![TaskName::Scripts]);
        assert!(root.join("js/main.min.js").exists());
    }

    #[test]
    fn test_paths_outside_root_are_ignored() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let runner = TaskRunner::new(ctx);
        let mut session = WatchSession::new(&runner).unwrap();

        let report = session.handle_changes(&[PathBuf::from("/elsewhere/index.html")]);
        assert!(report.changes.is_empty());
    }

    #[test]
    fn test_watch_missing_root() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let runner = TaskRunner::new(ctx);
        assert!(matches!(watch(&runner), Err(WatchError::RootNotFound(_))));
    }
}
