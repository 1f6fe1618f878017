//! Task names and composite run plans.
//!
//! Every pipeline is addressable by a [`TaskName`]. Composite commands
//! (`default`, `build-project`) are expressed as a [`Plan`] tree of series
//! and parallel groups.

use std::fmt;
use std::str::FromStr;

/// A single named pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskName {
    /// Sass entry to a prefixed, minified stylesheet bundle
    Styles,
    /// Script concatenation and minification
    Scripts,
    /// Raster sources to AVIF, WebP and optimized originals
    Images,
    /// SVG icons to a stacked sprite
    Sprite,
    /// Font sources to TTF, WOFF and WOFF2
    Fonts,
    /// Page templates with resolved include directives
    Pages,
    /// Dev server plus file watcher
    Watching,
    /// Remove the output directory
    Clean,
    /// Copy the package manifest into the output directory
    Build,
}

impl TaskName {
    /// All task names, in CLI listing order.
    pub const ALL: [TaskName; 9] = [
        TaskName::Styles,
        TaskName::Scripts,
        TaskName::Images,
        TaskName::Sprite,
        TaskName::Fonts,
        TaskName::Pages,
        TaskName::Watching,
        TaskName::Clean,
        TaskName::Build,
    ];

    /// Name used on the command line and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::Styles => "styles",
            TaskName::Scripts => "scripts",
            TaskName::Images => "images",
            TaskName::Sprite => "sprite",
            TaskName::Fonts => "fonts",
            TaskName::Pages => "pages",
            TaskName::Watching => "watching",
            TaskName::Clean => "clean",
            TaskName::Build => "build",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown task or plan names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTask(pub String);

impl fmt::Display for UnknownTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown task '{}'", self.0)
    }
}

impl std::error::Error for UnknownTask {}

impl FromStr for TaskName {
    type Err = UnknownTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskName::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTask(s.to_string()))
    }
}

/// A tree of tasks to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Run one task
    Task(TaskName),
    /// Run children one after another, stopping at the first failure.
    /// A trailing `watching` still starts so later edits can recover.
    Series(Vec<Plan>),
    /// Run children concurrently and wait for all of them
    Parallel(Vec<Plan>),
}

impl Plan {
    /// The default composite: the four asset pipelines concurrently, then
    /// the dev server and watcher (started even when a pipeline failed).
    pub fn default_plan() -> Self {
        Plan::Series(vec![
            Plan::Parallel(vec![
                Plan::Task(TaskName::Styles),
                Plan::Task(TaskName::Images),
                Plan::Task(TaskName::Scripts),
                Plan::Task(TaskName::Pages),
            ]),
            Plan::Task(TaskName::Watching),
        ])
    }

    /// Clean, then copy the package manifest.
    pub fn build_project() -> Self {
        Plan::Series(vec![Plan::Task(TaskName::Clean), Plan::Task(TaskName::Build)])
    }

    /// Resolve a command-line name to a plan.
    ///
    /// Accepts every [`TaskName`] plus `default`, `build-project` and
    /// `buildProject`.
    pub fn named(name: &str) -> Result<Self, UnknownTask> {
        match name {
            "default" => Ok(Plan::default_plan()),
            "build-project" | "buildProject" => Ok(Plan::build_project()),
            other => other.parse().map(Plan::Task),
        }
    }

    /// Tasks in the order a sequential walk of the plan visits them.
    pub fn tasks(&self) -> Vec<TaskName> {
        let mut out = Vec::new();
        self.collect_tasks(&mut out);
        out
    }

    fn collect_tasks(&self, out: &mut Vec<TaskName>) {
        match self {
            Plan::Task(t) => out.push(*t),
            Plan::Series(children) | Plan::Parallel(children) => {
                for child in children {
                    child.collect_tasks(out);
                }
            }
        }
    }

    /// Whether this plan runs `task` anywhere.
    pub fn contains(&self, task: TaskName) -> bool {
        self.tasks().contains(&task)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, kind: &str, children: &[Plan]| {
            write!(f, "{}(", kind)?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")
        };
        match self {
            Plan::Task(t) => write!(f, "{}", t),
            Plan::Series(children) => join(f, "series", children),
            Plan::Parallel(children) => join(f, "parallel", children),
        }
    }
}
