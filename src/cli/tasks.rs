//! Task command implementation

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use super::{Cli, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::{BuildContext, ConsoleProgress, Plan, TaskName, TaskRunner};
use crate::config::{load_config, merge_cli_overrides, CliOverrides, LoadedConfig};

/// Human-readable list of tasks and composite plans.
pub fn list_tasks() -> String {
    let mut out = String::from("Tasks:\n");
    for task in TaskName::ALL {
        out.push_str(&format!("  {}\n", task));
    }
    out.push_str("Plans:\n");
    out.push_str(&format!("  default        {}\n", Plan::default_plan()));
    out.push_str(&format!("  build-project  {}\n", Plan::build_project()));
    out
}

/// Load configuration and apply CLI overrides. Errors are already reported.
fn load(cli: &Cli) -> Result<LoadedConfig, ExitCode> {
    let mut loaded = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    };

    let overrides = CliOverrides { root: cli.root.clone(), out: cli.out.clone(), port: cli.port };
    merge_cli_overrides(&mut loaded.config, &overrides);

    let errors = loaded.config.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("Error: {}", error);
        }
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }

    match &loaded.source {
        Some(path) => tracing::debug!(config = %path.display(), "using config"),
        None => tracing::debug!("no sitepipe.toml found, using defaults"),
    }
    Ok(loaded)
}

/// Run the task or plan named on the command line.
pub fn run_plan(cli: &Cli) -> ExitCode {
    let plan = match Plan::named(&cli.task) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'sitepipe --tasks' to list available tasks");
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let loaded = match load(cli) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let verbose = cli.verbose > 0;
    let context = BuildContext::new(loaded.config, loaded.base_dir).with_verbose(verbose);
    let progress = ConsoleProgress::new()
        .with_colors(std::io::stderr().is_terminal())
        .with_verbose(verbose);
    let runner =
        TaskRunner::new(context).with_progress(Arc::new(progress)).with_dry_run(cli.dry_run);

    if cli.dry_run {
        println!("Dry run - would run: {}", plan);
        println!("  Root:   {}", display(runner.context().root_dir()));
        println!("  Output: {}", display(runner.context().out_dir()));
    }

    let result = runner.run(&plan);
    if result.is_success() {
        println!("{}", result.summary());
        ExitCode::from(EXIT_SUCCESS)
    } else {
        eprintln!("{}", result.summary());
        ExitCode::from(EXIT_ERROR)
    }
}

fn display(path: PathBuf) -> String {
    path.display().to_string()
}
