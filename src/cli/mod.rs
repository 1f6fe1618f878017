//! Command-line interface implementation
//!
//! `sitepipe [OPTIONS] [TASK]` runs one task or composite plan. Without a
//! task the `default` plan runs (parallel asset pass, then watching).

mod tasks;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

pub use tasks::{list_tasks, run_plan};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Sitepipe - asset pipeline and live-reload dev server for static sites
#[derive(Parser, Debug)]
#[command(name = "sitepipe")]
#[command(about = "Sitepipe - compile styles, scripts, images, sprites, fonts and pages; serve with live reload")]
#[command(version)]
pub struct Cli {
    /// Task or plan to run: styles, scripts, images, sprite, fonts, pages,
    /// watching, clean, build, build-project (buildProject), default
    #[arg(default_value = "default")]
    pub task: String,

    /// Path to sitepipe.toml (default: search upward from the current directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the working tree directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Override the packaged output directory
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Override the dev server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Show what would run without running it
    #[arg(long)]
    pub dry_run: bool,

    /// List tasks and plans, then exit
    #[arg(short = 'T', long = "tasks")]
    pub list: bool,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "SITEPIPE_LOG";

/// Initialize tracing based on CLI flags.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => "sitepipe=info",
        1 => "sitepipe=debug",
        _ => "sitepipe=trace",
    };
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(filter));

    fmt().with_env_filter(env_filter).with_target(false).with_writer(std::io::stderr).init();
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list {
        print!("{}", list_tasks());
        return ExitCode::from(EXIT_SUCCESS);
    }

    run_plan(&cli)
}
