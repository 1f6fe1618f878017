//! Sitepipe - command-line entry point

use std::process::ExitCode;

use sitepipe::cli;

fn main() -> ExitCode {
    cli::run()
}
