//! Spritetint - command-line tool for recoloring team-color sprites

use std::process::ExitCode;

use spritetint::cli;

fn main() -> ExitCode {
    cli::run()
}
