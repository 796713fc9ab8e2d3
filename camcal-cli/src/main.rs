// camcal-cli/src/main.rs
//
// Entry point for the camcal binary: parses the arguments, installs the
// logger, dispatches to the command and maps any error to exit status 1.

use camcal_cli::error::report_error;
use camcal_cli::logging::init_logging;
use camcal_cli::{Cli, Commands, run_calibrate, run_plan};
use clap::Parser;
use std::process;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        report_error(&e);
        process::exit(1);
    }

    let result = match cli.command {
        Commands::Calibrate(args) => run_calibrate(args),
        Commands::Plan(args) => run_plan(args),
    };

    if let Err(e) = result {
        report_error(&e);
        process::exit(1);
    }
}
