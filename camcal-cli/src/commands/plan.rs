//! Implementation of the 'plan' subcommand.
//!
//! Discovers sessions and cameras and prints what `calibrate` would do,
//! without probing or decoding any video.

use crate::cli::PlanArgs;
use crate::commands::load_config;
use crate::error::CliResult;
use crate::terminal;

use anyhow::Context;
use camcal_core::SessionWalker;
use camcal_core::external::{SidecarVideoSource, UnavailableVision};

pub fn run_plan(args: PlanArgs) -> CliResult<()> {
    let config = load_config(&args.common)?;
    let root = config.path.clone();
    let walker =
        SessionWalker::new(config, SidecarVideoSource, UnavailableVision, UnavailableVision)?;
    let jobs = walker
        .plan()
        .with_context(|| format!("Failed to scan sessions under {}", root.display()))?;
    terminal::print_plan(&jobs);
    Ok(())
}
