//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

use crate::cli::ConfigArgs;
use crate::error::CliResult;

use anyhow::Context;
use camcal_core::PipelineConfig;

/// Module containing the implementation of the `calibrate` command.
pub mod calibrate;

/// Module containing the implementation of the `plan` command.
pub mod plan;

/// Loads the pipeline config and applies the `--path` override.
pub fn load_config(args: &ConfigArgs) -> CliResult<PipelineConfig> {
    let mut config = PipelineConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    if let Some(path) = &args.path {
        log::debug!("Session root overridden: {}", path.display());
        config.path = path.clone();
    }
    Ok(config)
}
