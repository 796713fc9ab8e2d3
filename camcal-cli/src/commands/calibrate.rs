//! Implementation of the 'calibrate' subcommand.
//!
//! Loads the pipeline config, applies the flag overrides and runs the session
//! walker with the production video source and the compiled-in vision backend.

use crate::cli::CalibrateArgs;
use crate::commands::load_config;
use crate::error::CliResult;
use crate::progress::CliProgressReporter;
use crate::terminal;

use anyhow::Context;
use camcal_core::external::{
    CameraCalibrator, MarkerDetector, SidecarVideoSource, check_video_tools,
};
use camcal_core::{CameraState, PipelineConfig, SessionWalker};

/// Applies `--seed` and `--max-boards` on top of the config file.
pub fn apply_overrides(config: &mut PipelineConfig, args: &CalibrateArgs) -> CliResult<()> {
    if let Some(seed) = args.seed {
        config.selection_seed = Some(seed);
    }
    if let Some(max_boards) = args.max_boards {
        config.max_boards = usize::try_from(max_boards).context("--max-boards is too large")?;
    }
    Ok(())
}

pub fn run_calibrate(args: CalibrateArgs) -> CliResult<()> {
    let mut config = load_config(&args.common)?;
    apply_overrides(&mut config, &args)?;

    run_with_backend(config, &args)
}

#[cfg(feature = "opencv")]
fn run_with_backend(config: PipelineConfig, args: &CalibrateArgs) -> CliResult<()> {
    let vision = camcal_core::external::OpencvVision::new(
        &config.board,
        &camcal_core::DetectorSettings::default(),
    )?;
    execute(config, &vision, &vision, args)
}

#[cfg(not(feature = "opencv"))]
fn run_with_backend(config: PipelineConfig, args: &CalibrateArgs) -> CliResult<()> {
    use camcal_core::external::UnavailableVision;
    log::debug!("Built without a vision backend; cameras that need calibrating will fail");
    execute(config, UnavailableVision, UnavailableVision, args)
}

fn execute<D, C>(
    config: PipelineConfig,
    detector: D,
    calibrator: C,
    args: &CalibrateArgs,
) -> CliResult<()>
where
    D: MarkerDetector,
    C: CameraCalibrator,
{
    let root = config.path.clone();
    let mut walker = SessionWalker::new(config, SidecarVideoSource, detector, calibrator)?;

    let jobs = walker
        .plan()
        .with_context(|| format!("Failed to scan sessions under {}", root.display()))?;
    let pending = jobs.iter().filter(|j| j.state == CameraState::Pending).count();
    log::info!(
        "Found {} camera(s) under {}, {} to calibrate",
        jobs.len(),
        root.display(),
        pending
    );

    // Only needed when something will actually be decoded
    if pending > 0 {
        check_video_tools().context("ffmpeg and ffprobe are required to calibrate")?;
        log::debug!("External dependency check passed.");
    }

    let reporter = CliProgressReporter::new(args.json);
    let summary = walker.run(&reporter).context("Calibration run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        terminal::print_summary(&summary);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConfigArgs;
    use std::path::PathBuf;

    fn args(seed: Option<u64>, max_boards: Option<u64>) -> CalibrateArgs {
        CalibrateArgs {
            common: ConfigArgs {
                config: PathBuf::from("pipeline.toml"),
                path: None,
            },
            seed,
            max_boards,
            json: false,
        }
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = PipelineConfig::new("/data", "raw", "calib", "calib-", "cam([A-Z])");
        apply_overrides(&mut config, &args(Some(5), Some(30))).unwrap();
        assert_eq!(config.selection_seed, Some(5));
        assert_eq!(config.max_boards, 30);
    }

    #[test]
    fn test_absent_overrides_keep_config_values() {
        let mut config = PipelineConfig::new("/data", "raw", "calib", "calib-", "cam([A-Z])");
        config.selection_seed = Some(9);
        apply_overrides(&mut config, &args(None, None)).unwrap();
        assert_eq!(config.selection_seed, Some(9));
        assert_eq!(config.max_boards, 85);
    }
}
