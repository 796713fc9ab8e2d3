// camcal-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "camcal: Batch camera intrinsics calibration",
    long_about = "Calibrates every camera of every session under a capture root from ArUco board videos, writing one intrinsics TOML file per camera."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Also write the log to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calibrate every camera that has no intrinsics file yet
    Calibrate(CalibrateArgs),
    /// List the calibration jobs without running them
    Plan(PlanArgs),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Pipeline configuration file (TOML)
    #[arg(short, long, value_name = "FILE", env = "CAMCAL_CONFIG")]
    pub config: PathBuf,

    /// Override the session root (`path` in the config)
    #[arg(short, long, value_name = "DIR")]
    pub path: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CalibrateArgs {
    #[command(flatten)]
    pub common: ConfigArgs,

    /// Seed for the board selection tie-break (`selection_seed`)
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Maximum number of boards per camera (`max_boards`)
    #[arg(long, value_name = "K", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_boards: Option<u64>,

    /// Print the run summary as JSON on stdout
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub common: ConfigArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_calibrate_basic_args() {
        let cli = Cli::parse_from(["camcal", "calibrate", "--config", "pipeline.toml"]);
        assert!(!cli.verbose);
        assert!(cli.log_file.is_none());
        match cli.command {
            Commands::Calibrate(args) => {
                assert_eq!(args.common.config, PathBuf::from("pipeline.toml"));
                assert!(args.common.path.is_none());
                assert!(args.seed.is_none());
                assert!(args.max_boards.is_none());
                assert!(!args.json);
            }
            other => panic!("Expected Calibrate command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_calibrate_overrides() {
        let cli = Cli::parse_from([
            "camcal",
            "calibrate",
            "-c",
            "pipeline.toml",
            "--path",
            "/data",
            "--seed",
            "7",
            "--max-boards",
            "40",
            "--json",
            "--verbose",
            "--log-file",
            "run.log",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));
        match cli.command {
            Commands::Calibrate(args) => {
                assert_eq!(args.common.path, Some(PathBuf::from("/data")));
                assert_eq!(args.seed, Some(7));
                assert_eq!(args.max_boards, Some(40));
                assert!(args.json);
            }
            other => panic!("Expected Calibrate command, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_max_boards_is_rejected() {
        let result = Cli::try_parse_from([
            "camcal",
            "calibrate",
            "--config",
            "pipeline.toml",
            "--max-boards",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::parse_from(["camcal", "plan", "--config", "pipeline.toml", "-p", "/data"]);
        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.common.path, Some(PathBuf::from("/data")));
            }
            other => panic!("Expected Plan command, got {other:?}"),
        }
    }
}
