// camcal-cli/src/lib.rs
//
// Library portion of the camcal CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod progress;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{CalibrateArgs, Cli, Commands, PlanArgs};
pub use commands::calibrate::run_calibrate;
pub use commands::plan::run_plan;
