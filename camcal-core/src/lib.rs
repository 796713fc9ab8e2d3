//! Core library for batch camera intrinsics calibration from marker-board videos.
//!
//! This crate walks a tree of capture sessions, samples frames from each
//! camera's calibration videos, detects the board's markers, selects the most
//! informative boards and writes one intrinsics TOML file per camera. Cameras
//! that already have an intrinsics file are skipped, so runs are idempotent.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use camcal_core::{NullProgressCallback, PipelineConfig, SessionWalker};
//! use camcal_core::external::{SidecarVideoSource, UnavailableVision};
//! use std::path::Path;
//!
//! let config = PipelineConfig::from_file(Path::new("/data/config.toml")).unwrap();
//! let mut walker = SessionWalker::new(
//!     config,
//!     SidecarVideoSource,
//!     UnavailableVision,
//!     UnavailableVision,
//! )
//! .unwrap();
//!
//! for job in walker.plan().unwrap() {
//!     println!("{} {}: {:?}", job.session.display(), job.camera, job.state);
//! }
//! let summary = walker.run(&NullProgressCallback).unwrap();
//! println!("{} camera(s) calibrated", summary.calibrated());
//! ```

pub mod board;
pub mod config;
pub mod error;
pub mod external;
pub mod intrinsics;
pub mod processing;
pub mod progress;
pub mod session;
pub mod utils;

// Re-exports for public API
pub use board::{BoardDefinition, CornerRefinement, DetectorSettings, MarkerDictionary};
pub use config::{PipelineConfig, TieBreak};
pub use error::{CoreError, CoreResult};
pub use intrinsics::{CameraIntrinsics, read_intrinsics, write_intrinsics};
pub use progress::{NullProgressCallback, ProgressCallback, ProgressEvent};
pub use session::{
    CameraJob, CameraOutcome, CameraPattern, CameraState, RunSummary, SessionWalker,
};
pub use utils::format_duration;
