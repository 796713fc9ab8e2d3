//! Per-camera calibration processing.
//!
//! This module holds the steps that turn one camera's calibration videos into
//! intrinsics, in the order they run: frame sampling, marker detection, board
//! selection, flattening and the solver call.

/// Strided frame sampling
pub mod sampler;

/// Per-frame marker detection and filtering
pub mod detection;

/// Board subset selection
pub mod selection;

/// Flattening of selected boards for the solver
pub mod reformat;

/// Orchestration of the steps for one camera
pub mod calibrate;

pub use calibrate::CameraPipeline;
pub use detection::{BoardObservation, MIN_MARKERS_PER_FRAME, collect_observations};
pub use reformat::FlattenedDetections;
pub use sampler::{FrameSampler, SampledFrame};
pub use selection::select_boards;
