// ============================================================================
// camcal-core/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Calibration Run Events and Callbacks
//
// This module lets consumers observe a calibration run without the core
// library knowing how progress is presented. The session walker and the
// camera pipeline emit ProgressEvents; the CLI renders them as log lines and
// progress bars. Reporting never affects the outcome of a run.
//
// KEY COMPONENTS:
// - ProgressEvent: Enum of run, camera and frame-scan events
// - ProgressCallback: Trait for receiving progress events
// - NullProgressCallback: No-op implementation for when callbacks aren't needed

use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// PROGRESS EVENTS
// ============================================================================

/// Events emitted while walking sessions and calibrating cameras.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A session directory is about to be processed
    SessionStart {
        session: PathBuf,
        /// Number of cameras discovered in the session
        cameras: usize,
    },

    /// The camera already has an intrinsics file
    CameraSkipped {
        camera: String,
        output_path: PathBuf,
    },

    /// Calibration of a camera has started
    CameraStart {
        camera: String,
        session: PathBuf,
        videos: usize,
    },

    /// Frame scanning of one video has started
    VideoScanStart {
        camera: String,
        video: PathBuf,
        /// Frame count reported by the container, if known
        total_frames: Option<u64>,
    },

    /// Another sampled frame went through the detector
    FrameProgress {
        frames_read: u64,
        total_frames: Option<u64>,
    },

    /// Frame scanning of one video finished
    VideoScanComplete {
        video: PathBuf,
        frames_read: u64,
        /// Frames with enough markers to be used as boards
        usable_frames: usize,
    },

    /// The board subset for calibration has been chosen
    BoardsSelected {
        camera: String,
        markers: usize,
        boards: usize,
        complete_boards: usize,
    },

    /// The intrinsics file for a camera has been written
    CameraComplete {
        camera: String,
        output_path: PathBuf,
        /// RMS reprojection error of the fit
        error: f64,
        duration: Duration,
    },

    /// Calibration of a camera failed; the run stops after this event
    CameraFailed {
        camera: String,
        message: String,
    },
}

// ============================================================================
// PROGRESS CALLBACK
// ============================================================================

/// Trait for receiving progress events during a calibration run.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// No-op implementation of ProgressCallback.
#[derive(Debug, Clone, Default)]
pub struct NullProgressCallback;

impl ProgressCallback for NullProgressCallback {
    fn on_progress(&self, _event: ProgressEvent) {
        // Do nothing
    }
}
