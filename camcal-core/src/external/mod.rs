// ============================================================================
// camcal-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL SERVICES: Video Access and Computer-Vision Boundaries
//
// This module defines the traits through which the calibration pipeline talks
// to everything it does not implement itself: video probing and decoding,
// fiducial-marker detection, and the camera calibration solver. Concrete
// implementations live in the submodules; tests inject the mocks.
//
// KEY COMPONENTS:
// - VideoSource / FrameReader: probing and sequential gray-frame decoding
// - MarkerDetector: per-frame marker corners and ids
// - CameraCalibrator: intrinsics fit from flattened detections
// - SidecarVideoSource: ffprobe + ffmpeg-sidecar implementation
// - OpencvVision (feature "opencv"): ArUco detector and calibrateCameraAruco
// - UnavailableVision: stand-in when no vision backend is compiled in

use crate::board::BoardDefinition;
use crate::error::{CoreError, CoreResult};
use crate::processing::reformat::FlattenedDetections;

use image::GrayImage;
use serde::Serialize;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// ffmpeg-sidecar frame decoding
pub mod ffmpeg_reader;

/// ffprobe video parameter extraction
pub mod ffprobe_executor;

/// Mock services for tests
#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks;

/// OpenCV ArUco detection and calibration
#[cfg(feature = "opencv")]
pub mod opencv_backend;

pub use ffmpeg_reader::{SidecarFrameReader, SidecarVideoSource};
#[cfg(feature = "opencv")]
pub use opencv_backend::OpencvVision;

// ============================================================================
// VIDEO ACCESS
// ============================================================================

/// Width, height and frame rate of a video resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count as reported by the container, if any
    pub frame_count: Option<u64>,
}

/// An open video resource, decoded front to back.
///
/// `Ok(None)` marks the end of the stream. Dropping the reader releases the
/// underlying resource.
pub trait FrameReader {
    fn read_frame(&mut self) -> CoreResult<Option<GrayImage>>;
}

/// Opens and probes video files.
pub trait VideoSource {
    type Reader: FrameReader;

    /// Reads the parameters of the video at `path` without decoding frames.
    fn probe(&self, path: &Path) -> CoreResult<VideoParams>;

    /// Opens `path` for sequential frame decoding.
    fn open(&self, path: &Path) -> CoreResult<Self::Reader>;
}

// ============================================================================
// MARKER DETECTION
// ============================================================================

/// Image coordinates of a marker's four corners, clockwise from top-left.
pub type MarkerCorners = [[f32; 2]; 4];

/// Raw marker detector output for one frame. `corners[i]` belongs to `ids[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerDetections {
    pub corners: Vec<MarkerCorners>,
    pub ids: Vec<i32>,
}

/// Finds the board's markers in a grayscale frame.
///
/// Implementations are built for one board and detector configuration and
/// always run the rejected-candidate refinement pass after detection.
pub trait MarkerDetector {
    fn detect(&self, frame: &GrayImage) -> CoreResult<MarkerDetections>;
}

impl<T: MarkerDetector + ?Sized> MarkerDetector for &T {
    fn detect(&self, frame: &GrayImage) -> CoreResult<MarkerDetections> {
        (**self).detect(frame)
    }
}

// ============================================================================
// CALIBRATION
// ============================================================================

/// Pinhole camera matrix plus distortion coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModel {
    pub camera_matrix: [[f64; 3]; 3],
    pub dist_coeffs: Vec<f64>,
}

impl CameraModel {
    /// Number of distortion coefficients in the initial guess (k1 k2 p1 p2 k3).
    pub const DIST_COEFF_COUNT: usize = 5;

    /// Identity camera matrix and zero distortion.
    pub fn initial_guess() -> Self {
        Self {
            camera_matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            dist_coeffs: vec![0.0; Self::DIST_COEFF_COUNT],
        }
    }
}

/// Output of the calibration solver.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationFit {
    /// RMS reprojection error in pixels
    pub error: f64,
    pub model: CameraModel,
}

/// Fits camera intrinsics to flattened board detections.
pub trait CameraCalibrator {
    fn calibrate(
        &self,
        detections: &FlattenedDetections,
        board: &BoardDefinition,
        image_size: (u32, u32),
        initial: &CameraModel,
    ) -> CoreResult<CalibrationFit>;
}

impl<T: CameraCalibrator + ?Sized> CameraCalibrator for &T {
    fn calibrate(
        &self,
        detections: &FlattenedDetections,
        board: &BoardDefinition,
        image_size: (u32, u32),
        initial: &CameraModel,
    ) -> CoreResult<CalibrationFit> {
        (**self).calibrate(detections, board, image_size, initial)
    }
}

// ============================================================================
// NO BACKEND
// ============================================================================

/// Detector and calibrator used when the crate is built without a vision
/// backend. Every call fails with `CoreError::BackendUnavailable`; cameras that
/// are already calibrated are still skipped without touching it.
#[derive(Debug, Clone, Default)]
pub struct UnavailableVision;

const NO_BACKEND_HINT: &str = "camcal was built without the `opencv` feature";

impl MarkerDetector for UnavailableVision {
    fn detect(&self, _frame: &GrayImage) -> CoreResult<MarkerDetections> {
        Err(CoreError::BackendUnavailable(NO_BACKEND_HINT.to_string()))
    }
}

impl CameraCalibrator for UnavailableVision {
    fn calibrate(
        &self,
        _detections: &FlattenedDetections,
        _board: &BoardDefinition,
        _image_size: (u32, u32),
        _initial: &CameraModel,
    ) -> CoreResult<CalibrationFit> {
        Err(CoreError::BackendUnavailable(NO_BACKEND_HINT.to_string()))
    }
}

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks if a required external command is available and executable by
/// running it with `-version`.
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", cmd_name);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", cmd_name);
            Err(CoreError::CommandStart(
                cmd_name.to_string(),
                io::Error::new(io::ErrorKind::NotFound, format!("{cmd_name} is not on PATH")),
            ))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{}': {}", cmd_name, e);
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}

/// Checks for both ffmpeg and ffprobe.
pub fn check_video_tools() -> CoreResult<()> {
    check_dependency("ffprobe")?;
    check_dependency("ffmpeg")
}
