// ============================================================================
// camcal-core/src/processing/calibrate.rs
// ============================================================================
//
// CAMERA PIPELINE: From Calibration Videos to Intrinsics
//
// Runs the full per-camera chain over all of one camera's videos: probe the
// video parameters, sample and detect every video in turn, select the boards,
// flatten them and hand them to the calibration solver.
//
// KEY COMPONENTS:
// - CameraPipeline: borrows the injected services and the configuration
// - CameraPipeline::run: one camera, many videos, one CameraIntrinsics
//
// The pipeline never touches the filesystem beyond reading videos; writing
// the result is up to the caller.

use crate::config::PipelineConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{CameraCalibrator, CameraModel, MarkerDetector, VideoSource};
use crate::intrinsics::CameraIntrinsics;
use crate::processing::detection::collect_observations;
use crate::processing::reformat::FlattenedDetections;
use crate::processing::selection::select_boards;
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::utils::format_duration;

use rand::Rng;
use std::path::PathBuf;
use std::time::Instant;

/// Per-camera calibration chain over borrowed services.
pub struct CameraPipeline<'a, V, D, C> {
    pub source: &'a V,
    pub detector: &'a D,
    pub calibrator: &'a C,
    pub config: &'a PipelineConfig,
    pub progress: &'a dyn ProgressCallback,
}

impl<V, D, C> CameraPipeline<'_, V, D, C>
where
    V: VideoSource,
    D: MarkerDetector,
    C: CameraCalibrator,
{
    /// Calibrates `camera` from `videos`.
    ///
    /// Video parameters are read from the first video only; all videos of a
    /// camera are expected to share them. Fails with
    /// [`CoreError::NoUsableFrames`] when no frame of any video saw at least
    /// two markers.
    pub fn run<R: Rng + ?Sized>(
        &self,
        camera: &str,
        videos: &[PathBuf],
        rng: &mut R,
    ) -> CoreResult<CameraIntrinsics> {
        let first = videos.first().ok_or_else(|| {
            CoreError::NoUsableFrames(format!("camera {camera} has no calibration videos"))
        })?;
        let params = self.source.probe(first)?;
        log::debug!(
            "Camera {}: {}x{} @ {:.3} fps (from {})",
            camera,
            params.width,
            params.height,
            params.fps,
            first.display()
        );

        // ---- Detection ----
        let mut observations = Vec::new();
        for video in videos {
            log::info!("Detecting markers in {}", video.display());
            observations.extend(collect_observations(
                self.source,
                self.detector,
                camera,
                video,
                self.config.frame_stride,
                self.progress,
            )?);
        }

        // ---- Selection ----
        let selected = select_boards(
            observations,
            self.config.max_boards,
            self.config.tie_break,
            rng,
        );
        let flat = FlattenedDetections::from_observations(selected);
        let complete = flat.complete_boards(self.config.board.marker_count());
        log::info!(
            "Camera {}: found {} markers, {} boards, {} complete boards",
            camera,
            flat.marker_total(),
            flat.board_count(),
            complete
        );
        self.progress.on_progress(ProgressEvent::BoardsSelected {
            camera: camera.to_string(),
            markers: flat.marker_total(),
            boards: flat.board_count(),
            complete_boards: complete,
        });

        if flat.is_empty() {
            return Err(CoreError::NoUsableFrames(format!(
                "no frame of camera {} showed at least two markers in {} video(s)",
                camera,
                videos.len()
            )));
        }

        // ---- Calibration ----
        log::info!("Calibrating camera {}...", camera);
        let start = Instant::now();
        let fit = self.calibrator.calibrate(
            &flat,
            &self.config.board,
            (params.width, params.height),
            &CameraModel::initial_guess(),
        )?;
        log::info!(
            "Camera {} calibrated in {} (reprojection error {:.4})",
            camera,
            format_duration(start.elapsed().as_secs_f64()),
            fit.error
        );

        Ok(CameraIntrinsics::from_fit(fit, &params))
    }
}
