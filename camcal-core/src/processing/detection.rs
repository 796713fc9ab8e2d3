//! Per-video marker detection.
//!
//! Runs the marker detector over the sampled frames of one video and keeps the
//! frames that saw enough markers to constrain a calibration.

use crate::error::{CoreError, CoreResult};
use crate::external::{MarkerCorners, MarkerDetections, MarkerDetector, VideoSource};
use crate::processing::sampler::FrameSampler;
use crate::progress::{ProgressCallback, ProgressEvent};

use std::path::Path;

/// Frames with fewer detected markers than this are dropped on the spot.
pub const MIN_MARKERS_PER_FRAME: usize = 2;

/// Markers detected in one frame: `corners[i]` belongs to marker `ids[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardObservation {
    corners: Vec<MarkerCorners>,
    ids: Vec<i32>,
}

impl BoardObservation {
    /// Turns raw detector output into an observation.
    ///
    /// Returns `Ok(None)` for frames with fewer than [`MIN_MARKERS_PER_FRAME`]
    /// markers, and an error if the detector returned unequal corner and id
    /// lists.
    pub fn from_detections(detections: MarkerDetections) -> CoreResult<Option<Self>> {
        let MarkerDetections { corners, ids } = detections;
        if corners.len() != ids.len() {
            return Err(CoreError::Detection(format!(
                "detector returned {} corner sets but {} ids",
                corners.len(),
                ids.len()
            )));
        }
        if corners.len() < MIN_MARKERS_PER_FRAME {
            return Ok(None);
        }
        Ok(Some(Self { corners, ids }))
    }

    pub fn marker_count(&self) -> usize {
        self.ids.len()
    }

    pub fn corners(&self) -> &[MarkerCorners] {
        &self.corners
    }

    pub fn ids(&self) -> &[i32] {
        &self.ids
    }

    pub(crate) fn into_parts(self) -> (Vec<MarkerCorners>, Vec<i32>) {
        (self.corners, self.ids)
    }
}

/// Scans one video and returns its usable board observations in frame order.
///
/// The video is opened, read to the end and released before returning, also
/// when detection fails part way.
pub fn collect_observations<V, D>(
    source: &V,
    detector: &D,
    camera: &str,
    video: &Path,
    frame_stride: usize,
    progress: &dyn ProgressCallback,
) -> CoreResult<Vec<BoardObservation>>
where
    V: VideoSource,
    D: MarkerDetector,
{
    // Frame count only sizes the progress bar
    let total_frames = match source.probe(video) {
        Ok(params) => params.frame_count,
        Err(e) => {
            log::debug!("No frame count for {}: {}", video.display(), e);
            None
        }
    };
    progress.on_progress(ProgressEvent::VideoScanStart {
        camera: camera.to_string(),
        video: video.to_path_buf(),
        total_frames,
    });

    let mut sampler = FrameSampler::new(source.open(video)?, frame_stride);
    let mut observations = Vec::new();
    let mut sampled = 0usize;

    while let Some(frame) = sampler.next() {
        let frame = frame?;
        sampled += 1;
        let detections = detector.detect(&frame.image)?;
        if let Some(observation) = BoardObservation::from_detections(detections)? {
            observations.push(observation);
        } else {
            log::trace!("Frame {} of {}: too few markers", frame.index, video.display());
        }
        progress.on_progress(ProgressEvent::FrameProgress {
            frames_read: sampler.frames_read(),
            total_frames,
        });
    }

    let frames_read = sampler.frames_read();
    drop(sampler);

    log::debug!(
        "{}: {} frames decoded, {} sampled, {} usable",
        video.display(),
        frames_read,
        sampled,
        observations.len()
    );
    progress.on_progress(ProgressEvent::VideoScanComplete {
        video: video.to_path_buf(),
        frames_read,
        usable_frames: observations.len(),
    });

    Ok(observations)
}
