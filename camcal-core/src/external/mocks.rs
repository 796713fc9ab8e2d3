// camcal-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for unit tests and when the "test-mocks" feature is enabled.

use super::*;
use crate::error::{CoreError, CoreResult};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Builds a frame that `MockMarkerDetector` will report `markers` markers in.
///
/// The marker count is stored in the top-left pixel.
pub fn frame_with_markers(markers: u8) -> GrayImage {
    tagged_frame(markers, 0)
}

/// Like [`frame_with_markers`], with the detected corners shifted down by
/// `tag` rows of markers so frames with equal counts can be told apart.
pub fn tagged_frame(markers: u8, tag: u8) -> GrayImage {
    let mut image = GrayImage::new(8, 8);
    image.put_pixel(0, 0, image::Luma([markers]));
    image.put_pixel(1, 0, image::Luma([tag]));
    image
}

// ============================================================================
// VIDEO
// ============================================================================

/// Frame reader over an in-memory frame list.
pub struct MockFrameReader {
    frames: VecDeque<GrayImage>,
    fail_after: Option<usize>,
    served: usize,
    released: Rc<Cell<usize>>,
}

impl MockFrameReader {
    pub fn new(frames: Vec<GrayImage>) -> Self {
        Self {
            frames: frames.into(),
            fail_after: None,
            served: 0,
            released: Rc::new(Cell::new(0)),
        }
    }

    /// Makes the reader fail with a decode error after `frames` frames.
    pub fn fail_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    fn with_release_counter(mut self, released: Rc<Cell<usize>>) -> Self {
        self.released = released;
        self
    }
}

impl FrameReader for MockFrameReader {
    fn read_frame(&mut self) -> CoreResult<Option<GrayImage>> {
        if self.fail_after.is_some_and(|limit| self.served >= limit) {
            return Err(CoreError::FrameDecode("mock decode failure".to_string()));
        }
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.served += 1;
        }
        Ok(frame)
    }
}

impl Drop for MockFrameReader {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

#[derive(Clone)]
struct MockVideo {
    params: VideoParams,
    frames: Vec<GrayImage>,
}

/// `VideoSource` serving registered in-memory videos.
#[derive(Clone, Default)]
pub struct MockVideoSource {
    videos: Rc<RefCell<HashMap<PathBuf, MockVideo>>>,
    probed: Rc<RefCell<Vec<PathBuf>>>,
    unprobeable: Rc<RefCell<HashSet<PathBuf>>>,
    opened: Rc<RefCell<Vec<PathBuf>>>,
    released: Rc<Cell<usize>>,
}

impl MockVideoSource {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a video whose sampled frames (every `stride`-th) report the
    /// given marker counts; the frames in between report none.
    pub fn add_video(
        &self,
        path: &Path,
        params: VideoParams,
        sampled_markers: &[u8],
        stride: usize,
    ) {
        let stride = stride.max(1);
        let mut frames = Vec::with_capacity(sampled_markers.len() * stride);
        for markers in sampled_markers {
            frames.push(frame_with_markers(*markers));
            for _ in 1..stride {
                frames.push(frame_with_markers(0));
            }
        }
        self.add_frames(path, params, frames);
    }

    pub fn add_frames(&self, path: &Path, params: VideoParams, frames: Vec<GrayImage>) {
        self.videos
            .borrow_mut()
            .insert(path.to_path_buf(), MockVideo { params, frames });
    }

    /// Makes parameter lookup fail for `path` while `open` still serves its frames.
    pub fn fail_params(&self, path: &Path) {
        self.unprobeable.borrow_mut().insert(path.to_path_buf());
    }

    pub fn probed_paths(&self) -> Vec<PathBuf> {
        self.probed.borrow().clone()
    }

    pub fn opened_paths(&self) -> Vec<PathBuf> {
        self.opened.borrow().clone()
    }

    /// Number of readers dropped so far.
    pub fn released_count(&self) -> usize {
        self.released.get()
    }
}

impl VideoSource for MockVideoSource {
    type Reader = MockFrameReader;

    fn probe(&self, path: &Path) -> CoreResult<VideoParams> {
        log::info!("MockVideoSource::probe called for: {}", path.display());
        self.probed.borrow_mut().push(path.to_path_buf());
        if self.unprobeable.borrow().contains(path) {
            return Err(CoreError::FfprobeParse(format!(
                "MockVideoSource: unreadable parameters for {}",
                path.display()
            )));
        }
        self.videos
            .borrow()
            .get(path)
            .map(|video| video.params)
            .ok_or_else(|| {
                CoreError::VideoInfoError(format!(
                    "MockVideoSource: no video registered for {}",
                    path.display()
                ))
            })
    }

    fn open(&self, path: &Path) -> CoreResult<Self::Reader> {
        log::info!("MockVideoSource::open called for: {}", path.display());
        self.opened.borrow_mut().push(path.to_path_buf());
        let frames = self
            .videos
            .borrow()
            .get(path)
            .map(|video| video.frames.clone())
            .ok_or_else(|| {
                CoreError::FrameDecode(format!(
                    "MockVideoSource: no video registered for {}",
                    path.display()
                ))
            })?;
        Ok(MockFrameReader::new(frames).with_release_counter(Rc::clone(&self.released)))
    }
}

// ============================================================================
// MARKER DETECTION
// ============================================================================

/// Detector reporting as many markers as the frame's top-left pixel says.
#[derive(Clone, Default)]
pub struct MockMarkerDetector {
    calls: Rc<Cell<usize>>,
    mismatched_ids: bool,
}

impl MockMarkerDetector {
    pub fn new() -> Self {
        Default::default()
    }

    /// Makes every detection return one id fewer than corner sets.
    pub fn with_mismatched_ids(mut self) -> Self {
        self.mismatched_ids = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.get()
    }
}

impl MarkerDetector for MockMarkerDetector {
    fn detect(&self, frame: &GrayImage) -> CoreResult<MarkerDetections> {
        self.calls.set(self.calls.get() + 1);
        let markers = frame.get_pixel(0, 0).0[0] as usize;
        let y = frame.get_pixel(1, 0).0[0] as f32 * 10.0;
        let corners = (0..markers)
            .map(|i| {
                let x = i as f32 * 10.0;
                [[x, y], [x + 8.0, y], [x + 8.0, y + 8.0], [x, y + 8.0]]
            })
            .collect();
        let id_count = if self.mismatched_ids { markers.saturating_sub(1) } else { markers };
        Ok(MarkerDetections {
            corners,
            ids: (0..id_count as i32).collect(),
        })
    }
}

// ============================================================================
// CALIBRATION
// ============================================================================

/// What the mock calibrator saw on one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationCall {
    pub marker_counts: Vec<u32>,
    pub corner_count: usize,
    pub corners: Vec<MarkerCorners>,
    pub image_size: (u32, u32),
}

/// Calibrator returning a fixed fit, or failing on demand.
#[derive(Clone)]
pub struct MockCalibrator {
    calls: Rc<RefCell<Vec<CalibrationCall>>>,
    error: f64,
    fail_message: Option<String>,
}

impl Default for MockCalibrator {
    fn default() -> Self {
        Self {
            calls: Rc::default(),
            error: 0.42,
            fail_message: None,
        }
    }
}

impl MockCalibrator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Makes every call fail like a degenerate-input solver error.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_message: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<CalibrationCall> {
        self.calls.borrow().clone()
    }
}

impl CameraCalibrator for MockCalibrator {
    fn calibrate(
        &self,
        detections: &FlattenedDetections,
        _board: &BoardDefinition,
        image_size: (u32, u32),
        initial: &CameraModel,
    ) -> CoreResult<CalibrationFit> {
        self.calls.borrow_mut().push(CalibrationCall {
            marker_counts: detections.marker_counts.clone(),
            corner_count: detections.corners.len(),
            corners: detections.corners.clone(),
            image_size,
        });
        if let Some(message) = &self.fail_message {
            return Err(CoreError::Calibration(message.clone()));
        }
        let (width, height) = image_size;
        let mut model = initial.clone();
        model.camera_matrix[0][0] = width as f64;
        model.camera_matrix[1][1] = width as f64;
        model.camera_matrix[0][2] = width as f64 / 2.0;
        model.camera_matrix[1][2] = height as f64 / 2.0;
        Ok(CalibrationFit {
            error: self.error,
            model,
        })
    }
}
