// ============================================================================
// camcal-core/src/external/opencv_backend.rs
// ============================================================================
//
// OPENCV BACKEND: ArUco Marker Detection and Board Calibration
//
// Implements MarkerDetector and CameraCalibrator on top of OpenCV's objdetect
// ArUco detector and aruco::calibrate_camera_aruco. Compiled only with the
// "opencv" feature, which needs a system OpenCV (4.7 or newer) at build time.
//
// KEY COMPONENTS:
// - OpencvVision: detector and grid board built once per run
// - conversions between GrayImage/arrays and OpenCV Mat/Vector types

use super::{
    CalibrationFit, CameraCalibrator, CameraModel, MarkerCorners, MarkerDetections, MarkerDetector,
};
use crate::board::{BoardDefinition, CornerRefinement, DetectorSettings, MarkerDictionary};
use crate::error::{CoreError, CoreResult};
use crate::processing::reformat::FlattenedDetections;

use image::GrayImage;
use opencv::aruco;
use opencv::core::{
    Mat, Point2f, Ptr, Size, TermCriteria, TermCriteria_COUNT, TermCriteria_EPS, Vector, no_array,
};
use opencv::objdetect::{
    self, ArucoDetector, CornerRefineMethod, DetectorParameters, GridBoard,
    PredefinedDictionaryType, RefineParameters,
};
use opencv::prelude::*;

const SOLVER_MAX_ITERATIONS: i32 = 30;
const SOLVER_EPSILON: f64 = f64::EPSILON;

fn detection_error(e: opencv::Error) -> CoreError {
    CoreError::Detection(e.to_string())
}

fn calibration_error(e: opencv::Error) -> CoreError {
    CoreError::Calibration(e.to_string())
}

fn dictionary_type(dictionary: MarkerDictionary) -> PredefinedDictionaryType {
    match dictionary {
        MarkerDictionary::Dict4x4_50 => PredefinedDictionaryType::DICT_4X4_50,
        MarkerDictionary::Dict4x4_100 => PredefinedDictionaryType::DICT_4X4_100,
        MarkerDictionary::Dict4x4_250 => PredefinedDictionaryType::DICT_4X4_250,
        MarkerDictionary::Dict5x5_50 => PredefinedDictionaryType::DICT_5X5_50,
        MarkerDictionary::Dict5x5_100 => PredefinedDictionaryType::DICT_5X5_100,
        MarkerDictionary::Dict6x6_50 => PredefinedDictionaryType::DICT_6X6_50,
        MarkerDictionary::Dict6x6_250 => PredefinedDictionaryType::DICT_6X6_250,
        MarkerDictionary::Dict7x7_50 => PredefinedDictionaryType::DICT_7X7_50,
    }
}

fn refine_method(refinement: CornerRefinement) -> CornerRefineMethod {
    match refinement {
        CornerRefinement::None => CornerRefineMethod::CORNER_REFINE_NONE,
        CornerRefinement::Subpixel => CornerRefineMethod::CORNER_REFINE_SUBPIX,
        CornerRefinement::Contour => CornerRefineMethod::CORNER_REFINE_CONTOUR,
    }
}

/// ArUco detector and calibrator for one board layout.
pub struct OpencvVision {
    detector: ArucoDetector,
    board: Ptr<objdetect::Board>,
}

impl OpencvVision {
    pub fn new(board: &BoardDefinition, settings: &DetectorSettings) -> CoreResult<Self> {
        Self::build(board, settings).map_err(|e| {
            CoreError::BackendUnavailable(format!("failed to set up OpenCV ArUco detector: {e}"))
        })
    }

    fn build(board: &BoardDefinition, settings: &DetectorSettings) -> opencv::Result<Self> {
        let dictionary = objdetect::get_predefined_dictionary(dictionary_type(board.dictionary))?;

        let mut params = DetectorParameters::default()?;
        params.set_adaptive_thresh_win_size_min(settings.adaptive_thresh_win_size_min);
        params.set_adaptive_thresh_win_size_max(settings.adaptive_thresh_win_size_max);
        params.set_adaptive_thresh_win_size_step(settings.adaptive_thresh_win_size_step);
        params.set_adaptive_thresh_constant(settings.adaptive_thresh_constant);
        params.set_corner_refinement_method(refine_method(settings.corner_refinement) as i32);

        let detector = ArucoDetector::new(&dictionary, &params, RefineParameters::new_def()?)?;

        // Ids are assigned row-major from zero
        let ids: Vector<i32> = (0..board.marker_count() as i32).collect();
        let grid = GridBoard::new(
            Size::new(board.markers_x as i32, board.markers_y as i32),
            board.marker_length,
            board.marker_separation,
            &dictionary,
            &ids,
        )?;
        let board: Ptr<objdetect::Board> = Ptr::new(grid).into();

        Ok(Self { detector, board })
    }

    fn detect_mat(&self, frame: &GrayImage) -> opencv::Result<MarkerDetections> {
        let image = Mat::new_rows_cols_with_data(
            frame.height() as i32,
            frame.width() as i32,
            frame.as_raw().as_slice(),
        )?
        .try_clone()?;

        let mut corners = Vector::<Vector<Point2f>>::new();
        let mut ids = Vector::<i32>::new();
        let mut rejected = Vector::<Vector<Point2f>>::new();
        self.detector
            .detect_markers(&image, &mut corners, &mut ids, &mut rejected)?;

        // Recover rejected candidates that fit the board layout
        self.detector.refine_detected_markers(
            &image,
            &self.board,
            &mut corners,
            &mut ids,
            &mut rejected,
            &no_array(),
            &no_array(),
            &mut no_array(),
        )?;

        let corners = corners
            .iter()
            .map(|marker| {
                let mut quad: MarkerCorners = [[0.0; 2]; 4];
                for (slot, point) in quad.iter_mut().zip(marker.iter()) {
                    *slot = [point.x, point.y];
                }
                quad
            })
            .collect();
        Ok(MarkerDetections {
            corners,
            ids: ids.to_vec(),
        })
    }

    fn calibrate_mat(
        &self,
        detections: &FlattenedDetections,
        image_size: (u32, u32),
        initial: &CameraModel,
    ) -> opencv::Result<CalibrationFit> {
        let corners: Vector<Vector<Point2f>> = detections
            .corners
            .iter()
            .map(|quad| quad.iter().map(|[x, y]| Point2f::new(*x, *y)).collect())
            .collect();
        let ids = Vector::<i32>::from_slice(&detections.ids);
        let counter: Vector<i32> = detections.marker_counts.iter().map(|c| *c as i32).collect();

        let mut camera_matrix = Mat::from_slice_2d(&initial.camera_matrix)?;
        let mut dist_coeffs = Mat::from_slice(&initial.dist_coeffs)?.try_clone()?;
        let mut rvecs = Vector::<Mat>::new();
        let mut tvecs = Vector::<Mat>::new();

        let error = aruco::calibrate_camera_aruco(
            &corners,
            &ids,
            &counter,
            &self.board,
            Size::new(image_size.0 as i32, image_size.1 as i32),
            &mut camera_matrix,
            &mut dist_coeffs,
            &mut rvecs,
            &mut tvecs,
            0,
            TermCriteria::new(
                TermCriteria_COUNT + TermCriteria_EPS,
                SOLVER_MAX_ITERATIONS,
                SOLVER_EPSILON,
            )?,
        )?;

        let mut matrix = [[0.0; 3]; 3];
        for (r, row) in matrix.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = *camera_matrix.at_2d::<f64>(r as i32, c as i32)?;
            }
        }
        let dist_coeffs = (0..dist_coeffs.total() as i32)
            .map(|i| dist_coeffs.at::<f64>(i).copied())
            .collect::<opencv::Result<Vec<f64>>>()?;

        Ok(CalibrationFit {
            error,
            model: CameraModel {
                camera_matrix: matrix,
                dist_coeffs,
            },
        })
    }
}

impl MarkerDetector for OpencvVision {
    fn detect(&self, frame: &GrayImage) -> CoreResult<MarkerDetections> {
        self.detect_mat(frame).map_err(detection_error)
    }
}

impl CameraCalibrator for OpencvVision {
    fn calibrate(
        &self,
        detections: &FlattenedDetections,
        _board: &BoardDefinition,
        image_size: (u32, u32),
        initial: &CameraModel,
    ) -> CoreResult<CalibrationFit> {
        log::debug!(
            "calibrate_camera_aruco: {} markers on {} boards, image {}x{}",
            detections.marker_total(),
            detections.board_count(),
            image_size.0,
            image_size.1
        );
        self.calibrate_mat(detections, image_size, initial)
            .map_err(calibration_error)
    }
}
