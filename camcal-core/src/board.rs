//! Calibration board geometry and marker detector settings.
//!
//! A [`BoardDefinition`] describes the planar grid of fiducial markers shown to
//! every camera. It is built once per run from the `[board]` table of the
//! pipeline config (or the defaults below) and never changes afterwards.

use serde::{Deserialize, Serialize};

/// Default number of markers along the board's x axis.
pub const DEFAULT_MARKERS_X: u32 = 2;

/// Default number of markers along the board's y axis.
pub const DEFAULT_MARKERS_Y: u32 = 2;

/// Default marker side length, in board units.
pub const DEFAULT_MARKER_LENGTH: f32 = 4.0;

/// Default gap between neighbouring markers, in board units.
pub const DEFAULT_MARKER_SEPARATION: f32 = 1.0;

/// Predefined marker dictionaries supported by the vision backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerDictionary {
    #[default]
    #[serde(rename = "4X4_50")]
    Dict4x4_50,
    #[serde(rename = "4X4_100")]
    Dict4x4_100,
    #[serde(rename = "4X4_250")]
    Dict4x4_250,
    #[serde(rename = "5X5_50")]
    Dict5x5_50,
    #[serde(rename = "5X5_100")]
    Dict5x5_100,
    #[serde(rename = "6X6_50")]
    Dict6x6_50,
    #[serde(rename = "6X6_250")]
    Dict6x6_250,
    #[serde(rename = "7X7_50")]
    Dict7x7_50,
}

impl MarkerDictionary {
    /// Number of distinct marker ids in the dictionary.
    pub fn size(self) -> u32 {
        match self {
            Self::Dict4x4_50 | Self::Dict5x5_50 | Self::Dict6x6_50 | Self::Dict7x7_50 => 50,
            Self::Dict4x4_100 | Self::Dict5x5_100 => 100,
            Self::Dict4x4_250 | Self::Dict6x6_250 => 250,
        }
    }
}

/// Grid board geometry: `markers_x` by `markers_y` square markers with ids
/// assigned row-major starting at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardDefinition {
    pub markers_x: u32,
    pub markers_y: u32,
    pub marker_length: f32,
    pub marker_separation: f32,
    pub dictionary: MarkerDictionary,
}

impl Default for BoardDefinition {
    fn default() -> Self {
        Self {
            markers_x: DEFAULT_MARKERS_X,
            markers_y: DEFAULT_MARKERS_Y,
            marker_length: DEFAULT_MARKER_LENGTH,
            marker_separation: DEFAULT_MARKER_SEPARATION,
            dictionary: MarkerDictionary::default(),
        }
    }
}

impl BoardDefinition {
    /// Total number of markers printed on the board.
    pub fn marker_count(&self) -> u32 {
        self.markers_x * self.markers_y
    }

    /// Checks the geometry for values no backend can work with.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.markers_x == 0 || self.markers_y == 0 {
            return Err(format!(
                "board must have at least one marker per axis (got {}x{})",
                self.markers_x, self.markers_y
            ));
        }
        if !(self.marker_length > 0.0) || self.marker_separation < 0.0 {
            return Err(format!(
                "invalid board spacing: marker_length={}, marker_separation={}",
                self.marker_length, self.marker_separation
            ));
        }
        if self.marker_count() > self.dictionary.size() {
            return Err(format!(
                "board needs {} markers but the dictionary only has {}",
                self.marker_count(),
                self.dictionary.size()
            ));
        }
        Ok(())
    }
}

/// Corner refinement strategies understood by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerRefinement {
    None,
    Subpixel,
    Contour,
}

/// Marker detector tuning.
///
/// The adaptive-threshold windows are large because calibration boards fill a
/// big part of the frame. Rejected-candidate refinement against the board
/// layout always runs.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub adaptive_thresh_win_size_min: i32,
    pub adaptive_thresh_win_size_max: i32,
    pub adaptive_thresh_win_size_step: i32,
    pub adaptive_thresh_constant: f64,
    pub corner_refinement: CornerRefinement,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            adaptive_thresh_win_size_min: 100,
            adaptive_thresh_win_size_max: 700,
            adaptive_thresh_win_size_step: 50,
            adaptive_thresh_constant: 5.0,
            corner_refinement: CornerRefinement::Contour,
        }
    }
}
