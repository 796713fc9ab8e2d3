//! Flattens selected board observations into the calibration call's layout.
//!
//! The solver takes all marker corners and ids as two flat lists plus one
//! marker count per board, which it uses to split the lists back into boards.

use crate::external::MarkerCorners;
use crate::processing::detection::BoardObservation;

/// Concatenated detections of the selected boards.
///
/// Invariant: `marker_counts` has one entry per board and sums to
/// `corners.len()`, which equals `ids.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedDetections {
    pub corners: Vec<MarkerCorners>,
    pub ids: Vec<i32>,
    pub marker_counts: Vec<u32>,
}

impl FlattenedDetections {
    /// Flattens observations in order.
    pub fn from_observations(observations: Vec<BoardObservation>) -> Self {
        let total: usize = observations.iter().map(BoardObservation::marker_count).sum();
        let mut flat = Self {
            corners: Vec::with_capacity(total),
            ids: Vec::with_capacity(total),
            marker_counts: Vec::with_capacity(observations.len()),
        };
        for observation in observations {
            flat.marker_counts.push(observation.marker_count() as u32);
            let (corners, ids) = observation.into_parts();
            flat.corners.extend(corners);
            flat.ids.extend(ids);
        }
        flat
    }

    /// Total number of markers across all boards.
    pub fn marker_total(&self) -> usize {
        self.ids.len()
    }

    pub fn board_count(&self) -> usize {
        self.marker_counts.len()
    }

    /// Boards on which every marker of the board was detected.
    pub fn complete_boards(&self, markers_per_board: u32) -> usize {
        self.marker_counts
            .iter()
            .filter(|count| **count == markers_per_board)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.marker_counts.is_empty()
    }
}
