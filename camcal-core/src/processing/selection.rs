//! Board subset selection.
//!
//! Calibration cost grows with the number of boards, so each camera is fitted
//! on at most `max_boards` frames, preferring the frames that saw the most
//! markers. This bounds the solver's work; it does not guarantee that the kept
//! boards cover the whole image.

use crate::config::TieBreak;
use crate::processing::detection::BoardObservation;

use rand::Rng;
use std::cmp::Reverse;

/// Upper bound (exclusive) of the noise added to marker counts. Staying below
/// one keeps frames with different counts in count order.
const TIE_BREAK_JITTER: f64 = 0.5;

/// Keeps the `max_boards` observations with the most markers.
///
/// Returns exactly `min(observations.len(), max_boards)` observations. With
/// [`TieBreak::Random`] equal counts are ordered by uniform noise drawn from
/// `rng`; with [`TieBreak::InputOrder`] they keep their input order. Output
/// order is by descending (perturbed) count.
pub fn select_boards<R: Rng + ?Sized>(
    observations: Vec<BoardObservation>,
    max_boards: usize,
    tie_break: TieBreak,
    rng: &mut R,
) -> Vec<BoardObservation> {
    let total = observations.len();
    let selected = match tie_break {
        TieBreak::Random => {
            let mut keyed: Vec<(f64, BoardObservation)> = observations
                .into_iter()
                .map(|obs| {
                    let key = obs.marker_count() as f64 + rng.gen_range(0.0..TIE_BREAK_JITTER);
                    (key, obs)
                })
                .collect();
            keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
            keyed.truncate(max_boards);
            keyed.into_iter().map(|(_, obs)| obs).collect::<Vec<_>>()
        }
        TieBreak::InputOrder => {
            let mut ordered = observations;
            ordered.sort_by_key(|obs| Reverse(obs.marker_count()));
            ordered.truncate(max_boards);
            ordered
        }
    };

    if selected.len() < total {
        log::debug!("Kept {} of {} boards", selected.len(), total);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MarkerDetections;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Observation with `markers` markers; the first id tags it for identity.
    fn observation(markers: usize, tag: i32) -> BoardObservation {
        let mut ids: Vec<i32> = (0..markers as i32).collect();
        ids[0] = tag;
        BoardObservation::from_detections(MarkerDetections {
            corners: vec![[[tag as f32; 2]; 4]; markers],
            ids,
        })
        .unwrap()
        .unwrap()
    }

    fn tags(observations: &[BoardObservation]) -> Vec<i32> {
        observations.iter().map(|o| o.ids()[0]).collect()
    }

    #[test]
    fn test_returns_min_of_input_and_cap() {
        let mut rng = StdRng::seed_from_u64(1);
        for total in [0usize, 1, 5, 85, 86, 200] {
            for cap in [1usize, 3, 85] {
                let input: Vec<_> = (0..total).map(|i| observation(2 + i % 3, i as i32)).collect();
                let out = select_boards(input, cap, TieBreak::Random, &mut rng);
                assert_eq!(out.len(), total.min(cap), "total={total} cap={cap}");
            }
        }
    }

    #[test]
    fn test_under_cap_keeps_every_observation() {
        let input: Vec<_> = (0..10).map(|i| observation(2 + i % 4, i as i32)).collect();
        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut out = tags(&select_boards(input.clone(), 85, TieBreak::Random, &mut rng));
            out.sort_unstable();
            assert_eq!(out, (0..10).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_prefers_frames_with_more_markers() {
        let input = vec![
            observation(2, 0),
            observation(4, 1),
            observation(3, 2),
            observation(4, 3),
            observation(2, 4),
        ];
        let mut rng = StdRng::seed_from_u64(9);
        let out = select_boards(input, 3, TieBreak::Random, &mut rng);
        let counts: Vec<usize> = out.iter().map(BoardObservation::marker_count).collect();
        assert_eq!(counts, vec![4, 4, 3]);
    }

    #[test]
    fn test_random_ties_do_not_always_favour_early_frames() {
        let input: Vec<_> = (0..20).map(|i| observation(3, i)).collect();
        let firsts: std::collections::HashSet<i32> = (0..20)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                tags(&select_boards(input.clone(), 1, TieBreak::Random, &mut rng))[0]
            })
            .collect();
        assert!(firsts.len() > 1, "tie-break always picked {:?}", firsts);
    }

    #[test]
    fn test_same_seed_gives_same_selection() {
        let input: Vec<_> = (0..30).map(|i| observation(2 + (i % 2) as usize, i)).collect();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(
            tags(&select_boards(input.clone(), 7, TieBreak::Random, &mut a)),
            tags(&select_boards(input, 7, TieBreak::Random, &mut b))
        );
    }

    #[test]
    fn test_input_order_policy_is_stable() {
        let input = vec![
            observation(2, 0),
            observation(3, 1),
            observation(2, 2),
            observation(3, 3),
        ];
        let mut rng = StdRng::seed_from_u64(0);
        let out = select_boards(input, 3, TieBreak::InputOrder, &mut rng);
        assert_eq!(tags(&out), vec![1, 3, 0]);
    }
}
