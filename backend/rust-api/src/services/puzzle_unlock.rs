//! Puzzle visibility, status and dashboard placement.

use std::collections::{HashMap, HashSet};
use std::f64::consts::{FRAC_PI_2, PI};

use crate::models::{
    attempt::{AttemptRecord, Correctness},
    puzzle::{LayoutRole, Puzzle, PuzzleStatus, PuzzleViewState},
};

pub const TUTORIAL_PUZZLE_ID: i64 = 0;
pub const CAPSTONE_PUZZLE_ID: i64 = 8;
pub const BASE_PUZZLE_COUNT: usize = 7;

pub fn is_base_puzzle(puzzle_id: i64) -> bool {
    (1..=BASE_PUZZLE_COUNT as i64).contains(&puzzle_id)
}

/// Newest attempt per puzzle. The store keeps one row per (user, puzzle),
/// but a duplicate must never count twice.
fn latest_by_puzzle(attempts: &[AttemptRecord]) -> HashMap<i64, &AttemptRecord> {
    let mut latest: HashMap<i64, &AttemptRecord> = HashMap::new();
    for attempt in attempts {
        latest
            .entry(attempt.puzzle_id)
            .and_modify(|existing| {
                if attempt.submitted_at > existing.submitted_at {
                    *existing = attempt;
                }
            })
            .or_insert(attempt);
    }
    latest
}

fn base_solved_in(latest: &HashMap<i64, &AttemptRecord>) -> bool {
    (1..=BASE_PUZZLE_COUNT as i64).all(|id| {
        latest
            .get(&id)
            .is_some_and(|attempt| attempt.correctness == Correctness::Correct)
    })
}

/// True when the newest attempt on every base puzzle is correct.
pub fn all_base_solved(attempts: &[AttemptRecord]) -> bool {
    base_solved_in(&latest_by_puzzle(attempts))
}

pub fn is_visible(puzzle_id: i64, base_solved: bool) -> bool {
    match puzzle_id {
        TUTORIAL_PUZZLE_ID => true,
        CAPSTONE_PUZZLE_ID => base_solved,
        id => is_base_puzzle(id),
    }
}

pub fn status_for(attempt: Option<&AttemptRecord>) -> PuzzleStatus {
    match attempt.map(|attempt| attempt.correctness) {
        None => PuzzleStatus::Locked,
        Some(Correctness::Unknown) => PuzzleStatus::Attempted,
        Some(Correctness::Incorrect) => PuzzleStatus::Incorrect,
        Some(Correctness::Correct) => PuzzleStatus::Correct,
    }
}

/// Angle (radians) of ring slot `index` out of `count`, starting at the top
/// and proceeding clockwise in screen coordinates.
pub fn ring_angle(index: usize, count: usize) -> f64 {
    if count == 0 {
        return -FRAC_PI_2;
    }
    index as f64 * 2.0 * PI / count as f64 - FRAC_PI_2
}

/// Computes the view state of every visible puzzle, ordered by id.
///
/// Hidden puzzles (the capstone before completion, reserved ids) are left
/// out. Attempts for puzzles outside the catalog are ignored.
pub fn resolve(catalog: &[Puzzle], attempts: &[AttemptRecord]) -> Vec<PuzzleViewState> {
    let by_puzzle = latest_by_puzzle(attempts);
    let base_solved = base_solved_in(&by_puzzle);

    let mut seen = HashSet::new();
    let mut visible: Vec<&Puzzle> = catalog
        .iter()
        .filter(|puzzle| is_visible(puzzle.id, base_solved))
        .filter(|puzzle| seen.insert(puzzle.id))
        .collect();
    visible.sort_by_key(|puzzle| puzzle.id);

    let ring_count = visible
        .iter()
        .filter(|puzzle| is_base_puzzle(puzzle.id))
        .count();

    let mut ring_index = 0;
    visible
        .into_iter()
        .map(|puzzle| {
            let layout = match puzzle.id {
                TUTORIAL_PUZZLE_ID => LayoutRole::Tutorial,
                CAPSTONE_PUZZLE_ID => LayoutRole::Capstone,
                _ => {
                    let index = ring_index;
                    ring_index += 1;
                    LayoutRole::Ring {
                        index,
                        angle: ring_angle(index, ring_count),
                    }
                }
            };

            PuzzleViewState {
                puzzle: puzzle.clone(),
                status: status_for(by_puzzle.get(&puzzle.id).copied()),
                visible: true,
                is_capstone: puzzle.id == CAPSTONE_PUZZLE_ID,
                layout,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn puzzle(id: i64) -> Puzzle {
        Puzzle {
            id,
            name: format!("Puzzle {}", id),
            description_html: String::new(),
            image_url: None,
            modal_image_url: None,
            is_active: true,
        }
    }

    fn catalog() -> Vec<Puzzle> {
        (0..=8).map(puzzle).collect()
    }

    fn attempt(puzzle_id: i64, correctness: Correctness) -> AttemptRecord {
        AttemptRecord {
            id: puzzle_id + 100,
            user_id: "user-1".to_string(),
            puzzle_id,
            answer: "guess".to_string(),
            correctness,
            submitted_at: Utc::now(),
        }
    }

    fn all_correct() -> Vec<AttemptRecord> {
        (1..=7)
            .map(|id| attempt(id, Correctness::Correct))
            .collect()
    }

    fn ids(states: &[PuzzleViewState]) -> Vec<i64> {
        states.iter().map(|state| state.puzzle.id).collect()
    }

    #[test]
    fn no_attempts_hides_capstone_and_locks_everything() {
        let states = resolve(&catalog(), &[]);
        assert_eq!(ids(&states), vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(states
            .iter()
            .all(|state| state.status == PuzzleStatus::Locked));
        assert!(states.iter().all(|state| state.visible));
    }

    #[test]
    fn seven_correct_unlocks_capstone_once() {
        let states = resolve(&catalog(), &all_correct());
        let capstones: Vec<_> = states.iter().filter(|state| state.is_capstone).collect();
        assert_eq!(capstones.len(), 1);
        assert_eq!(capstones[0].puzzle.id, CAPSTONE_PUZZLE_ID);
        assert_eq!(capstones[0].layout, LayoutRole::Capstone);
        assert_eq!(capstones[0].status, PuzzleStatus::Locked);
    }

    #[test]
    fn predicate_requires_every_base_puzzle_correct() {
        assert!(all_base_solved(&all_correct()));

        for missing in 1..=7 {
            let attempts: Vec<_> = all_correct()
                .into_iter()
                .filter(|attempt| attempt.puzzle_id != missing)
                .collect();
            assert!(!all_base_solved(&attempts), "missing {}", missing);
        }

        let mut pending = all_correct();
        pending[3].correctness = Correctness::Unknown;
        assert!(!all_base_solved(&pending));

        let mut wrong = all_correct();
        wrong[6].correctness = Correctness::Incorrect;
        assert!(!all_base_solved(&wrong));
    }

    #[test]
    fn capstone_and_tutorial_attempts_do_not_affect_predicate() {
        let mut attempts = all_correct();
        attempts.push(attempt(CAPSTONE_PUZZLE_ID, Correctness::Correct));
        attempts.push(attempt(TUTORIAL_PUZZLE_ID, Correctness::Incorrect));
        assert!(all_base_solved(&attempts));
    }

    #[test]
    fn duplicate_base_records_do_not_count_as_coverage() {
        let mut attempts: Vec<_> = (1..=6)
            .map(|id| attempt(id, Correctness::Correct))
            .collect();
        attempts.push(attempt(1, Correctness::Correct));
        assert!(!all_base_solved(&attempts));
    }

    #[test]
    fn newest_duplicate_decides_the_predicate() {
        let mut attempts = all_correct();
        let mut stale = attempt(4, Correctness::Incorrect);
        stale.submitted_at = Utc::now() - Duration::hours(2);
        attempts.push(stale);
        assert!(all_base_solved(&attempts));

        let states = resolve(&catalog(), &attempts);
        assert!(states.iter().any(|state| state.is_capstone));
        assert!(states
            .iter()
            .filter(|state| is_base_puzzle(state.puzzle.id))
            .all(|state| state.status == PuzzleStatus::Correct));

        let mut regressed = all_correct();
        let mut newer = attempt(4, Correctness::Unknown);
        newer.submitted_at = Utc::now() + Duration::seconds(5);
        regressed.push(newer);
        assert!(!all_base_solved(&regressed));
        assert!(!resolve(&catalog(), &regressed)
            .iter()
            .any(|state| state.is_capstone));
    }

    #[test]
    fn status_follows_tri_state_correctness() {
        let attempts = vec![
            attempt(1, Correctness::Unknown),
            attempt(2, Correctness::Incorrect),
            attempt(3, Correctness::Correct),
        ];
        let states = resolve(&catalog(), &attempts);
        let status = |id: i64| {
            states
                .iter()
                .find(|state| state.puzzle.id == id)
                .map(|state| state.status)
        };
        assert_eq!(status(1), Some(PuzzleStatus::Attempted));
        assert_eq!(status(2), Some(PuzzleStatus::Incorrect));
        assert_eq!(status(3), Some(PuzzleStatus::Correct));
        assert_eq!(status(4), Some(PuzzleStatus::Locked));
    }

    #[test]
    fn ring_starts_at_top_and_steps_evenly() {
        let states = resolve(&catalog(), &[]);
        let angles: Vec<f64> = states
            .iter()
            .filter_map(|state| match state.layout {
                LayoutRole::Ring { angle, .. } => Some(angle),
                _ => None,
            })
            .collect();

        assert_eq!(angles.len(), 7);
        assert!((angles[0] + FRAC_PI_2).abs() < 1e-12);
        let step = 2.0 * PI / 7.0;
        for pair in angles.windows(2) {
            assert!((pair[1] - pair[0] - step).abs() < 1e-12);
        }
    }

    #[test]
    fn tutorial_sits_outside_the_ring() {
        let states = resolve(&catalog(), &[]);
        assert_eq!(states[0].puzzle.id, TUTORIAL_PUZZLE_ID);
        assert_eq!(states[0].layout, LayoutRole::Tutorial);
        assert!(!states[0].is_capstone);
    }

    #[test]
    fn reserved_ids_are_never_visible() {
        let mut puzzles = catalog();
        puzzles.push(puzzle(9));
        puzzles.push(puzzle(-1));
        let states = resolve(&puzzles, &all_correct());
        assert_eq!(ids(&states), vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn catalog_order_and_duplicates_are_normalized() {
        let mut puzzles: Vec<Puzzle> = catalog().into_iter().rev().collect();
        puzzles.push(puzzle(3));
        let states = resolve(&puzzles, &[]);
        assert_eq!(ids(&states), vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn latest_duplicate_attempt_wins() {
        let mut older = attempt(2, Correctness::Incorrect);
        older.submitted_at = Utc::now() - Duration::hours(1);
        let newer = attempt(2, Correctness::Correct);
        let states = resolve(&catalog(), &[older, newer]);
        assert_eq!(states[2].status, PuzzleStatus::Correct);
    }

    #[test]
    fn unknown_puzzle_attempts_are_ignored() {
        let states = resolve(&catalog(), &[attempt(42, Correctness::Correct)]);
        assert!(states
            .iter()
            .all(|state| state.status == PuzzleStatus::Locked));
    }
}
