//! Adversarial move selection.
//!
//! Full-depth minimax over the 9-cell board with a configurable blunder
//! branch that plays a uniformly random legal cell instead, so a human
//! opponent gets games it can win.

use rand::Rng;
use tracing::{debug, instrument};

use super::rules::evaluate;
use super::types::{Board, Mark, Square, Verdict};

/// Picks moves for the machine opponent.
#[derive(Debug, Clone, Copy)]
pub struct MoveSelector {
    blunder_probability: f64,
}

impl MoveSelector {
    /// Creates a selector that blunders with the given probability.
    ///
    /// The probability must lie in `[0.0, 1.0]`; out-of-range values are
    /// clamped.
    pub fn new(blunder_probability: f64) -> Self {
        Self {
            blunder_probability: blunder_probability.clamp(0.0, 1.0),
        }
    }

    /// Creates a selector that always plays optimally.
    pub fn perfect() -> Self {
        Self::new(0.0)
    }

    /// Selects a cell for `mark` to play, or `None` when the board is full.
    ///
    /// The caller's board is never mutated; exploration runs on a scratch
    /// copy with place-and-revert. Ties between equally scored moves are
    /// broken uniformly at random.
    #[instrument(skip(self, rng, board), fields(mark = %mark))]
    pub fn select<R: Rng>(&self, rng: &mut R, board: &Board, mark: Mark) -> Option<usize> {
        let open = board.open_cells();
        if open.is_empty() {
            return None;
        }

        if self.blunder_probability > 0.0 && rng.random_bool(self.blunder_probability) {
            let pos = open[rng.random_range(0..open.len())];
            debug!(pos, "Playing random cell");
            return Some(pos);
        }

        let mut scratch = board.clone();
        let mut best_score = i32::MIN;
        let mut best_moves: Vec<usize> = Vec::new();

        for pos in open {
            scratch.set(pos, Square::Taken(mark)).unwrap();
            let score = minimax(&mut scratch, 0, false, mark);
            scratch.set(pos, Square::Empty).unwrap();

            if score > best_score {
                best_score = score;
                best_moves.clear();
                best_moves.push(pos);
            } else if score == best_score {
                best_moves.push(pos);
            }
        }

        let pos = best_moves[rng.random_range(0..best_moves.len())];
        debug!(pos, score = best_score, "Selected move");
        Some(pos)
    }
}

impl Default for MoveSelector {
    fn default() -> Self {
        // Reference blunder rate: the opponent plays a random cell 30% of
        // the time.
        Self::new(0.3)
    }
}

/// Scores the board for `mark` after the most recent ply.
///
/// Terminal boards score `10 - depth` for a win by `mark`, `depth - 10`
/// for a win by the opponent, and `0` for a draw, so the search prefers
/// faster wins and slower losses.
fn minimax(board: &mut Board, depth: i32, maximizing: bool, mark: Mark) -> i32 {
    match evaluate(board) {
        Some(Verdict::Win(winner)) if winner == mark => return 10 - depth,
        Some(Verdict::Win(_)) => return depth - 10,
        Some(Verdict::Draw) => return 0,
        None => {}
    }

    let mover = if maximizing { mark } else { mark.opponent() };
    let mut best = if maximizing { i32::MIN } else { i32::MAX };

    for pos in 0..9 {
        if board.is_empty(pos) {
            board.set(pos, Square::Taken(mover)).unwrap();
            let score = minimax(board, depth + 1, !maximizing, mark);
            board.set(pos, Square::Empty).unwrap();
            best = if maximizing {
                best.max(score)
            } else {
                best.min(score)
            };
        }
    }

    best
}
