//! Tic-tac-toe domain: board types, win/draw evaluation, move selection.

mod ai;
mod rules;
mod types;

pub use ai::MoveSelector;
pub use rules::{evaluate, winning_mark};
pub use types::{Board, Mark, Square, Verdict};
