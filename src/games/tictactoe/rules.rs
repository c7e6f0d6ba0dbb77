//! Win/draw evaluation.

use super::types::{Board, Mark, Square, Verdict};

/// The eight winning lines: three rows, three columns, two diagonals.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Evaluates a board.
///
/// Returns `Some(Verdict::Win(mark))` when any line holds three equal
/// non-empty cells, `Some(Verdict::Draw)` when the board is full with no
/// such line, and `None` while the game is undecided.
pub fn evaluate(board: &Board) -> Option<Verdict> {
    if let Some(mark) = winning_mark(board) {
        return Some(Verdict::Win(mark));
    }
    if board.is_full() {
        return Some(Verdict::Draw);
    }
    None
}

/// Returns the mark holding a completed line, if any.
pub fn winning_mark(board: &Board) -> Option<Mark> {
    for [a, b, c] in LINES {
        if let Some(Square::Taken(mark)) = board.get(a) {
            if board.get(b) == Some(Square::Taken(mark)) && board.get(c) == Some(Square::Taken(mark))
            {
                return Some(mark);
            }
        }
    }
    None
}
