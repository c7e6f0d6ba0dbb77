//! Tests for win/draw evaluation.

use triline::{Board, Mark, Square, Verdict, evaluate, winning_mark};

/// Builds a board from (position, mark) pairs.
fn board_of(marks: &[(usize, Mark)]) -> Board {
    let mut board = Board::new();
    for (pos, mark) in marks {
        board.set(*pos, Square::Taken(*mark)).expect("valid position");
    }
    board
}

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

#[test]
fn empty_board_is_undecided() {
    assert_eq!(evaluate(&Board::new()), None);
}

#[test]
fn every_line_wins_for_either_mark() {
    for mark in [Mark::X, Mark::O] {
        for line in LINES {
            let board = board_of(&[(line[0], mark), (line[1], mark), (line[2], mark)]);
            assert_eq!(
                evaluate(&board),
                Some(Verdict::Win(mark)),
                "line {line:?} should win for {mark}"
            );
            assert_eq!(winning_mark(&board), Some(mark));
        }
    }
}

#[test]
fn win_detected_regardless_of_other_cells() {
    // X holds the top row; scattered O marks elsewhere must not matter.
    let board = board_of(&[
        (0, Mark::X),
        (1, Mark::X),
        (2, Mark::X),
        (3, Mark::O),
        (4, Mark::O),
        (7, Mark::O),
    ]);
    assert_eq!(evaluate(&board), Some(Verdict::Win(Mark::X)));
}

#[test]
fn full_board_without_line_is_draw() {
    let board = board_of(&[
        (0, Mark::X),
        (1, Mark::O),
        (2, Mark::X),
        (3, Mark::O),
        (4, Mark::X),
        (5, Mark::X),
        (6, Mark::O),
        (7, Mark::X),
        (8, Mark::O),
    ]);
    assert!(board.is_full());
    assert_eq!(evaluate(&board), Some(Verdict::Draw));
}

#[test]
fn partial_board_without_line_is_undecided() {
    let board = board_of(&[(0, Mark::X), (4, Mark::O), (8, Mark::X)]);
    assert_eq!(evaluate(&board), None);
}

#[test]
fn top_row_play_sequence_decides_x() {
    // X plays 0, O plays 4, X plays 1, O plays 5, X plays 2.
    let board = board_of(&[
        (0, Mark::X),
        (4, Mark::O),
        (1, Mark::X),
        (5, Mark::O),
        (2, Mark::X),
    ]);
    assert_eq!(evaluate(&board), Some(Verdict::Win(Mark::X)));
}
