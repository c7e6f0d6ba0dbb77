//! Tests for the adversarial move selector.

use rand::SeedableRng;
use rand::rngs::StdRng;
use triline::{Board, Mark, MoveSelector, Square, Verdict, evaluate};

fn board_of(marks: &[(usize, Mark)]) -> Board {
    let mut board = Board::new();
    for (pos, mark) in marks {
        board.set(*pos, Square::Taken(*mark)).expect("valid position");
    }
    board
}

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

#[test]
fn full_board_yields_no_move() {
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
    let selector = MoveSelector::perfect();
    assert_eq!(selector.select(&mut rng(), &board, Mark::X), None);
}

#[test]
fn callers_board_is_never_mutated() {
    let board = board_of(&[(0, Mark::X), (4, Mark::O)]);
    let snapshot = board.clone();
    let selector = MoveSelector::perfect();
    selector.select(&mut rng(), &board, Mark::X);
    assert_eq!(board, snapshot);
}

#[test]
fn takes_an_immediate_win() {
    // X holds 0 and 1; cell 2 completes the top row.
    let board = board_of(&[(0, Mark::X), (1, Mark::X), (4, Mark::O), (5, Mark::O)]);
    let selector = MoveSelector::perfect();
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        assert_eq!(selector.select(&mut rng, &board, Mark::X), Some(2));
    }
}

#[test]
fn prefers_own_win_over_blocking() {
    // O threatens the left column at 6, but X at 7 wins the center column
    // outright; the selector must take its own win.
    let board = board_of(&[(0, Mark::O), (3, Mark::O), (1, Mark::X), (4, Mark::X)]);
    let selector = MoveSelector::perfect();
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        assert_eq!(selector.select(&mut rng, &board, Mark::X), Some(7));
    }
}

#[test]
fn blocks_when_no_own_win_exists() {
    // O threatens the top row at 2; X must block.
    let board = board_of(&[(0, Mark::O), (1, Mark::O), (4, Mark::X)]);
    let selector = MoveSelector::perfect();
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        assert_eq!(selector.select(&mut rng, &board, Mark::X), Some(2));
    }
}

/// Plays the selector against every possible opponent line of play and
/// asserts the opponent never wins.
fn assert_never_loses(selector_mark: Mark) {
    let selector = MoveSelector::perfect();
    let mut rng = rng();
    let mut board = Board::new();
    explore(&selector, &mut rng, &mut board, Mark::X, selector_mark);
}

fn explore(
    selector: &MoveSelector,
    rng: &mut StdRng,
    board: &mut Board,
    to_move: Mark,
    selector_mark: Mark,
) {
    match evaluate(board) {
        Some(Verdict::Win(winner)) => {
            assert_eq!(
                winner, selector_mark,
                "opponent won against optimal play:\n{}",
                board.display()
            );
            return;
        }
        Some(Verdict::Draw) => return,
        None => {}
    }

    if to_move == selector_mark {
        let index = selector
            .select(rng, board, selector_mark)
            .expect("undecided board has a move");
        board
            .set(index, Square::Taken(selector_mark))
            .expect("selected cell is legal");
        explore(selector, rng, board, to_move.opponent(), selector_mark);
        board.set(index, Square::Empty).expect("revert");
    } else {
        for index in 0..9 {
            if board.is_empty(index) {
                board.set(index, Square::Taken(to_move)).expect("empty cell");
                explore(selector, rng, board, to_move.opponent(), selector_mark);
                board.set(index, Square::Empty).expect("revert");
            }
        }
    }
}

#[test]
fn perfect_play_as_x_never_loses() {
    assert_never_loses(Mark::X);
}

#[test]
fn perfect_play_as_o_never_loses() {
    assert_never_loses(Mark::O);
}
