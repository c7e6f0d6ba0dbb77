//! Tests for the local match state machine.

use std::sync::{Arc, Mutex};

use triline::{
    AppConfig, DbError, Identity, LocalMatch, LocalMode, LocalStatus, Mark, OutcomeReport,
    OutcomeSink,
};

/// Sink that keeps every report in memory.
#[derive(Debug, Default)]
struct CountingSink {
    reports: Mutex<Vec<OutcomeReport>>,
}

impl CountingSink {
    fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

impl OutcomeSink for CountingSink {
    fn record(&self, report: &OutcomeReport) -> Result<(), DbError> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// Test config: no machine delay, no blunders.
fn config() -> AppConfig {
    AppConfig::new(":memory:".to_string(), 0.0, 0, Mark::X)
}

#[test]
fn friend_mode_alternates_turns() {
    let mut game = LocalMatch::new(LocalMode::Friend, Mark::X, &config());
    assert_eq!(game.turn(), Mark::X);
    assert!(game.apply_move(0));
    assert_eq!(game.turn(), Mark::O);
    assert!(game.apply_move(4));
    assert_eq!(game.turn(), Mark::X);
}

#[test]
fn taken_cell_is_rejected_without_state_change() {
    let mut game = LocalMatch::new(LocalMode::Friend, Mark::X, &config());
    assert!(game.apply_move(0));
    let turn = game.turn();
    let board = game.board().clone();

    assert!(!game.apply_move(0));
    assert_eq!(game.turn(), turn);
    assert_eq!(game.board(), &board);
}

#[test]
fn out_of_bounds_cell_is_rejected() {
    let mut game = LocalMatch::new(LocalMode::Friend, Mark::X, &config());
    assert!(!game.apply_move(9));
}

#[test]
fn machine_ply_rejects_human_input() {
    let mut game = LocalMatch::new(LocalMode::Machine, Mark::X, &config());
    assert!(game.apply_move(0));
    // Now it is the machine's ply; the human's input must be a no-op.
    let board = game.board().clone();
    assert!(!game.apply_move(1));
    assert_eq!(game.board(), &board);
    assert_eq!(game.turn(), Mark::O);
}

#[test]
fn finished_game_rejects_moves() {
    let mut game = LocalMatch::new(LocalMode::Friend, Mark::X, &config());
    // X takes the top row: X0 O4 X1 O5 X2.
    for cell in [0, 4, 1, 5, 2] {
        assert!(game.apply_move(cell));
    }
    assert_eq!(game.status(), LocalStatus::Finished);
    assert!(!game.apply_move(8));
}

#[tokio::test]
async fn machine_turn_only_acts_on_its_ply() {
    let mut game = LocalMatch::new(LocalMode::Machine, Mark::X, &config()).with_rng_seed(7);
    // Human has not moved yet; the machine must wait.
    assert_eq!(game.machine_turn().await, None);

    assert!(game.apply_move(4));
    let played = game.machine_turn().await;
    assert!(played.is_some());
    assert_eq!(game.turn(), Mark::X);
}

#[tokio::test]
async fn machine_game_records_exactly_once() {
    let sink = Arc::new(CountingSink::default());
    let mut game = LocalMatch::new(LocalMode::Machine, Mark::X, &config())
        .with_recorder(
            Identity::new("user-1".to_string(), "Uma".to_string()),
            sink.clone(),
        )
        .with_rng_seed(3);

    // Drive the game to a finish: the human takes the first open cell,
    // the machine replies optimally.
    while game.status() == LocalStatus::Playing {
        if game.turn() == Mark::X {
            let open = game.board().open_cells();
            assert!(game.apply_move(open[0]));
        } else {
            let _ = game.machine_turn().await;
        }
    }

    assert_eq!(sink.count(), 1);

    // A second finish observation must not double-record.
    assert!(!game.apply_move(0));
    assert_eq!(game.machine_turn().await, None);
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn reset_rearms_recording_and_bumps_generation() {
    let sink = Arc::new(CountingSink::default());
    let mut game = LocalMatch::new(LocalMode::Machine, Mark::X, &config())
        .with_recorder(
            Identity::new("user-1".to_string(), "Uma".to_string()),
            sink.clone(),
        )
        .with_rng_seed(5);

    for _ in 0..2 {
        while game.status() == LocalStatus::Playing {
            if game.turn() == Mark::X {
                let open = game.board().open_cells();
                assert!(game.apply_move(open[0]));
            } else {
                let _ = game.machine_turn().await;
            }
        }
        game.reset();
    }

    assert_eq!(sink.count(), 2);
    assert_eq!(game.generation(), 2);
    assert_eq!(game.status(), LocalStatus::Playing);
    assert!(game.board().open_cells().len() == 9);
}

#[test]
fn friend_mode_records_nothing() {
    let sink = Arc::new(CountingSink::default());
    let mut game = LocalMatch::new(LocalMode::Friend, Mark::X, &config()).with_recorder(
        Identity::new("user-1".to_string(), "Uma".to_string()),
        sink.clone(),
    );

    for cell in [0, 4, 1, 5, 2] {
        assert!(game.apply_move(cell));
    }
    assert_eq!(game.status(), LocalStatus::Finished);
    assert_eq!(sink.count(), 0);
}
