//! Tests for the stat repository and recorder.

use tempfile::NamedTempFile;

use triline::{
    Board, GameOutcome, Mark, MatchKind, OutcomeReport, OutcomeSink, Square, StatRecorder,
    StatRepository, Verdict,
};

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready recorder.
fn setup_test_db() -> (NamedTempFile, StatRecorder) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let repository = StatRepository::new(db_path).expect("Failed to create repository");
    repository.apply_migrations().expect("Migrations failed");

    (db_file, StatRecorder::new(repository))
}

fn report(role: Mark, winner: Verdict, abandoned: bool, kind: MatchKind) -> OutcomeReport {
    let mut board = Board::new();
    for (pos, mark) in [(0, Mark::X), (4, Mark::O), (1, Mark::X), (5, Mark::O), (2, Mark::X)] {
        board.set(pos, Square::Taken(mark)).expect("valid position");
    }
    OutcomeReport::new(
        "user-1".to_string(),
        "Uma".to_string(),
        role,
        winner,
        board,
        5,
        "Rival".to_string(),
        abandoned,
        kind,
    )
}

#[test]
fn first_report_creates_the_profile() {
    let (_db, recorder) = setup_test_db();
    assert!(recorder.aggregate("user-1").expect("query").is_none());

    recorder
        .record(&report(Mark::X, Verdict::Win(Mark::X), false, MatchKind::Local))
        .expect("record");

    let profile = recorder.aggregate("user-1").expect("query").expect("profile");
    assert_eq!(profile.display_name(), "Uma");
    assert_eq!(*profile.x_wins(), 1);
    assert_eq!(*profile.total_games(), 1);
}

#[test]
fn counters_partition_by_role() {
    let (_db, recorder) = setup_test_db();

    // Win as X, win as O, loss as X, loss as O, draw.
    recorder
        .record(&report(Mark::X, Verdict::Win(Mark::X), false, MatchKind::Online))
        .expect("record");
    recorder
        .record(&report(Mark::O, Verdict::Win(Mark::O), false, MatchKind::Online))
        .expect("record");
    recorder
        .record(&report(Mark::X, Verdict::Win(Mark::O), false, MatchKind::Online))
        .expect("record");
    recorder
        .record(&report(Mark::O, Verdict::Win(Mark::X), false, MatchKind::Online))
        .expect("record");
    recorder
        .record(&report(Mark::X, Verdict::Draw, false, MatchKind::Online))
        .expect("record");

    let profile = recorder.aggregate("user-1").expect("query").expect("profile");
    assert_eq!(*profile.x_wins(), 1);
    assert_eq!(*profile.o_wins(), 1);
    assert_eq!(*profile.x_losses(), 1);
    assert_eq!(*profile.o_losses(), 1);
    assert_eq!(*profile.draws(), 1);
    assert_eq!(*profile.total_games(), 5);
}

#[test]
fn outcome_rows_keep_full_detail() {
    let (_db, recorder) = setup_test_db();

    recorder
        .record(&report(Mark::O, Verdict::Win(Mark::X), true, MatchKind::Online))
        .expect("record");

    let history = recorder.history("user-1").expect("history");
    assert_eq!(history.len(), 1);
    let row = &history[0];
    assert_eq!(row.result(), "LOSS");
    assert_eq!(row.my_role(), "O");
    assert_eq!(row.winner(), "X");
    assert_eq!(row.opponent_name(), "Rival");
    assert!(row.final_board().contains("Taken"));
    assert_eq!(*row.moves_count(), 5);
    assert!(*row.is_abandoned());
    assert_eq!(row.game_kind(), "online");
    assert_eq!(row.parse_result().expect("parse"), GameOutcome::Loss);
}

#[test]
fn history_is_per_participant() {
    let (_db, recorder) = setup_test_db();

    recorder
        .record(&report(Mark::X, Verdict::Draw, false, MatchKind::Local))
        .expect("record");
    let other = OutcomeReport::new(
        "user-2".to_string(),
        "Vic".to_string(),
        Mark::O,
        Verdict::Draw,
        Board::new(),
        9,
        "Uma".to_string(),
        false,
        MatchKind::Online,
    );
    recorder.record(&other).expect("record");

    assert_eq!(recorder.history("user-1").expect("history").len(), 1);
    assert_eq!(recorder.history("user-2").expect("history").len(), 1);
    assert_eq!(recorder.history("user-3").expect("history").len(), 0);
}

#[test]
fn outcome_derivation_follows_role() {
    let as_x = report(Mark::X, Verdict::Win(Mark::X), false, MatchKind::Local);
    assert_eq!(as_x.result(), GameOutcome::Win);

    let as_o = report(Mark::O, Verdict::Win(Mark::X), false, MatchKind::Local);
    assert_eq!(as_o.result(), GameOutcome::Loss);

    let drawn = report(Mark::O, Verdict::Draw, false, MatchKind::Local);
    assert_eq!(drawn.result(), GameOutcome::Draw);
}

#[test]
fn invalid_result_string_is_rejected() {
    assert!(GameOutcome::from_db_string("winner").is_err());
    assert_eq!(
        GameOutcome::from_db_string("WIN").expect("parse"),
        GameOutcome::Win
    );
}
