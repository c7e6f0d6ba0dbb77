//! Local match state machine.
//!
//! Drives a single-process two-ply game: two humans alternating on one
//! device, or a human against the machine opponent. Machine replies are
//! applied after a short configured delay so the response is perceptible.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, instrument, warn};

use crate::config::AppConfig;
use crate::db::MatchKind;
use crate::games::tictactoe::{Board, Mark, MoveSelector, Square, Verdict, evaluate};
use crate::identity::Identity;
use crate::stats::{OutcomeReport, OutcomeSink};

/// Opponent label stored on machine-game outcome rows.
const MACHINE_LABEL: &str = "Machine";

/// Who sits across the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMode {
    /// Two humans alternating on the same device.
    Friend,
    /// Human versus the minimax opponent.
    Machine,
}

/// Status of a local game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatus {
    /// Moves are being accepted.
    Playing,
    /// The game has concluded.
    Finished,
}

/// A single-device game.
#[derive(Debug)]
pub struct LocalMatch {
    board: Board,
    turn: Mark,
    status: LocalStatus,
    winner: Option<Verdict>,
    mode: LocalMode,
    human_mark: Mark,
    starting_mark: Mark,
    generation: u32,
    recorded: bool,
    selector: MoveSelector,
    machine_delay: Duration,
    rng: StdRng,
    identity: Option<Identity>,
    recorder: Option<Arc<dyn OutcomeSink>>,
}

impl LocalMatch {
    /// Creates a new local game in the configured mode.
    ///
    /// In machine mode the human plays `human_mark`; in friend mode the
    /// argument is ignored for move acceptance (both plies come through
    /// [`LocalMatch::apply_move`]).
    #[instrument(skip(config))]
    pub fn new(mode: LocalMode, human_mark: Mark, config: &AppConfig) -> Self {
        info!(?mode, %human_mark, "Creating local match");
        Self {
            board: Board::new(),
            turn: *config.starting_mark(),
            status: LocalStatus::Playing,
            winner: None,
            mode,
            human_mark,
            starting_mark: *config.starting_mark(),
            generation: 0,
            recorded: false,
            selector: MoveSelector::new(*config.blunder_probability()),
            machine_delay: Duration::from_millis(*config.machine_delay_ms()),
            rng: StdRng::from_os_rng(),
            identity: None,
            recorder: None,
        }
    }

    /// Attaches an outcome recorder for the human participant.
    pub fn with_recorder(mut self, identity: Identity, recorder: Arc<dyn OutcomeSink>) -> Self {
        self.identity = Some(identity);
        self.recorder = Some(recorder);
        self
    }

    /// Seeds the internal generator, making machine play deterministic.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the mark to move.
    pub fn turn(&self) -> Mark {
        self.turn
    }

    /// Returns the game status.
    pub fn status(&self) -> LocalStatus {
        self.status
    }

    /// Returns the decided verdict, if the game has concluded.
    pub fn winner(&self) -> Option<Verdict> {
        self.winner
    }

    /// Returns the machine's mark.
    pub fn machine_mark(&self) -> Mark {
        self.human_mark.opponent()
    }

    /// Generation token, bumped on every reset so callers can discard
    /// state bound to an earlier game instance.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Applies a human move at the given cell.
    ///
    /// Returns `false` without touching any state when the cell is taken,
    /// the game has concluded, or it is the machine's ply.
    #[instrument(skip(self))]
    pub fn apply_move(&mut self, index: usize) -> bool {
        if self.status == LocalStatus::Finished {
            debug!(index, "Move rejected: game finished");
            return false;
        }
        if !self.board.is_empty(index) {
            debug!(index, "Move rejected: cell taken");
            return false;
        }
        if self.mode == LocalMode::Machine && self.turn != self.human_mark {
            debug!(index, "Move rejected: machine's ply");
            return false;
        }
        self.place(index);
        true
    }

    /// Lets the machine take its ply, returning the cell it played.
    ///
    /// Returns `None` when it is not the machine's ply. Waits the
    /// configured delay before selecting.
    #[instrument(skip(self))]
    pub async fn machine_turn(&mut self) -> Option<usize> {
        if self.mode != LocalMode::Machine
            || self.status != LocalStatus::Playing
            || self.turn == self.human_mark
        {
            return None;
        }

        sleep(self.machine_delay).await;

        let mark = self.machine_mark();
        let index = self.selector.select(&mut self.rng, &self.board, mark)?;
        self.place(index);
        info!(index, %mark, "Machine moved");
        Some(index)
    }

    /// Clears the board and re-enters play with a fresh generation token.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        info!("Resetting local match");
        self.board = Board::new();
        self.turn = self.starting_mark;
        self.status = LocalStatus::Playing;
        self.winner = None;
        self.recorded = false;
        self.generation += 1;
    }

    /// Places the mover's mark, then finishes the game or flips the turn.
    fn place(&mut self, index: usize) {
        let mark = self.turn;
        self.board.set(index, Square::Taken(mark)).unwrap();

        match evaluate(&self.board) {
            Some(verdict) => {
                self.winner = Some(verdict);
                self.status = LocalStatus::Finished;
                info!(%verdict, "Local match finished");
                self.record_once(verdict);
            }
            None => {
                self.turn = mark.opponent();
            }
        }
    }

    /// Records the outcome at most once per game instance.
    ///
    /// Friend games record nothing; there is no single participant to
    /// credit on a shared device.
    fn record_once(&mut self, verdict: Verdict) {
        if self.recorded {
            return;
        }
        self.recorded = true;

        if self.mode != LocalMode::Machine {
            return;
        }
        let (Some(identity), Some(recorder)) = (&self.identity, &self.recorder) else {
            return;
        };

        let report = OutcomeReport::new(
            identity.id().clone(),
            identity.public_name(),
            self.human_mark,
            verdict,
            self.board.clone(),
            self.board.move_count(),
            MACHINE_LABEL.to_string(),
            false,
            MatchKind::Local,
        );
        if let Err(e) = recorder.record(&report) {
            warn!(error = %e, "Failed to record local outcome");
        }
    }
}
