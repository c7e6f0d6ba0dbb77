//! The durable match record and its update patch.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::games::tictactoe::{Board, Mark, Verdict};

/// Identifier of a match record.
pub type MatchId = String;

/// Stable participant identifier from the identity provider.
pub type PlayerId = String;

/// Lifecycle status of a match record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum MatchStatus {
    /// Created, fewer than two participants seated.
    Waiting,
    /// Both seats filled, moves being exchanged.
    Playing,
    /// Decided verdict or abandonment.
    Finished,
}

/// A client's relationship to a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Seated participant playing the given mark.
    Player(Mark),
    /// Connected but matching neither seat; read-only.
    Spectator,
}

impl Role {
    /// The mark played, if seated.
    pub fn mark(&self) -> Option<Mark> {
        match self {
            Role::Player(mark) => Some(*mark),
            Role::Spectator => None,
        }
    }
}

/// Durable row describing one match.
///
/// Each client holds a mirror of this row; the stored row is the
/// asynchronously-reconciled source of truth.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct MatchRecord {
    id: MatchId,
    board: Board,
    current_turn: Mark,
    status: MatchStatus,
    player_x: Option<PlayerId>,
    player_o: Option<PlayerId>,
    player_x_name: Option<String>,
    player_o_name: Option<String>,
    winner: Option<Verdict>,
    abandoned_by: Option<PlayerId>,
}

impl MatchRecord {
    /// Creates a fresh WAITING record with an empty board and no seats.
    pub fn fresh(starting_turn: Mark) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            board: Board::new(),
            current_turn: starting_turn,
            status: MatchStatus::Waiting,
            player_x: None,
            player_o: None,
            player_x_name: None,
            player_o_name: None,
            winner: None,
            abandoned_by: None,
        }
    }

    /// The participant seated at the given mark, if any.
    pub fn seat(&self, mark: Mark) -> Option<&PlayerId> {
        match mark {
            Mark::X => self.player_x.as_ref(),
            Mark::O => self.player_o.as_ref(),
        }
    }

    /// Display name for the given seat, if set.
    pub fn seat_name(&self, mark: Mark) -> Option<&String> {
        match mark {
            Mark::X => self.player_x_name.as_ref(),
            Mark::O => self.player_o_name.as_ref(),
        }
    }

    /// Whether the given participant occupies either seat.
    pub fn is_participant(&self, player_id: &str) -> bool {
        self.seat(Mark::X).map(String::as_str) == Some(player_id)
            || self.seat(Mark::O).map(String::as_str) == Some(player_id)
    }

    /// First empty seat, X before O.
    pub fn open_seat(&self) -> Option<Mark> {
        if self.player_x.is_none() {
            Some(Mark::X)
        } else if self.player_o.is_none() {
            Some(Mark::O)
        } else {
            None
        }
    }

    pub(crate) fn set_seat(&mut self, mark: Mark, player_id: &str, name: &str) {
        match mark {
            Mark::X => {
                self.player_x = Some(player_id.to_string());
                self.player_x_name = Some(name.to_string());
            }
            Mark::O => {
                self.player_o = Some(player_id.to_string());
                self.player_o_name = Some(name.to_string());
            }
        }
    }

    pub(crate) fn set_board(&mut self, board: Board) {
        self.board = board;
    }

    pub(crate) fn set_turn(&mut self, turn: Mark) {
        self.current_turn = turn;
    }

    pub(crate) fn set_status(&mut self, status: MatchStatus) {
        self.status = status;
    }

    pub(crate) fn set_winner(&mut self, winner: Option<Verdict>) {
        self.winner = winner;
    }

    pub(crate) fn set_abandoned_by(&mut self, abandoned_by: Option<PlayerId>) {
        self.abandoned_by = abandoned_by;
    }

    /// Applies an update patch, last write wins per field.
    pub(crate) fn apply(&mut self, update: &MatchUpdate) {
        if let Some(board) = update.board() {
            self.board = board.clone();
        }
        if let Some(turn) = update.current_turn() {
            self.current_turn = *turn;
        }
        if let Some(status) = update.status() {
            self.status = *status;
        }
        if let Some(winner) = update.winner() {
            self.winner = *winner;
        }
        if let Some(abandoned_by) = update.abandoned_by() {
            self.abandoned_by = abandoned_by.clone();
        }
    }
}

/// Field patch for a match row update.
///
/// Unset fields are left untouched; `winner` and `abandoned_by` patch to an
/// inner `Option` so they can be cleared on rematch.
#[derive(Debug, Clone, Default, Getters, Setters)]
#[setters(strip_option, prefix = "with_")]
pub struct MatchUpdate {
    board: Option<Board>,
    current_turn: Option<Mark>,
    status: Option<MatchStatus>,
    winner: Option<Option<Verdict>>,
    abandoned_by: Option<Option<PlayerId>>,
}
