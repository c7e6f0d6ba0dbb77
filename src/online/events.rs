//! Broadcast events exchanged between clients of one match.

use serde::{Deserialize, Serialize};

use super::record::{MatchStatus, PlayerId};
use crate::games::tictactoe::{Board, Mark, Verdict};

/// Ephemeral event published on a match's broadcast topic.
///
/// Each variant carries enough payload for a receiving client to apply the
/// effect without re-reading the match record. Events are not persisted;
/// delivery is best-effort and in order per sender while attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    /// A participant claimed a seat.
    PlayerJoined {
        /// Claimant's id.
        player_id: PlayerId,
        /// Claimant's display name.
        player_name: String,
        /// Seat taken.
        role: Mark,
    },
    /// A move was applied; the full resulting state is attached.
    Move {
        /// Board after the move.
        board: Board,
        /// Mark to move next (unchanged if the game just ended).
        turn: Mark,
        /// Decided verdict, if the move ended the game.
        winner: Option<Verdict>,
        /// Status after the move.
        status: MatchStatus,
    },
    /// A participant left mid-game, conceding to the other seat.
    GameAbandoned {
        /// Who left.
        abandoned_by: PlayerId,
        /// Their display name.
        abandoner_name: String,
        /// The mark declared winner.
        winner_mark: Mark,
    },
    /// The match was cancelled before a second participant arrived.
    GameCancelled,
    /// A participant asked for a rematch.
    RematchRequest {
        /// Requestor's display name.
        requestor_name: String,
    },
    /// A rematch was accepted and the record reset in place.
    GameReset {
        /// Mark that opens the new game.
        new_turn: Mark,
    },
}
