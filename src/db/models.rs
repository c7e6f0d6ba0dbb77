//! Database models and domain types.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;

use crate::db::{DbError, schema};

/// Profile aggregate database model.
///
/// One row per participant, counters partitioned by the role played.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::profiles)]
#[diesel(primary_key(user_id))]
pub struct Profile {
    user_id: String,
    display_name: String,
    x_wins: i32,
    o_wins: i32,
    x_losses: i32,
    o_losses: i32,
    draws: i32,
    total_games: i32,
    updated_at: NaiveDateTime,
}

/// Insertable profile model for first-seen participants.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::profiles)]
pub struct NewProfile {
    user_id: String,
    display_name: String,
}

/// Match outcome database model. Append-only, never updated.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::match_outcomes)]
pub struct MatchOutcome {
    id: i32,
    user_id: String,
    result: String,
    my_role: String,
    winner: String,
    final_board: String,
    opponent_name: String,
    moves_count: i32,
    is_abandoned: bool,
    game_kind: String,
    played_at: NaiveDateTime,
}

impl MatchOutcome {
    /// Parses the stored result string into a [`GameOutcome`] enum.
    #[instrument(skip(self), fields(result = %self.result))]
    pub fn parse_result(&self) -> Result<GameOutcome, DbError> {
        GameOutcome::from_db_string(self.result())
    }
}

/// Insertable match outcome model for recording concluded games.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::match_outcomes)]
pub struct NewMatchOutcome {
    user_id: String,
    result: String,
    my_role: String,
    winner: String,
    final_board: String,
    opponent_name: String,
    moves_count: i32,
    is_abandoned: bool,
    game_kind: String,
}

/// Game outcome from the participant's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOutcome {
    /// Participant won the game.
    Win,
    /// Participant lost the game.
    Loss,
    /// Game ended in a draw.
    Draw,
}

impl GameOutcome {
    /// Converts outcome to the string stored in the database.
    #[instrument]
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Win => "WIN",
            Self::Loss => "LOSS",
            Self::Draw => "DRAW",
        }
    }

    /// Parses outcome from the string stored in the database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the string is not a valid outcome value.
    #[instrument(skip(s), fields(s = %s))]
    pub fn from_db_string(s: &str) -> Result<Self, DbError> {
        match s {
            "WIN" => Ok(Self::Win),
            "LOSS" => Ok(Self::Loss),
            "DRAW" => Ok(Self::Draw),
            _ => Err(DbError::new(format!("Invalid result: '{}'", s))),
        }
    }
}

/// Kind of match an outcome row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// Single-device game.
    Local,
    /// Synchronized online game.
    Online,
}

impl MatchKind {
    /// Converts the kind to the string stored in the database.
    #[instrument]
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Online => "online",
        }
    }
}
