//! Stat recording business logic.
//!
//! Appends one match outcome row per report, then folds the result into the
//! reporter's profile aggregate by read-modify-write. The aggregate update
//! is unlocked; concurrent writers to the same profile can lose an update.

use derive_getters::Getters;
use derive_new::new;
use std::fmt::Debug;
use tracing::{debug, info, instrument};

use crate::db::{
    DbError, GameOutcome, MatchKind, MatchOutcome, NewMatchOutcome, Profile, StatRepository,
};
use crate::games::tictactoe::{Board, Mark, Verdict};

/// A concluded game, described from one participant's perspective.
#[derive(Debug, Clone, Getters, new)]
pub struct OutcomeReport {
    /// Reporting participant's stable id.
    participant_id: String,
    /// Reporting participant's display name (used when first creating the
    /// profile row).
    display_name: String,
    /// Role the reporter played.
    role: Mark,
    /// Decided result of the game.
    winner: Verdict,
    /// Board as it stood when the game concluded.
    final_board: Board,
    /// Cells taken when the game concluded.
    moves_count: i32,
    /// Opponent display label.
    opponent_name: String,
    /// Whether the game ended by abandonment.
    abandoned: bool,
    /// Local or online.
    kind: MatchKind,
}

impl OutcomeReport {
    /// Result from the reporting participant's perspective.
    pub fn result(&self) -> GameOutcome {
        match self.winner {
            Verdict::Draw => GameOutcome::Draw,
            Verdict::Win(mark) if mark == self.role => GameOutcome::Win,
            Verdict::Win(_) => GameOutcome::Loss,
        }
    }
}

/// Sink for concluded-game reports.
///
/// Both the local and the online engine record through this seam. Each
/// participant reports only for itself; nothing is ever recorded on a
/// peer's behalf.
pub trait OutcomeSink: Send + Sync + Debug {
    /// Records one outcome row and folds it into the reporter's aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the underlying store rejects the write.
    fn record(&self, report: &OutcomeReport) -> Result<(), DbError>;
}

/// Service layer recording outcomes into the stat store.
#[derive(Debug, Clone)]
pub struct StatRecorder {
    repository: StatRepository,
}

impl StatRecorder {
    /// Creates a new recorder backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: StatRepository) -> Self {
        info!("Creating StatRecorder");
        Self { repository }
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &StatRepository {
        &self.repository
    }

    /// Returns all outcomes for a participant, most recent first.
    #[instrument(skip(self))]
    pub fn history(&self, user_id: &str) -> Result<Vec<MatchOutcome>, DbError> {
        debug!(user_id = %user_id, "Getting outcome history");
        self.repository.outcomes_for(user_id)
    }

    /// Returns the profile aggregate for a participant, if recorded.
    #[instrument(skip(self))]
    pub fn aggregate(&self, user_id: &str) -> Result<Option<Profile>, DbError> {
        debug!(user_id = %user_id, "Getting profile aggregate");
        self.repository.get_profile(user_id)
    }
}

impl OutcomeSink for StatRecorder {
    #[instrument(skip(self, report), fields(user_id = %report.participant_id(), result = ?report.result()))]
    fn record(&self, report: &OutcomeReport) -> Result<(), DbError> {
        let result = report.result();
        let final_board = serde_json::to_string(report.final_board().squares())
            .map_err(|e| DbError::new(format!("Failed to serialize board: {}", e)))?;

        let row = NewMatchOutcome::new(
            report.participant_id().clone(),
            result.to_db_string().to_string(),
            report.role().to_string(),
            report.winner().to_db_string().to_string(),
            final_board,
            report.opponent_name().clone(),
            *report.moves_count(),
            *report.abandoned(),
            report.kind().to_db_string().to_string(),
        );
        self.repository.insert_outcome(row)?;

        let profile = match self.repository.get_profile(report.participant_id())? {
            Some(profile) => profile,
            None => self.repository.create_profile(
                report.participant_id().clone(),
                report.display_name().clone(),
            )?,
        };

        let mut x_wins = *profile.x_wins();
        let mut o_wins = *profile.o_wins();
        let mut x_losses = *profile.x_losses();
        let mut o_losses = *profile.o_losses();
        let mut draws = *profile.draws();

        match (result, *report.role()) {
            (GameOutcome::Draw, _) => draws += 1,
            (GameOutcome::Win, Mark::X) => x_wins += 1,
            (GameOutcome::Win, Mark::O) => o_wins += 1,
            (GameOutcome::Loss, Mark::X) => x_losses += 1,
            (GameOutcome::Loss, Mark::O) => o_losses += 1,
        }

        self.repository.update_profile_counters(
            report.participant_id(),
            x_wins,
            o_wins,
            x_losses,
            o_losses,
            draws,
            *profile.total_games() + 1,
        )?;

        info!(user_id = %report.participant_id(), result = ?result, "Outcome folded into aggregate");
        Ok(())
    }
}
