//! Database repository for match outcomes and profile aggregates.

use chrono::Utc;
use diesel::prelude::*;
use diesel_migrations::MigrationHarness;
use tracing::{debug, info, instrument};

use crate::db::{DbError, MIGRATIONS, MatchOutcome, NewMatchOutcome, NewProfile, Profile, schema};

/// Database repository for outcome and profile operations.
#[derive(Debug, Clone)]
pub struct StatRepository {
    db_path: String,
}

impl StatRepository {
    /// Creates a new repository connected to the database at the given path.
    ///
    /// Use `":memory:"` for an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is invalid.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        info!(path = %db_path, "Creating StatRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    /// Applies any pending embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn apply_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration error: {}", e)))?;
        info!("Migrations applied");
        Ok(())
    }

    /// Inserts a match outcome row. Rows are append-only.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, outcome), fields(user_id = %outcome.user_id(), result = %outcome.result()))]
    pub fn insert_outcome(&self, outcome: NewMatchOutcome) -> Result<MatchOutcome, DbError> {
        debug!("Recording match outcome");
        let mut conn = self.connection()?;

        let recorded = diesel::insert_into(schema::match_outcomes::table)
            .values(&outcome)
            .returning(MatchOutcome::as_returning())
            .get_result(&mut conn)?;

        info!(
            outcome_id = recorded.id(),
            user_id = %recorded.user_id(),
            result = %recorded.result(),
            "Match outcome recorded"
        );
        Ok(recorded)
    }

    /// Gets all outcomes for a participant, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn outcomes_for(&self, user_id: &str) -> Result<Vec<MatchOutcome>, DbError> {
        debug!(user_id = %user_id, "Loading outcome history");
        let mut conn = self.connection()?;

        let outcomes = schema::match_outcomes::table
            .filter(schema::match_outcomes::user_id.eq(user_id))
            .order(schema::match_outcomes::played_at.desc())
            .load::<MatchOutcome>(&mut conn)?;

        info!(user_id = %user_id, count = outcomes.len(), "Outcome history loaded");
        Ok(outcomes)
    }

    /// Gets a profile aggregate by participant id. Returns `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, DbError> {
        debug!(user_id = %user_id, "Looking up profile");
        let mut conn = self.connection()?;

        let profile = schema::profiles::table
            .filter(schema::profiles::user_id.eq(user_id))
            .first::<Profile>(&mut conn)
            .optional()?;

        Ok(profile)
    }

    /// Creates a zeroed profile aggregate for a first-seen participant.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the participant already has a profile or a
    /// database error occurs.
    #[instrument(skip(self))]
    pub fn create_profile(&self, user_id: String, display_name: String) -> Result<Profile, DbError> {
        debug!(user_id = %user_id, "Creating profile");
        let mut conn = self.connection()?;

        let new_profile = NewProfile::new(user_id, display_name);
        let profile = diesel::insert_into(schema::profiles::table)
            .values(&new_profile)
            .returning(Profile::as_returning())
            .get_result(&mut conn)?;

        info!(user_id = %profile.user_id(), "Profile created");
        Ok(profile)
    }

    /// Overwrites a profile's counters. Read-modify-write, last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    #[allow(clippy::too_many_arguments)]
    pub fn update_profile_counters(
        &self,
        user_id: &str,
        x_wins: i32,
        o_wins: i32,
        x_losses: i32,
        o_losses: i32,
        draws: i32,
        total_games: i32,
    ) -> Result<Profile, DbError> {
        debug!(user_id = %user_id, "Updating profile counters");
        let mut conn = self.connection()?;

        let profile = diesel::update(
            schema::profiles::table.filter(schema::profiles::user_id.eq(user_id)),
        )
        .set((
            schema::profiles::x_wins.eq(x_wins),
            schema::profiles::o_wins.eq(o_wins),
            schema::profiles::x_losses.eq(x_losses),
            schema::profiles::o_losses.eq(o_losses),
            schema::profiles::draws.eq(draws),
            schema::profiles::total_games.eq(total_games),
            schema::profiles::updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(Profile::as_returning())
        .get_result(&mut conn)?;

        info!(user_id = %user_id, total_games = profile.total_games(), "Profile updated");
        Ok(profile)
    }
}
