//! Durable statistics storage: outcome rows and profile aggregates.

mod error;
mod models;
mod repository;
pub(crate) mod schema;

pub use error::DbError;
pub use models::{GameOutcome, MatchKind, MatchOutcome, NewMatchOutcome, NewProfile, Profile};
pub use repository::StatRepository;

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Embedded schema migrations, applied at startup and in tests.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
