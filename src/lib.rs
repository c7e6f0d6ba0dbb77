//! Triline - tic-tac-toe with local and online play
//!
//! # Architecture
//!
//! - **Games**: board types, win/draw evaluation, minimax move selection
//! - **Local**: single-device match state machine (friend or machine)
//! - **Online**: serverless match synchronization over a durable row store
//!   and a per-match broadcast channel
//! - **Stats**: append-only outcome rows folded into per-user aggregates
//!
//! # Example
//!
//! ```no_run
//! use triline::{AppConfig, LocalMatch, LocalMode, Mark};
//!
//! let config = AppConfig::default();
//! let mut game = LocalMatch::new(LocalMode::Friend, Mark::X, &config);
//! game.apply_move(4);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod db;
mod games;
mod identity;
mod local;
mod online;
mod stats;

// Crate-level exports - Configuration
pub use config::{AppConfig, ConfigError};

// Crate-level exports - Stat storage
pub use db::{
    DbError, GameOutcome, MatchKind, MatchOutcome, NewMatchOutcome, Profile, StatRepository,
};

// Crate-level exports - Game types (tic-tac-toe)
pub use games::tictactoe::{Board, Mark, MoveSelector, Square, Verdict, evaluate, winning_mark};

// Crate-level exports - Identity
pub use identity::{Identity, UNKNOWN_PLAYER};

// Crate-level exports - Local play
pub use local::{LocalMatch, LocalMode, LocalStatus};

// Crate-level exports - Online synchronization
pub use online::{
    ChannelHub, MatchChannel, MatchEvent, MatchId, MatchRecord, MatchStatus, MatchStore,
    MatchUpdate, MemoryStore, OnlineMatch, PlayerId, Role, SeatClaim, Signal, StoreError,
    SyncError, create_match,
};

// Crate-level exports - Stat recording
pub use stats::{OutcomeReport, OutcomeSink, StatRecorder};
