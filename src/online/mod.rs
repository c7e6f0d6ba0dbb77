//! Online match synchronization.
//!
//! Two (or more) independently running clients converge on one match view
//! through a shared durable row store and an ephemeral per-match broadcast
//! topic; there is no authoritative server process between them.

mod channel;
mod engine;
mod events;
mod record;
mod store;

pub use channel::{ChannelHub, MatchChannel};
pub use engine::{OnlineMatch, Signal, SyncError, create_match};
pub use events::MatchEvent;
pub use record::{MatchId, MatchRecord, MatchStatus, MatchUpdate, PlayerId, Role};
pub use store::{MatchStore, MemoryStore, SeatClaim, StoreError};
