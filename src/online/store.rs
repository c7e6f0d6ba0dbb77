//! Durable match store seam and the in-process implementation.

use async_trait::async_trait;
use derive_more::{Display, Error};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::record::{MatchId, MatchRecord, MatchStatus, MatchUpdate};
use crate::games::tictactoe::Mark;

/// Store error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}:{}", message, file, line)]
pub struct StoreError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Result of a guarded seat claim.
#[derive(Debug, Clone)]
pub enum SeatClaim {
    /// The claim landed; carries the row as stored after the write.
    Applied(MatchRecord),
    /// Another writer already holds the seat; carries the row as stored.
    Superseded(MatchRecord),
}

/// Durable row store for match records.
///
/// Updates are last-write-wins at row level; there is no cross-participant
/// locking. `changes` delivers the new row state after every write, which
/// is the slower-but-authoritative reconciliation path next to the
/// broadcast channel.
#[async_trait]
pub trait MatchStore: Send + Sync + std::fmt::Debug {
    /// Point read by match id.
    async fn get(&self, id: &str) -> Result<Option<MatchRecord>, StoreError>;

    /// Inserts a new row.
    async fn insert(&self, record: MatchRecord) -> Result<(), StoreError>;

    /// Applies a field patch. Returns the row after the write, or `None`
    /// when the row no longer exists.
    async fn update(&self, id: &str, update: MatchUpdate)
    -> Result<Option<MatchRecord>, StoreError>;

    /// Writes a participant into a seat only if the seat is still empty,
    /// so two simultaneous joiners cannot both land. The stored status
    /// derives atomically from resulting occupancy: PLAYING once both
    /// seats are filled, WAITING otherwise.
    async fn claim_seat(
        &self,
        id: &str,
        seat: Mark,
        player_id: &str,
        name: &str,
    ) -> Result<SeatClaim, StoreError>;

    /// Deletes the row.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Subscribes to row-change notifications for a match id.
    fn changes(&self, id: &str) -> broadcast::Receiver<MatchRecord>;
}

const CHANGE_BUFFER: usize = 64;

/// In-process store: a mutexed row map plus per-row change feeds.
///
/// Adequate for same-process multi-client play and for tests; the trait is
/// the seam a networked row store would implement.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<MatchId, MatchRecord>>>,
    feeds: Arc<Mutex<HashMap<MatchId, broadcast::Sender<MatchRecord>>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets or creates the change feed for a row.
    fn feed(&self, id: &str) -> broadcast::Sender<MatchRecord> {
        let mut feeds = self.feeds.lock().unwrap();
        feeds
            .entry(id.to_string())
            .or_insert_with(|| broadcast::channel(CHANGE_BUFFER).0)
            .clone()
    }

    /// Publishes the new row state to subscribers, if any.
    fn notify(&self, record: &MatchRecord) {
        let _ = self.feed(record.id()).send(record.clone());
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<MatchRecord>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let record = rows.get(id).cloned();
        if record.is_none() {
            debug!(match_id = id, "Row not found");
        }
        Ok(record)
    }

    #[instrument(skip(self, record), fields(match_id = %record.id()))]
    async fn insert(&self, record: MatchRecord) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(record.id()) {
            return Err(StoreError::new(format!(
                "Row already exists: {}",
                record.id()
            )));
        }
        info!(match_id = %record.id(), "Row inserted");
        rows.insert(record.id().clone(), record);
        Ok(())
    }

    #[instrument(skip(self, update))]
    async fn update(
        &self,
        id: &str,
        update: MatchUpdate,
    ) -> Result<Option<MatchRecord>, StoreError> {
        let snapshot = {
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(id) {
                Some(record) => {
                    record.apply(&update);
                    Some(record.clone())
                }
                None => None,
            }
        };

        match snapshot {
            Some(record) => {
                debug!(match_id = id, status = %record.status(), "Row updated");
                self.notify(&record);
                Ok(Some(record))
            }
            None => {
                warn!(match_id = id, "Update on missing row");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, name))]
    async fn claim_seat(
        &self,
        id: &str,
        seat: Mark,
        player_id: &str,
        name: &str,
    ) -> Result<SeatClaim, StoreError> {
        let claim = {
            let mut rows = self.rows.lock().unwrap();
            let record = rows
                .get_mut(id)
                .ok_or_else(|| StoreError::new(format!("Row not found: {}", id)))?;

            if record.seat(seat).is_some() {
                debug!(match_id = id, %seat, "Seat already taken");
                SeatClaim::Superseded(record.clone())
            } else {
                record.set_seat(seat, player_id, name);
                if record.seat(seat.opponent()).is_some() {
                    record.set_status(MatchStatus::Playing);
                }
                info!(match_id = id, %seat, player_id, "Seat claimed");
                SeatClaim::Applied(record.clone())
            }
        };

        if let SeatClaim::Applied(record) = &claim {
            self.notify(record);
        }
        Ok(claim)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        rows.remove(id);
        info!(match_id = id, "Row deleted");
        Ok(())
    }

    fn changes(&self, id: &str) -> broadcast::Receiver<MatchRecord> {
        self.feed(id).subscribe()
    }
}
