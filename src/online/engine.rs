//! Online match synchronization engine.
//!
//! Each client process runs one [`OnlineMatch`] per attached match. The
//! engine mirrors the durable record, publishes and consumes broadcast
//! events, and funnels both notification paths (broadcast and row-change
//! feed) through one idempotent reconciliation so every transition is
//! applied exactly once no matter which path observes it first.

use derive_more::{Display, Error};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::channel::{ChannelHub, MatchChannel};
use super::events::MatchEvent;
use super::record::{MatchId, MatchRecord, MatchStatus, MatchUpdate, Role};
use super::store::{MatchStore, SeatClaim, StoreError};
use crate::db::MatchKind;
use crate::games::tictactoe::{Board, Mark, Square, Verdict, evaluate};
use crate::identity::{Identity, UNKNOWN_PLAYER};
use crate::stats::{OutcomeReport, OutcomeSink};

/// Mark that opens every online game, including rematches.
const STARTING_MARK: Mark = Mark::X;

/// Synchronization error.
#[derive(Debug, Clone, Display, Error)]
pub enum SyncError {
    /// The match id resolved to no record; fatal for the session.
    #[display("Match not found: {}", id)]
    MatchNotFound {
        /// The id that failed to resolve.
        id: MatchId,
    },
    /// The durable store rejected an operation.
    #[display("Store failure: {}", source)]
    Store {
        /// Underlying store error.
        source: StoreError,
    },
    /// The broadcast topic closed underneath the session.
    #[display("Broadcast channel closed")]
    ChannelClosed,
}

impl From<StoreError> for SyncError {
    fn from(source: StoreError) -> Self {
        Self::Store { source }
    }
}

/// User-visible effect of an applied notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Nothing to surface.
    Unchanged,
    /// A seat gained an occupant.
    SeatFilled {
        /// The seat.
        mark: Mark,
        /// Occupant's display name.
        name: String,
    },
    /// Both seats are filled and play is on.
    Started,
    /// The board changed.
    Moved,
    /// The game concluded with a verdict.
    Finished {
        /// The verdict.
        winner: Verdict,
    },
    /// A participant abandoned; the other seat wins.
    Abandoned {
        /// Winning mark.
        winner: Mark,
        /// Display name of who left.
        abandoner_name: String,
    },
    /// The match was cancelled; the session should return to the lobby.
    Cancelled,
    /// The peer asked for a rematch.
    RematchRequested {
        /// Requestor's display name.
        from: String,
    },
    /// The board was reset for a rematch.
    GameReset,
}

/// One-shot guards against duplicate side effects.
///
/// Owned per session and rearmed explicitly on rematch; never ambient.
#[derive(Debug, Default)]
struct SessionLatches {
    joined: bool,
    recorded: bool,
    waiting_for_rematch: bool,
    rematch_incoming: Option<String>,
}

/// A client's attachment to one online match.
#[derive(Debug)]
pub struct OnlineMatch {
    store: Arc<dyn MatchStore>,
    channel: MatchChannel,
    changes: broadcast::Receiver<MatchRecord>,
    me: Identity,
    recorder: Option<Arc<dyn OutcomeSink>>,
    mirror: MatchRecord,
    latches: SessionLatches,
    generation: u32,
}

/// Creates a fresh WAITING match record in the store.
///
/// # Errors
///
/// Returns [`SyncError`] if the insert fails.
#[instrument(skip(store))]
pub async fn create_match(store: &dyn MatchStore) -> Result<MatchRecord, SyncError> {
    let record = MatchRecord::fresh(STARTING_MARK);
    store.insert(record.clone()).await?;
    info!(match_id = %record.id(), "Match created");
    Ok(record)
}

impl OnlineMatch {
    /// Attaches to a match: reads the record, subscribes to both
    /// notification paths, and claims a seat when one is open.
    ///
    /// A client that matches neither seat and finds both taken becomes a
    /// spectator. Attaching to an already-finished game pre-arms the
    /// recording latch; outcomes are never recorded retroactively.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MatchNotFound`] when the id does not resolve,
    /// or a store error if the seat claim write fails.
    #[instrument(skip(store, hub, me, recorder), fields(user_id = %me.id()))]
    pub async fn attach(
        store: Arc<dyn MatchStore>,
        hub: &ChannelHub,
        match_id: &str,
        me: Identity,
        recorder: Option<Arc<dyn OutcomeSink>>,
    ) -> Result<Self, SyncError> {
        let record = store
            .get(match_id)
            .await?
            .ok_or_else(|| SyncError::MatchNotFound {
                id: match_id.to_string(),
            })?;

        let channel = hub.join(match_id);
        let changes = store.changes(match_id);

        let mut session = Self {
            store,
            channel,
            changes,
            me,
            recorder,
            mirror: record,
            latches: SessionLatches::default(),
            generation: 0,
        };

        if *session.mirror.status() == MatchStatus::Finished {
            session.latches.recorded = true;
        }

        session.try_join().await?;
        info!(role = ?session.role(), "Attached to match");
        Ok(session)
    }

    /// Runs the join protocol once per session.
    async fn try_join(&mut self) -> Result<(), SyncError> {
        if self.latches.joined || self.mirror.is_participant(self.me.id()) {
            return Ok(());
        }
        let Some(seat) = self.mirror.open_seat() else {
            debug!("Both seats taken; spectating");
            return Ok(());
        };
        self.latches.joined = true;

        if !self.claim(seat).await? {
            // Lost the race; one retry on whatever seat is still open.
            if let Some(other) = self.mirror.open_seat() {
                self.claim(other).await?;
            }
        }
        Ok(())
    }

    /// Attempts one guarded seat claim. Returns whether the claim landed.
    async fn claim(&mut self, seat: Mark) -> Result<bool, SyncError> {
        let name = self.me.public_name();
        let claim = self
            .store
            .claim_seat(self.mirror.id(), seat, self.me.id(), &name)
            .await?;

        match claim {
            SeatClaim::Applied(record) => {
                self.mirror = record;
                // Low-latency path: peers learn of the seat without a
                // durable-store round trip.
                self.channel.publish(MatchEvent::PlayerJoined {
                    player_id: self.me.id().clone(),
                    player_name: name,
                    role: seat,
                });
                info!(%seat, "Seat claimed");
                Ok(true)
            }
            SeatClaim::Superseded(record) => {
                debug!(%seat, "Seat claim superseded; reconciling");
                self.reconcile(record);
                Ok(false)
            }
        }
    }

    /// The mirrored record.
    pub fn mirror(&self) -> &MatchRecord {
        &self.mirror
    }

    /// Match id shorthand.
    pub fn match_id(&self) -> &str {
        self.mirror.id()
    }

    /// This client's role, derived purely from the mirrored seats.
    pub fn role(&self) -> Role {
        if self.mirror.seat(Mark::X).map(String::as_str) == Some(self.me.id().as_str()) {
            Role::Player(Mark::X)
        } else if self.mirror.seat(Mark::O).map(String::as_str) == Some(self.me.id().as_str()) {
            Role::Player(Mark::O)
        } else {
            Role::Spectator
        }
    }

    /// Generation token, bumped on every reset so callers can discard
    /// state bound to an earlier game instance.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether this session has an outstanding rematch request.
    pub fn awaiting_rematch(&self) -> bool {
        self.latches.waiting_for_rematch
    }

    /// Display name of a peer whose rematch request is pending, if any.
    pub fn rematch_incoming(&self) -> Option<&str> {
        self.latches.rematch_incoming.as_deref()
    }

    /// Waits for the next notification on either path and applies it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ChannelClosed`] when both paths have shut down.
    pub async fn next(&mut self) -> Result<Signal, SyncError> {
        loop {
            tokio::select! {
                event = self.channel.recv() => {
                    let event = event.ok_or(SyncError::ChannelClosed)?;
                    return Ok(self.handle_event(event));
                }
                change = self.changes.recv() => {
                    match change {
                        Ok(record) => {
                            let signal = self.reconcile(record);
                            if signal != Signal::Unchanged {
                                return Ok(signal);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Change feed lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(SyncError::ChannelClosed);
                        }
                    }
                }
            }
        }
    }

    /// Applies a broadcast event from a peer.
    #[instrument(skip(self, event))]
    pub fn handle_event(&mut self, event: MatchEvent) -> Signal {
        debug!(?event, "Applying broadcast event");
        match event {
            MatchEvent::PlayerJoined {
                player_id,
                player_name,
                role,
            } => {
                self.mirror.set_seat(role, &player_id, &player_name);
                if self.mirror.seat(Mark::X).is_some() && self.mirror.seat(Mark::O).is_some() {
                    self.mirror.set_status(MatchStatus::Playing);
                }
                Signal::SeatFilled {
                    mark: role,
                    name: player_name,
                }
            }
            MatchEvent::Move {
                board,
                turn,
                winner,
                status,
            } => {
                // Last broadcast wins: replace wholesale, no merging. Legal
                // play has at most one mover between broadcasts.
                self.mirror.set_board(board);
                self.mirror.set_turn(turn);
                self.mirror.set_status(status);
                if let Some(verdict) = winner {
                    self.mirror.set_winner(Some(verdict));
                }
                if status == MatchStatus::Finished {
                    self.record_once();
                    if let Some(verdict) = winner {
                        return Signal::Finished { winner: verdict };
                    }
                }
                Signal::Moved
            }
            MatchEvent::GameAbandoned {
                abandoned_by,
                abandoner_name,
                winner_mark,
            } => {
                if self.mirror.abandoned_by().is_some() {
                    // Already applied via the change feed.
                    return Signal::Unchanged;
                }
                self.mirror.set_status(MatchStatus::Finished);
                self.mirror.set_winner(Some(Verdict::Win(winner_mark)));
                self.mirror.set_abandoned_by(Some(abandoned_by));
                self.record_once();
                Signal::Abandoned {
                    winner: winner_mark,
                    abandoner_name,
                }
            }
            MatchEvent::GameCancelled => Signal::Cancelled,
            MatchEvent::RematchRequest { requestor_name } => {
                if !self.latches.waiting_for_rematch {
                    self.latches.rematch_incoming = Some(requestor_name.clone());
                }
                Signal::RematchRequested {
                    from: requestor_name,
                }
            }
            MatchEvent::GameReset { new_turn } => {
                self.reset_local(new_turn);
                Signal::GameReset
            }
        }
    }

    /// Applies a freshly observed durable record.
    ///
    /// Both the change feed and post-claim reads land here. Only actual
    /// deltas act, so the same transition observed twice is inert.
    #[instrument(skip(self, record))]
    pub fn reconcile(&mut self, record: MatchRecord) -> Signal {
        let observed = *record.status();
        let local = *self.mirror.status();

        if observed != local {
            if local == MatchStatus::Finished && observed == MatchStatus::Playing {
                // A rematch we never saw broadcast: rebuild from the
                // record alone, seats included.
                self.adopt_seats(&record);
                self.mirror.set_board(record.board().clone());
                self.mirror.set_turn(*record.current_turn());
                self.mirror.set_status(MatchStatus::Playing);
                self.mirror.set_winner(None);
                self.mirror.set_abandoned_by(None);
                self.rearm();
                info!("Reconciled missed game reset");
                return Signal::GameReset;
            }

            if observed == MatchStatus::Playing {
                self.mirror.set_status(MatchStatus::Playing);
                self.mirror.set_board(record.board().clone());
                self.mirror.set_turn(*record.current_turn());
                self.adopt_seats(&record);
                info!("Reconciled start of play");
                return Signal::Started;
            }

            if observed == MatchStatus::Finished {
                self.mirror.set_board(record.board().clone());
                self.mirror.set_turn(*record.current_turn());
                self.mirror.set_status(MatchStatus::Finished);
                self.mirror.set_winner(*record.winner());
                self.mirror.set_abandoned_by(record.abandoned_by().clone());
                self.record_once();
                return match (record.abandoned_by(), record.winner()) {
                    (Some(abandoner), Some(Verdict::Win(mark))) => Signal::Abandoned {
                        winner: *mark,
                        abandoner_name: self.name_of(abandoner),
                    },
                    (_, Some(verdict)) => Signal::Finished { winner: *verdict },
                    (_, None) => Signal::Unchanged,
                };
            }

            // Status regressed to WAITING underneath us; adopt wholesale.
            self.mirror = record;
            return Signal::Unchanged;
        }

        // Same status: heal field drift.
        if observed == MatchStatus::Finished
            && record.abandoned_by().is_some()
            && self.mirror.abandoned_by().is_none()
        {
            self.mirror.set_winner(*record.winner());
            self.mirror.set_abandoned_by(record.abandoned_by().clone());
            self.record_once();
            if let (Some(abandoner), Some(Verdict::Win(mark))) =
                (record.abandoned_by(), record.winner())
            {
                return Signal::Abandoned {
                    winner: *mark,
                    abandoner_name: self.name_of(abandoner),
                };
            }
            return Signal::Unchanged;
        }

        if observed == MatchStatus::Playing
            && (record.board() != self.mirror.board()
                || record.current_turn() != self.mirror.current_turn())
        {
            self.mirror.set_board(record.board().clone());
            self.mirror.set_turn(*record.current_turn());
            self.adopt_seats(&record);
            debug!("Reconciled missed move");
            return Signal::Moved;
        }

        if let Some((mark, name)) = self.adopt_seats(&record) {
            return Signal::SeatFilled { mark, name };
        }

        Signal::Unchanged
    }

    /// Applies a move at the given cell.
    ///
    /// Accepted only when the game is in play, the cell is empty, and it
    /// is this client's turn; everything else is a no-op returning `false`.
    /// Local state updates optimistically, the move broadcasts at once,
    /// and the durable write is fire-and-forget.
    #[instrument(skip(self))]
    pub fn play(&mut self, index: usize) -> bool {
        if *self.mirror.status() != MatchStatus::Playing
            || self.mirror.winner().is_some()
            || !self.mirror.board().is_empty(index)
        {
            debug!(index, "Move rejected");
            return false;
        }
        let Role::Player(mark) = self.role() else {
            debug!("Spectators cannot move");
            return false;
        };
        if mark != *self.mirror.current_turn() {
            debug!(index, %mark, "Move rejected: not this client's turn");
            return false;
        }

        let mut board = self.mirror.board().clone();
        board.set(index, Square::Taken(mark)).unwrap();
        let verdict = evaluate(&board);
        let next_turn = if verdict.is_some() {
            mark
        } else {
            mark.opponent()
        };
        let next_status = if verdict.is_some() {
            MatchStatus::Finished
        } else {
            MatchStatus::Playing
        };

        // The mover sees its move with no round trip.
        self.mirror.set_board(board.clone());
        self.mirror.set_turn(next_turn);
        self.mirror.set_status(next_status);
        self.mirror.set_winner(verdict);

        self.channel.publish(MatchEvent::Move {
            board: board.clone(),
            turn: next_turn,
            winner: verdict,
            status: next_status,
        });

        // Replication to the durable row; failure is logged, not surfaced.
        let store = Arc::clone(&self.store);
        let id = self.mirror.id().clone();
        let update = MatchUpdate::default()
            .with_board(board)
            .with_current_turn(next_turn)
            .with_status(next_status)
            .with_winner(verdict);
        tokio::spawn(async move {
            if let Err(e) = store.update(&id, update).await {
                warn!(match_id = %id, error = %e, "Durable move write failed");
            }
        });

        if verdict.is_some() {
            self.record_once();
        }
        info!(index, %mark, status = %next_status, "Move applied");
        true
    }

    /// Concedes the game to the other seat and records the loss.
    ///
    /// Returns `Ok(true)` when the session should exit to the lobby;
    /// spectators and finished games are no-ops.
    ///
    /// # Errors
    ///
    /// Returns a store error when the durable write fails.
    #[instrument(skip(self))]
    pub async fn abandon(&mut self) -> Result<bool, SyncError> {
        let Role::Player(mark) = self.role() else {
            return Ok(false);
        };
        if *self.mirror.status() != MatchStatus::Playing {
            return Ok(false);
        }

        let winner_mark = mark.opponent();
        let name = self.me.public_name();

        self.channel.publish(MatchEvent::GameAbandoned {
            abandoned_by: self.me.id().clone(),
            abandoner_name: name,
            winner_mark,
        });

        let update = MatchUpdate::default()
            .with_status(MatchStatus::Finished)
            .with_winner(Some(Verdict::Win(winner_mark)))
            .with_abandoned_by(Some(self.me.id().clone()));
        self.store.update(self.mirror.id(), update).await?;

        self.mirror.set_status(MatchStatus::Finished);
        self.mirror.set_winner(Some(Verdict::Win(winner_mark)));
        self.mirror.set_abandoned_by(Some(self.me.id().clone()));
        self.record_once();

        info!("Abandoned match");
        Ok(true)
    }

    /// Cancels a match still waiting for its second participant.
    ///
    /// Deletes the record and broadcasts so a concurrently-arriving
    /// second participant is redirected away rather than seated into a
    /// vanished match. Returns `Ok(true)` when the session should exit.
    ///
    /// # Errors
    ///
    /// Returns a store error when the delete fails.
    #[instrument(skip(self))]
    pub async fn cancel(&mut self) -> Result<bool, SyncError> {
        if *self.mirror.status() != MatchStatus::Waiting {
            return Ok(false);
        }
        let Role::Player(_) = self.role() else {
            return Ok(false);
        };

        self.channel.publish(MatchEvent::GameCancelled);
        self.store.delete(self.mirror.id()).await?;
        info!("Match cancelled");
        Ok(true)
    }

    /// Asks the peer for a rematch of a finished, non-abandoned game.
    #[instrument(skip(self))]
    pub fn request_rematch(&mut self) -> bool {
        if *self.mirror.status() != MatchStatus::Finished || self.mirror.abandoned_by().is_some() {
            return false;
        }
        if self.role() == Role::Spectator {
            return false;
        }

        self.latches.waiting_for_rematch = true;
        self.channel.publish(MatchEvent::RematchRequest {
            requestor_name: self.me.public_name(),
        });
        info!("Rematch requested");
        true
    }

    /// Accepts a rematch: resets local state, broadcasts the reset, and
    /// writes the reset record in place (same match id).
    ///
    /// # Errors
    ///
    /// Returns a store error when the durable reset fails.
    #[instrument(skip(self))]
    pub async fn accept_rematch(&mut self) -> Result<bool, SyncError> {
        if *self.mirror.status() != MatchStatus::Finished || self.mirror.abandoned_by().is_some() {
            return Ok(false);
        }
        if self.role() == Role::Spectator {
            return Ok(false);
        }

        self.reset_local(STARTING_MARK);
        self.channel.publish(MatchEvent::GameReset {
            new_turn: STARTING_MARK,
        });

        let update = MatchUpdate::default()
            .with_board(Board::new())
            .with_current_turn(STARTING_MARK)
            .with_status(MatchStatus::Playing)
            .with_winner(None)
            .with_abandoned_by(None);
        self.store.update(self.mirror.id(), update).await?;

        info!("Rematch accepted");
        Ok(true)
    }

    /// Resets the mirror for a new game on the same record.
    fn reset_local(&mut self, new_turn: Mark) {
        self.mirror.set_board(Board::new());
        self.mirror.set_turn(new_turn);
        self.mirror.set_status(MatchStatus::Playing);
        self.mirror.set_winner(None);
        self.mirror.set_abandoned_by(None);
        self.rearm();
    }

    /// Rearms the one-shot latches for a new game instance.
    fn rearm(&mut self) {
        self.latches.recorded = false;
        self.latches.waiting_for_rematch = false;
        self.latches.rematch_incoming = None;
        self.generation += 1;
    }

    /// Records this participant's outcome at most once per game instance.
    ///
    /// Recording is always self-reported: a client writes only its own
    /// outcome, never a peer's. Spectators record nothing.
    fn record_once(&mut self) {
        if self.latches.recorded {
            return;
        }
        let Role::Player(my_mark) = self.role() else {
            return;
        };
        let Some(winner) = *self.mirror.winner() else {
            return;
        };
        self.latches.recorded = true;

        let Some(recorder) = &self.recorder else {
            return;
        };
        let report = OutcomeReport::new(
            self.me.id().clone(),
            self.me.public_name(),
            my_mark,
            winner,
            self.mirror.board().clone(),
            self.mirror.board().move_count(),
            self.opponent_name(my_mark),
            self.mirror.abandoned_by().is_some(),
            MatchKind::Online,
        );
        if let Err(e) = recorder.record(&report) {
            warn!(error = %e, "Failed to record outcome");
        }
    }

    /// Display label for the seat opposite `my_mark`.
    fn opponent_name(&self, my_mark: Mark) -> String {
        self.mirror
            .seat_name(my_mark.opponent())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PLAYER.to_string())
    }

    /// Display name of a seated participant, by id.
    fn name_of(&self, player_id: &str) -> String {
        for mark in [Mark::X, Mark::O] {
            if self.mirror.seat(mark).map(String::as_str) == Some(player_id) {
                if let Some(name) = self.mirror.seat_name(mark) {
                    return name.clone();
                }
            }
        }
        UNKNOWN_PLAYER.to_string()
    }

    /// Adopts seat occupants and names observed on a fresh record.
    ///
    /// Returns the last newly-seen occupant, if any seat changed hands.
    fn adopt_seats(&mut self, record: &MatchRecord) -> Option<(Mark, String)> {
        let mut newly = None;
        for mark in [Mark::X, Mark::O] {
            if let Some(id) = record.seat(mark) {
                if self.mirror.seat(mark) != Some(id) {
                    let name = record
                        .seat_name(mark)
                        .cloned()
                        .unwrap_or_else(|| UNKNOWN_PLAYER.to_string());
                    self.mirror.set_seat(mark, id, &name);
                    newly = Some((mark, name));
                }
            }
        }
        newly
    }
}
