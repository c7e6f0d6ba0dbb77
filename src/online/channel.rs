//! Per-match broadcast channel.
//!
//! The low-latency path between connected clients. Delivery is best-effort
//! and in order per sender while attached; nothing survives a detach. A
//! client never receives its own publishes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::MatchEvent;
use super::record::MatchId;

const TOPIC_BUFFER: usize = 64;

#[derive(Debug, Clone)]
struct Envelope {
    from: Uuid,
    event: MatchEvent,
}

/// Hub of per-match broadcast topics.
#[derive(Debug, Clone, Default)]
pub struct ChannelHub {
    topics: Arc<Mutex<HashMap<MatchId, broadcast::Sender<Envelope>>>>,
}

impl ChannelHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches to a match topic, creating it on first use.
    pub fn join(&self, match_id: &str) -> MatchChannel {
        let mut topics = self.topics.lock().unwrap();
        let tx = topics
            .entry(match_id.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_BUFFER).0)
            .clone();
        debug!(match_id, "Joined broadcast topic");
        MatchChannel {
            token: Uuid::new_v4(),
            rx: tx.subscribe(),
            tx,
        }
    }
}

/// One client's attachment to a match topic.
#[derive(Debug)]
pub struct MatchChannel {
    token: Uuid,
    tx: broadcast::Sender<Envelope>,
    rx: broadcast::Receiver<Envelope>,
}

impl MatchChannel {
    /// Publishes an event to every other attached client.
    pub fn publish(&self, event: MatchEvent) {
        debug!(?event, "Publishing event");
        // A send with no peers attached is not an error.
        let _ = self.tx.send(Envelope {
            from: self.token,
            event,
        });
    }

    /// Receives the next event from a peer.
    ///
    /// Own publishes are skipped. A lagged receiver drops what it missed
    /// and keeps going; the durable-record change feed covers the gap.
    /// Returns `None` once the topic is closed.
    pub async fn recv(&mut self) -> Option<MatchEvent> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.from == self.token => continue,
                Ok(envelope) => return Some(envelope.event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Broadcast receiver lagged; events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
