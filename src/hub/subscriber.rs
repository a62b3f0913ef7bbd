use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

/// WebSocket close code for normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// WebSocket close code sent to misbehaving or unresponsive peers.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Commands the hub sends to a subscriber's socket task.
#[derive(Debug, Clone)]
pub enum SubscriberCommand {
    /// Deliver a serialized event as a text frame.
    Deliver(Arc<str>),
    /// Close the socket with the given close code and stop the task.
    Close(u16),
}

/// A connected event subscriber.
///
/// The hub never touches the socket directly: it talks to the connection
/// task through a bounded command channel. A closed or refusing channel is
/// treated as a dead transport.
pub struct Subscriber {
    id: Uuid,
    session_token: String,
    user_id: String,
    tx: mpsc::Sender<SubscriberCommand>,
    /// High-water mark of the most recent heartbeat response.
    last_response: Mutex<Option<Instant>>,
}

impl Subscriber {
    pub(crate) fn new(
        session_token: String,
        user_id: String,
        tx: mpsc::Sender<SubscriberCommand>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_token,
            user_id,
            tx,
            last_response: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Record a heartbeat response from the peer.
    pub fn record_heartbeat(&self) {
        let mut mark = self
            .last_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *mark = Some(Instant::now());
    }

    /// Whether the peer has responded at or after `since`. Comparing
    /// against the ping send time avoids crediting late responses from a
    /// previous round.
    pub fn responded_since(&self, since: Instant) -> bool {
        self.last_response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|mark| mark >= since)
    }

    /// Whether the transport still has a living socket task behind it.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Best-effort delivery. A full or closed channel reports failure; the
    /// caller decides whether that makes the subscriber dead.
    pub(crate) fn try_deliver(&self, payload: Arc<str>) -> bool {
        self.tx.try_send(SubscriberCommand::Deliver(payload)).is_ok()
    }

    /// Best-effort close. Errors are swallowed: a peer that is already gone
    /// needs no close frame.
    pub(crate) fn close(&self, code: u16) {
        let _ = self.tx.try_send(SubscriberCommand::Close(code));
    }
}

/// Classify an inbound text frame as a heartbeat response.
///
/// Accepts the literal tokens `pong`, `hb`, `heartbeat` (trimmed,
/// case-insensitive) or a JSON object whose `type` field is one of those
/// tokens. Everything else is ignored by the core.
pub fn is_heartbeat_response(frame: &str) -> bool {
    let trimmed = frame.trim();
    if is_heartbeat_token(trimmed) {
        return true;
    }
    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(kind) = value.get("type").and_then(serde_json::Value::as_str) {
                return is_heartbeat_token(kind.trim());
            }
        }
    }
    false
}

fn is_heartbeat_token(value: &str) -> bool {
    value.eq_ignore_ascii_case("pong")
        || value.eq_ignore_ascii_case("hb")
        || value.eq_ignore_ascii_case("heartbeat")
}
