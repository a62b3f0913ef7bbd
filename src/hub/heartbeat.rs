use std::sync::Arc;

use tokio::time::{sleep, Instant};

use crate::protocol::LobbyEvent;

use super::subscriber::CLOSE_POLICY_VIOLATION;
use super::{ChannelKey, EventHub, PING_INTERVAL, PONG_TIMEOUT};

impl EventHub {
    /// Start the channel's heartbeat loop if it is not already running.
    /// The entry insert is the compare-and-set: at most one loop per
    /// channel.
    pub(crate) fn ensure_heartbeat(&self, key: &ChannelKey) {
        if self.shutdown.is_cancelled() {
            return;
        }
        match self.heartbeat_active.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
            }
        }
        let Some(hub) = self.upgrade() else {
            self.heartbeat_active.remove(key);
            return;
        };
        let key = key.clone();
        tokio::spawn(async move {
            heartbeat_loop(hub, key).await;
        });
    }
}

/// Per-channel liveness loop.
///
/// Each iteration pings every open subscriber, waits out the response
/// window, then partitions the set against the ping send time. Total
/// silence force-closes the lobby; individual non-responders are evicted
/// through the engine so membership events still flow to the survivors.
async fn heartbeat_loop(hub: Arc<EventHub>, key: ChannelKey) {
    let (game_id, lobby_id) = (key.0.clone(), key.1);
    tracing::debug!(%lobby_id, game_id = %game_id, "Heartbeat loop started");

    loop {
        if hub.shutdown.is_cancelled() {
            break;
        }
        let Some(set) = hub.channel(&key) else {
            break;
        };
        if set.is_empty() {
            break;
        }

        let ping_sent_at = Instant::now();
        let ping = LobbyEvent::Ping {
            ts: chrono::Utc::now().timestamp_millis(),
        };
        let payload: Arc<str> = match serde_json::to_string(&ping) {
            Ok(json) => Arc::from(json),
            Err(err) => {
                tracing::error!(%lobby_id, error = %err, "Failed to serialize ping");
                break;
            }
        };
        for subscriber in EventHub::snapshot(&set) {
            if subscriber.is_open() {
                subscriber.try_deliver(payload.clone());
            }
        }

        tokio::select! {
            () = hub.shutdown.cancelled() => break,
            () = sleep(PONG_TIMEOUT) => {}
        }

        let Some(set) = hub.channel(&key) else {
            break;
        };
        let subscribers = EventHub::snapshot(&set);
        if subscribers.is_empty() {
            // Everyone disconnected during the window; idle cleanup is
            // already armed by the unsubscribe path.
            break;
        }

        let (responders, silent): (Vec<_>, Vec<_>) = subscribers
            .into_iter()
            .partition(|s| s.responded_since(ping_sent_at));

        if responders.is_empty() {
            tracing::warn!(
                %lobby_id,
                game_id = %game_id,
                silent = silent.len(),
                "No heartbeat responses from any subscriber, force closing lobby"
            );
            hub.force_close_lobby(&key).await;
            break;
        }

        for subscriber in silent {
            tracing::info!(
                %lobby_id,
                game_id = %game_id,
                subscriber_id = %subscriber.id(),
                user_id = subscriber.user_id(),
                "Evicting unresponsive subscriber"
            );
            set.remove(&subscriber.id());
            subscriber.close(CLOSE_POLICY_VIOLATION);
            // A token the engine has since revoked just reports false here;
            // the subscriber is already out of the hub either way.
            let _ = hub
                .engine
                .evict_by_token(&game_id, subscriber.session_token())
                .await;
        }

        tokio::select! {
            () = hub.shutdown.cancelled() => break,
            () = sleep(PING_INTERVAL) => {}
        }
    }

    hub.heartbeat_active.remove(&key);
    tracing::debug!(%lobby_id, game_id = %game_id, "Heartbeat loop stopped");

    // A subscriber may have arrived between the empty check and the marker
    // removal; restart rather than leave the channel without liveness.
    if !hub.shutdown.is_cancelled() {
        if let Some(set) = hub.channel(&key) {
            if !set.is_empty() {
                hub.ensure_heartbeat(&key);
            }
        }
    }
}
