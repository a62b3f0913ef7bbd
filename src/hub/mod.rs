//! Event Hub: subscriber registry, broadcast fan-out, heartbeat liveness,
//! and coordinated lobby teardown.
//!
//! The hub owns one subscriber set per `(game_id, lobby_id)` channel, a
//! per-channel heartbeat loop, and the idle-reap timers. It reaches back
//! into the engine through the narrow [`MembershipBackend`] seam to evict
//! members whose transport has died and to drain lobbies during teardown.

mod cleanup;
mod heartbeat;
pub mod subscriber;

pub use subscriber::{
    is_heartbeat_response, Subscriber, SubscriberCommand, CLOSE_NORMAL, CLOSE_POLICY_VIOLATION,
};

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engine::EventSink;
use crate::protocol::types::{LobbyId, Member};
use crate::protocol::LobbyEvent;

/// Cadence of the heartbeat loop: one ping, a response window, then a rest.
pub const PING_INTERVAL: Duration = Duration::from_secs(10);
/// How long subscribers have to answer a ping before they are considered
/// dead.
pub const PONG_TIMEOUT: Duration = Duration::from_secs(15);
/// How long a lobby may sit with zero subscribers before it is reaped.
pub const IDLE_REAP_DELAY: Duration = Duration::from_secs(45);

/// The slice of the engine the hub needs for liveness-driven eviction.
/// Errors are swallowed at this seam: the engine's membership state is
/// authoritative and a rejected token simply reports `false`.
#[async_trait]
pub trait MembershipBackend: Send + Sync {
    async fn evict(&self, game_id: &str, lobby_id: LobbyId, token: &str) -> bool;
    async fn evict_by_token(&self, game_id: &str, token: &str) -> bool;
    fn member_snapshot(&self, game_id: &str, lobby_id: LobbyId) -> Vec<Member>;
}

pub(crate) type ChannelKey = (String, LobbyId);
type SubscriberSet = Arc<DashMap<Uuid, Arc<Subscriber>>>;

pub struct EventHub {
    pub(crate) engine: Arc<dyn MembershipBackend>,
    /// `(game_id, lobby_id) → subscriber set`.
    channels: DashMap<ChannelKey, SubscriberSet>,
    /// Channels with a running heartbeat loop. Entry API gives the
    /// start-at-most-once guarantee.
    pub(crate) heartbeat_active: DashMap<ChannelKey, ()>,
    /// Channels with an armed idle-cleanup timer.
    pub(crate) cleanup_pending: DashMap<ChannelKey, ()>,
    pub(crate) shutdown: CancellationToken,
    /// Self-handle for spawning background loops from `&self` methods.
    me: Weak<EventHub>,
}

impl EventHub {
    pub fn new(engine: Arc<dyn MembershipBackend>, shutdown: CancellationToken) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            engine,
            channels: DashMap::new(),
            heartbeat_active: DashMap::new(),
            cleanup_pending: DashMap::new(),
            shutdown,
            me: me.clone(),
        })
    }

    /// Admit a subscriber to a lobby channel and make sure its heartbeat
    /// loop is running.
    pub fn subscribe(
        &self,
        game_id: &str,
        lobby_id: LobbyId,
        session_token: String,
        user_id: String,
        tx: mpsc::Sender<SubscriberCommand>,
    ) -> Arc<Subscriber> {
        let key = (game_id.to_string(), lobby_id);
        let subscriber = Arc::new(Subscriber::new(session_token, user_id, tx));

        let set = self
            .channels
            .entry(key.clone())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .clone();
        set.insert(subscriber.id(), subscriber.clone());

        tracing::info!(
            %lobby_id,
            game_id,
            subscriber_id = %subscriber.id(),
            user_id = subscriber.user_id(),
            "Subscriber connected"
        );

        self.ensure_heartbeat(&key);
        subscriber
    }

    /// Remove a subscriber after its transport closed. The last departure
    /// arms the idle-cleanup timer.
    pub fn unsubscribe(&self, game_id: &str, lobby_id: LobbyId, subscriber_id: Uuid) {
        let key = (game_id.to_string(), lobby_id);
        let Some(set) = self.channel(&key) else {
            return;
        };
        if set.remove(&subscriber_id).is_some() {
            tracing::info!(%lobby_id, game_id, subscriber_id = %subscriber_id, "Subscriber disconnected");
        }
        if set.is_empty() {
            self.schedule_idle_cleanup(&key);
        }
    }

    pub fn subscriber_count(&self, game_id: &str, lobby_id: LobbyId) -> usize {
        self.channel(&(game_id.to_string(), lobby_id))
            .map_or(0, |set| set.len())
    }

    pub(crate) fn channel(&self, key: &ChannelKey) -> Option<SubscriberSet> {
        self.channels.get(key).map(|entry| entry.value().clone())
    }

    /// Snapshot a set before iterating: removal during DashMap iteration on
    /// the same shard can deadlock.
    pub(crate) fn snapshot(set: &SubscriberSet) -> Vec<Arc<Subscriber>> {
        set.iter().map(|entry| entry.value().clone()).collect()
    }

    pub(crate) fn upgrade(&self) -> Option<Arc<Self>> {
        self.me.upgrade()
    }

    /// Serialize an event once and fan it out. Dead transports are pruned
    /// and closed with normal-closure.
    async fn broadcast_event(&self, game_id: &str, lobby_id: LobbyId, event: &LobbyEvent) {
        let key = (game_id.to_string(), lobby_id);
        let Some(set) = self.channel(&key) else {
            return;
        };

        let payload: Arc<str> = match serde_json::to_string(event) {
            Ok(json) => Arc::from(json),
            Err(err) => {
                tracing::error!(%lobby_id, game_id, error = %err, "Failed to serialize lobby event");
                return;
            }
        };

        let mut dead = Vec::new();
        for subscriber in Self::snapshot(&set) {
            if !subscriber.is_open() || !subscriber.try_deliver(payload.clone()) {
                dead.push(subscriber);
            }
        }
        for subscriber in dead {
            tracing::debug!(
                %lobby_id,
                game_id,
                subscriber_id = %subscriber.id(),
                "Dropping dead subscriber during broadcast"
            );
            set.remove(&subscriber.id());
            subscriber.close(CLOSE_NORMAL);
        }

        if set.is_empty() {
            self.schedule_idle_cleanup(&key);
        } else {
            self.ensure_heartbeat(&key);
        }
    }

    /// Drop a channel's bookkeeping and tell remaining subscribers the
    /// lobby is gone.
    pub(crate) async fn close_channel(&self, game_id: &str, lobby_id: LobbyId) {
        let key = (game_id.to_string(), lobby_id);
        let Some((_, set)) = self.channels.remove(&key) else {
            return;
        };

        tracing::info!(%lobby_id, game_id, subscribers = set.len(), "Closing lobby channel");

        let farewell = LobbyEvent::LobbyDeleted {
            lobby_id,
            game_id: game_id.to_string(),
        };
        let payload: Option<Arc<str>> = serde_json::to_string(&farewell).ok().map(Arc::from);

        for subscriber in Self::snapshot(&set) {
            if subscriber.is_open() {
                if let Some(payload) = &payload {
                    subscriber.try_deliver(payload.clone());
                }
            }
            subscriber.close(CLOSE_NORMAL);
        }
    }
}

#[async_trait]
impl EventSink for EventHub {
    async fn broadcast(&self, game_id: &str, lobby_id: LobbyId, event: &LobbyEvent) {
        self.broadcast_event(game_id, lobby_id, event).await;
    }

    async fn close_lobby(&self, game_id: &str, lobby_id: LobbyId) {
        self.close_channel(game_id, lobby_id).await;
    }
}
