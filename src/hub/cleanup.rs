use super::{ChannelKey, EventHub, IDLE_REAP_DELAY};

impl EventHub {
    /// Arm the one-shot idle-cleanup timer for a channel whose subscriber
    /// set just emptied. Re-entrance is guarded by the pending marker; a
    /// subscriber arriving before expiry aborts the reap.
    pub(crate) fn schedule_idle_cleanup(&self, key: &ChannelKey) {
        if self.shutdown.is_cancelled() {
            return;
        }
        match self.cleanup_pending.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
            }
        }
        let Some(hub) = self.upgrade() else {
            self.cleanup_pending.remove(key);
            return;
        };

        let key = key.clone();
        tracing::debug!(
            lobby_id = %key.1,
            game_id = %key.0,
            delay_secs = IDLE_REAP_DELAY.as_secs(),
            "Lobby has no subscribers, scheduling idle cleanup"
        );
        tokio::spawn(async move {
            tokio::select! {
                () = hub.shutdown.cancelled() => {
                    hub.cleanup_pending.remove(&key);
                    return;
                }
                () = tokio::time::sleep(IDLE_REAP_DELAY) => {}
            }
            hub.cleanup_pending.remove(&key);

            if let Some(set) = hub.channel(&key) {
                if !set.is_empty() {
                    tracing::debug!(lobby_id = %key.1, "Subscribers returned, aborting idle cleanup");
                    return;
                }
            }

            tracing::info!(lobby_id = %key.1, game_id = %key.0, "Reaping idle lobby");
            hub.reap(&key).await;
        });
    }

    /// Immediate teardown after total heartbeat failure.
    pub(crate) async fn force_close_lobby(&self, key: &ChannelKey) {
        self.reap(key).await;
    }

    /// Drive every remaining member through the engine's normal leave path
    /// (so `member_left`/`lobby_empty` still fire), then drop the hub's own
    /// bookkeeping and tell lingering transports the lobby is gone.
    async fn reap(&self, key: &ChannelKey) {
        let (game_id, lobby_id) = (key.0.as_str(), key.1);

        let members = self.engine.member_snapshot(game_id, lobby_id);
        for member in members {
            let _ = self
                .engine
                .evict(game_id, lobby_id, &member.session_token)
                .await;
        }

        self.close_channel(game_id, lobby_id).await;
    }
}
