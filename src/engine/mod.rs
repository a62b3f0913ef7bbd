//! Lobby State Engine: the authoritative, invariant-preserving lobby
//! registry.
//!
//! The engine owns three concurrent indexes — lobbies by id, lobby codes,
//! and per-(game, token) memberships — plus a per-lobby mutex for member
//! and property mutation. Events are emitted into the [`EventSink`] after
//! the lobby mutex is released, so the hub can never re-enter a locked
//! lobby.

pub mod error;
pub(crate) mod lobby;
mod lobby_data;
mod membership;
mod ready_state;

pub use error::LobbyError;

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::auth::{SessionIdentity, TokenValidator};
use crate::protocol::lobby_codes::{
    fallback_lobby_code, generate_lobby_code, LOBBY_CODE_RETRIES,
};
use crate::protocol::types::{LobbyId, LobbyView, Member, MemberView};
use crate::protocol::validation::{
    clamp_max_players, clamp_search_limit, sanitize_display_name, sanitize_property_key,
    sanitize_property_value, validate_identifier,
};
use crate::protocol::LobbyEvent;

use lobby::Lobby;

/// Where engine events go. Implemented by the event hub; installed after
/// construction to break the Engine↔Hub cycle.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Fan an event out to the lobby's subscribers. Fire-and-forget:
    /// delivery failures never surface to engine callers.
    async fn broadcast(&self, game_id: &str, lobby_id: LobbyId, event: &LobbyEvent);

    /// Tear down subscriber bookkeeping for a lobby that no longer exists.
    async fn close_lobby(&self, game_id: &str, lobby_id: LobbyId);
}

type MembershipKey = (String, String);

pub struct LobbyEngine {
    validator: Arc<dyn TokenValidator>,
    /// `lobby_id → Lobby`. Lookups clone the `Arc` and drop the map guard
    /// before touching the lobby mutex.
    lobbies: DashMap<LobbyId, Arc<Lobby>>,
    /// `lobby_code → lobby_id`; the uniqueness arbiter for codes.
    codes: DashMap<String, LobbyId>,
    /// `(game_id, session_token) → lobby_id`; enforces
    /// single-lobby-per-(game, token).
    memberships: DashMap<MembershipKey, LobbyId>,
    sink: OnceLock<Arc<dyn EventSink>>,
}

impl LobbyEngine {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            validator,
            lobbies: DashMap::new(),
            codes: DashMap::new(),
            memberships: DashMap::new(),
            sink: OnceLock::new(),
        }
    }

    /// Install the event sink. May be called once; later calls are ignored.
    pub fn install_sink(&self, sink: Arc<dyn EventSink>) {
        let _ = self.sink.set(sink);
    }

    pub(crate) async fn emit(&self, game_id: &str, lobby_id: LobbyId, event: LobbyEvent) {
        tracing::debug!(%lobby_id, game_id, event = event.kind(), "Emitting lobby event");
        if let Some(sink) = self.sink.get() {
            sink.broadcast(game_id, lobby_id, &event).await;
        }
    }

    pub(crate) async fn authenticate(
        &self,
        token: &str,
    ) -> Result<SessionIdentity, LobbyError> {
        validate_identifier("session token", token).map_err(LobbyError::Invalid)?;
        Ok(self.validator.validate(token).await?)
    }

    /// Look up a lobby and verify its tenant scope. The returned `Arc` is
    /// cloned out of the registry so no map guard is held by the caller.
    pub(crate) fn lobby_scoped(&self, game_id: &str, lobby_id: LobbyId) -> Option<Arc<Lobby>> {
        let lobby = self.lobbies.get(&lobby_id).map(|entry| entry.value().clone())?;
        (lobby.game_id() == game_id).then_some(lobby)
    }

    pub(crate) fn membership(&self, game_id: &str, token: &str) -> Option<LobbyId> {
        self.memberships
            .get(&(game_id.to_string(), token.to_string()))
            .map(|entry| *entry.value())
    }

    /// Reserve a unique lobby code. Collisions are retried against the
    /// clean alphabet, then resolved with hex fallback codes. The entry
    /// insert makes the uniqueness check and the reservation one atomic
    /// step.
    fn reserve_code(&self, lobby_id: LobbyId) -> String {
        for _ in 0..LOBBY_CODE_RETRIES {
            let candidate = generate_lobby_code();
            if self.try_reserve(&candidate, lobby_id) {
                return candidate;
            }
        }
        loop {
            let candidate = fallback_lobby_code();
            if self.try_reserve(&candidate, lobby_id) {
                tracing::warn!(%lobby_id, code = %candidate, "Lobby code collisions exhausted retries, using hex fallback");
                return candidate;
            }
        }
    }

    fn try_reserve(&self, code: &str, lobby_id: LobbyId) -> bool {
        match self.codes.entry(code.to_string()) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(lobby_id);
                true
            }
            dashmap::mapref::entry::Entry::Occupied(_) => false,
        }
    }

    /// Create a lobby with the caller as sole member and owner.
    pub async fn create_lobby(
        &self,
        game_id: &str,
        token: &str,
        max_players: u32,
        properties: Vec<(String, String)>,
    ) -> Result<LobbyView, LobbyError> {
        validate_identifier("gameId", game_id).map_err(LobbyError::Invalid)?;
        let identity = self.authenticate(token).await?;

        let max_players = clamp_max_players(max_players);
        let lobby_id = Uuid::new_v4();
        let code = self.reserve_code(lobby_id);

        let creator = Member {
            user_id: identity.user_id.clone(),
            display_name: sanitize_display_name(&identity.display_name),
            session_token: token.to_string(),
            is_ready: false,
            joined_at: chrono::Utc::now(),
        };
        let owner_display_name = creator.display_name.clone();

        let lobby = Arc::new(Lobby::new(
            lobby_id,
            code,
            game_id.to_string(),
            max_players,
            creator,
        ));

        // Publication happens under the lobby mutex: once the lobby is
        // discoverable in the registry, a racing leave must wait for the
        // mutex and therefore observes the membership index entry too.
        let view = {
            let mut state = lobby.state();
            for (key, value) in properties {
                let key = sanitize_property_key(&key);
                if key.is_empty() {
                    continue;
                }
                let value = sanitize_property_value(&value);
                state.apply_property(key, value);
            }
            let view = lobby.project(&state, Some(&identity.user_id));
            self.lobbies.insert(lobby_id, lobby.clone());
            self.memberships
                .insert((game_id.to_string(), token.to_string()), lobby_id);
            view
        };

        tracing::info!(
            %lobby_id,
            game_id,
            lobby_code = %view.lobby_code,
            owner = %identity.user_id,
            max_players,
            "Lobby created"
        );

        self.emit(
            game_id,
            lobby_id,
            LobbyEvent::LobbyCreated {
                lobby_id,
                owner_user_id: identity.user_id,
                owner_display_name,
                max_players,
            },
        )
        .await;

        Ok(view)
    }

    /// Fetch the caller's view of a lobby. Read-only: visibility is gated
    /// on the token's stored membership, not on a validator round-trip, so
    /// a member whose session has since been revoked can still see the
    /// lobby they are in.
    pub fn get_lobby(
        &self,
        game_id: &str,
        lobby_id: LobbyId,
        token: &str,
    ) -> Result<LobbyView, LobbyError> {
        validate_identifier("gameId", game_id).map_err(LobbyError::Invalid)?;
        let lobby = self
            .lobby_scoped(game_id, lobby_id)
            .ok_or(LobbyError::NotFound)?;

        let state = lobby.state();
        let caller = state
            .member_by_token(token)
            .map(|member| member.user_id.clone())
            .ok_or(LobbyError::NotFound)?;
        Ok(lobby.project(&state, Some(&caller)))
    }

    /// Flip the started flag. Owner-only; idempotent failure on a second
    /// start.
    pub async fn start_lobby(
        &self,
        game_id: &str,
        lobby_id: LobbyId,
        token: &str,
    ) -> Result<bool, LobbyError> {
        validate_identifier("gameId", game_id).map_err(LobbyError::Invalid)?;
        let identity = self.authenticate(token).await?;
        let Some(lobby) = self.lobby_scoped(game_id, lobby_id) else {
            return Ok(false);
        };

        {
            let mut state = lobby.state();
            if state.closing {
                return Ok(false);
            }
            // Ownership is re-checked under the mutex: the caller may have
            // been demoted between validation and mutation.
            if !state.is_owner(&identity.user_id) {
                return Err(LobbyError::Forbidden);
            }
            if state.started {
                return Ok(false);
            }
            state.started = true;
        }

        tracing::info!(%lobby_id, game_id, "Lobby started");
        self.emit(game_id, lobby_id, LobbyEvent::LobbyStarted).await;
        Ok(true)
    }

    /// Flat filtered search over open lobbies in one game, newest first.
    pub fn search_lobbies(
        &self,
        game_id: &str,
        max_rooms: usize,
        filters: &[(String, String)],
    ) -> Vec<LobbyView> {
        let limit = clamp_search_limit(max_rooms);

        // Snapshot the registry before locking any lobby.
        let candidates: Vec<Arc<Lobby>> = self
            .lobbies
            .iter()
            .filter(|entry| entry.value().game_id() == game_id)
            .map(|entry| entry.value().clone())
            .collect();

        let mut views: Vec<LobbyView> = candidates
            .into_iter()
            .filter_map(|lobby| {
                let state = lobby.state();
                if state.closing || state.started {
                    return None;
                }
                if state.members.len() >= usize::from(state.max_players) {
                    return None;
                }
                if !filters
                    .iter()
                    .all(|(key, value)| state.properties.matches(key, value))
                {
                    return None;
                }
                Some(lobby.project(&state, None))
            })
            .collect();

        views.sort_by(|a, b| b.created_at_utc.cmp(&a.created_at_utc));
        views.truncate(limit);
        views
    }

    /// Total members across all lobbies.
    pub fn global_player_count(&self) -> usize {
        let lobbies: Vec<Arc<Lobby>> = self
            .lobbies
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        lobbies
            .into_iter()
            .map(|lobby| lobby.state().members.len())
            .sum()
    }

    pub fn global_lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    pub fn lobby_count_by_game(&self, game_id: &str) -> usize {
        self.lobbies
            .iter()
            .filter(|entry| entry.value().game_id() == game_id)
            .count()
    }

    /// Snapshot of members across one game's lobbies, deduplicated by user.
    pub fn active_players_by_game(&self, game_id: &str) -> Vec<MemberView> {
        let lobbies: Vec<Arc<Lobby>> = self
            .lobbies
            .iter()
            .filter(|entry| entry.value().game_id() == game_id)
            .map(|entry| entry.value().clone())
            .collect();

        let mut seen = HashSet::new();
        let mut players = Vec::new();
        for lobby in lobbies {
            let state = lobby.state();
            for member in &state.members {
                if seen.insert(member.user_id.clone()) {
                    players.push(member.view());
                }
            }
        }
        players
    }
}

/// The narrow seam the hub drives eviction through. Engine errors are
/// swallowed here: a token the validator now rejects simply fails to leave,
/// and membership state stays authoritative.
#[async_trait]
impl crate::hub::MembershipBackend for LobbyEngine {
    async fn evict(&self, game_id: &str, lobby_id: LobbyId, token: &str) -> bool {
        self.leave_lobby(game_id, lobby_id, token)
            .await
            .unwrap_or(false)
    }

    async fn evict_by_token(&self, game_id: &str, token: &str) -> bool {
        self.leave_lobby_by_token(game_id, token)
            .await
            .unwrap_or(false)
    }

    fn member_snapshot(&self, game_id: &str, lobby_id: LobbyId) -> Vec<Member> {
        self.lobby_members(game_id, lobby_id)
    }
}
