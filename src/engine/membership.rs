use crate::protocol::types::{LobbyId, LobbyView, Member};
use crate::protocol::validation::{sanitize_display_name, validate_identifier};
use crate::protocol::LobbyEvent;

use super::error::LobbyError;
use super::lobby::AdmitOutcome;
use super::LobbyEngine;

impl LobbyEngine {
    /// Join an existing lobby. Joining a lobby the caller is already in
    /// returns the current view idempotently, with no event. Scope
    /// mismatches, capacity, started lobbies, and cross-lobby jumps all
    /// surface as `NotFound`.
    pub async fn join_lobby(
        &self,
        game_id: &str,
        lobby_id: LobbyId,
        token: &str,
    ) -> Result<LobbyView, LobbyError> {
        validate_identifier("gameId", game_id).map_err(LobbyError::Invalid)?;
        let identity = self.authenticate(token).await?;

        let lobby = self
            .lobby_scoped(game_id, lobby_id)
            .ok_or(LobbyError::NotFound)?;

        // A token indexed to a different lobby in the same game cannot jump
        // lobbies without an explicit leave.
        if let Some(current) = self.membership(game_id, token) {
            if current != lobby_id {
                return Err(LobbyError::NotFound);
            }
        }

        let member = Member {
            user_id: identity.user_id.clone(),
            display_name: sanitize_display_name(&identity.display_name),
            session_token: token.to_string(),
            is_ready: false,
            joined_at: chrono::Utc::now(),
        };
        let display_name = member.display_name.clone();

        // Capacity and lifecycle are re-checked under the lobby mutex; this
        // is where concurrent joiners are arbitrated. The membership index
        // is published under the same mutex so a racing leave cannot strand
        // a stale index entry.
        let (outcome, view) = {
            let mut state = lobby.state();
            let outcome = state.admit(member);
            let view = match outcome {
                AdmitOutcome::Admitted | AdmitOutcome::AlreadyMember => {
                    Some(lobby.project(&state, Some(&identity.user_id)))
                }
                _ => None,
            };
            if outcome == AdmitOutcome::Admitted {
                self.memberships
                    .insert((game_id.to_string(), token.to_string()), lobby_id);
            }
            (outcome, view)
        };

        match outcome {
            AdmitOutcome::AlreadyMember => {
                // view is always projected for this outcome
                view.ok_or_else(|| LobbyError::Internal("missing idempotent view".to_string()))
            }
            AdmitOutcome::Admitted => {
                tracing::info!(%lobby_id, game_id, user_id = %identity.user_id, "Member joined lobby");
                self.emit(
                    game_id,
                    lobby_id,
                    LobbyEvent::MemberJoined {
                        user_id: identity.user_id,
                        display_name,
                    },
                )
                .await;
                view.ok_or_else(|| LobbyError::Internal("missing join view".to_string()))
            }
            AdmitOutcome::Full
            | AdmitOutcome::Started
            | AdmitOutcome::DuplicateUser
            | AdmitOutcome::Closing => Err(LobbyError::NotFound),
        }
    }

    /// Remove the caller from a lobby. Returns `Ok(false)` when the lobby,
    /// scope, or membership does not match. The last departure tears the
    /// lobby down: `lobby_empty` is the only externally visible trace.
    pub async fn leave_lobby(
        &self,
        game_id: &str,
        lobby_id: LobbyId,
        token: &str,
    ) -> Result<bool, LobbyError> {
        validate_identifier("gameId", game_id).map_err(LobbyError::Invalid)?;
        self.authenticate(token).await?;

        let Some(lobby) = self.lobby_scoped(game_id, lobby_id) else {
            return Ok(false);
        };

        // The departure decision, index cleanup, and registry removal all
        // happen under the lobby mutex so no joiner can slip into a lobby
        // that is being destroyed. All of these are non-suspending.
        let departure = {
            let mut state = lobby.state();
            let Some(departure) = state.remove_by_token(token) else {
                return Ok(false);
            };
            self.memberships
                .remove(&(game_id.to_string(), token.to_string()));
            if departure.now_empty {
                state.closing = true;
                self.codes.remove(lobby.code());
                self.lobbies.remove(&lobby_id);
            }
            departure
        };

        if departure.now_empty {
            tracing::info!(%lobby_id, game_id, "Last member left, destroying lobby");
            self.emit(game_id, lobby_id, LobbyEvent::LobbyEmpty).await;
            if let Some(sink) = self.sink.get() {
                sink.close_lobby(game_id, lobby_id).await;
            }
        } else {
            tracing::info!(
                %lobby_id,
                game_id,
                user_id = %departure.member.user_id,
                new_owner = departure.new_owner_user_id.as_deref().unwrap_or(""),
                "Member left lobby"
            );
            self.emit(
                game_id,
                lobby_id,
                LobbyEvent::MemberLeft {
                    user_id: departure.member.user_id,
                    new_owner_user_id: departure.new_owner_user_id,
                },
            )
            .await;
        }

        Ok(true)
    }

    /// Leave whatever lobby the token is indexed to in this game.
    pub async fn leave_lobby_by_token(
        &self,
        game_id: &str,
        token: &str,
    ) -> Result<bool, LobbyError> {
        let Some(lobby_id) = self.membership(game_id, token) else {
            return Ok(false);
        };
        self.leave_lobby(game_id, lobby_id, token).await
    }

    /// Snapshot of a lobby's members, including session tokens. Internal:
    /// the hub uses this to drive eviction; the public surface projects
    /// [`crate::protocol::MemberView`] instead.
    pub fn lobby_members(&self, game_id: &str, lobby_id: LobbyId) -> Vec<Member> {
        match self.lobby_scoped(game_id, lobby_id) {
            Some(lobby) => {
                let state = lobby.state();
                state.members.clone()
            }
            None => Vec::new(),
        }
    }
}
