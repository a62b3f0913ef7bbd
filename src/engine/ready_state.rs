use crate::protocol::types::LobbyId;
use crate::protocol::validation::validate_identifier;
use crate::protocol::LobbyEvent;

use super::error::LobbyError;
use super::LobbyEngine;

impl LobbyEngine {
    /// Set the caller's ready flag. Fails with `Ok(false)` once the lobby
    /// has started or when the caller is not a member.
    pub async fn set_ready(
        &self,
        game_id: &str,
        lobby_id: LobbyId,
        token: &str,
        is_ready: bool,
    ) -> Result<bool, LobbyError> {
        validate_identifier("gameId", game_id).map_err(LobbyError::Invalid)?;
        self.authenticate(token).await?;

        let Some(lobby) = self.lobby_scoped(game_id, lobby_id) else {
            return Ok(false);
        };

        let user_id = {
            let mut state = lobby.state();
            match state.set_ready(token, is_ready) {
                Some(user_id) => user_id,
                None => return Ok(false),
            }
        };

        self.emit(
            game_id,
            lobby_id,
            LobbyEvent::MemberReady { user_id, is_ready },
        )
        .await;
        Ok(true)
    }

    /// Mark every member ready. Owner-only; fails with `Ok(false)` once the
    /// lobby has started.
    pub async fn set_everyone_ready(
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

        let affected = {
            let mut state = lobby.state();
            if state.closing || state.started {
                return Ok(false);
            }
            if !state.is_owner(&identity.user_id) {
                return Err(LobbyError::Forbidden);
            }
            state.mark_all_ready()
        };

        self.emit(
            game_id,
            lobby_id,
            LobbyEvent::EveryoneReady {
                affected_members: affected,
            },
        )
        .await;
        Ok(true)
    }
}
