use crate::protocol::types::{LobbyId, MemberView};
use crate::protocol::validation::{
    sanitize_property_key, sanitize_property_value, validate_identifier,
};
use crate::protocol::LobbyEvent;

use super::error::LobbyError;
use super::lobby::PropertyWrite;
use super::LobbyEngine;

impl LobbyEngine {
    /// Write a custom lobby property. Owner-only. A new key beyond the
    /// cardinality cap fails with `Ok(false)`; the privileged `Name` key is
    /// mirrored into the lobby display name.
    pub async fn set_lobby_data(
        &self,
        game_id: &str,
        lobby_id: LobbyId,
        token: &str,
        key: &str,
        value: &str,
    ) -> Result<bool, LobbyError> {
        validate_identifier("gameId", game_id).map_err(LobbyError::Invalid)?;
        let key = sanitize_property_key(key);
        if key.is_empty() {
            return Err(LobbyError::Invalid("data key cannot be empty".to_string()));
        }
        let value = sanitize_property_value(value);
        let identity = self.authenticate(token).await?;

        let Some(lobby) = self.lobby_scoped(game_id, lobby_id) else {
            return Ok(false);
        };

        {
            let mut state = lobby.state();
            if state.closing {
                return Ok(false);
            }
            if !state.is_owner(&identity.user_id) {
                return Err(LobbyError::Forbidden);
            }
            if state.apply_property(key.clone(), value.clone()) == PropertyWrite::CapReached {
                return Ok(false);
            }
        }

        self.emit(game_id, lobby_id, LobbyEvent::LobbyData { key, value })
            .await;
        Ok(true)
    }

    /// Read a single property. No auth: lobby data is readable by anyone
    /// who can name the lobby.
    pub fn get_lobby_data(&self, game_id: &str, lobby_id: LobbyId, key: &str) -> Option<String> {
        let lobby = self.lobby_scoped(game_id, lobby_id)?;
        let state = lobby.state();
        state.properties.get(key).map(str::to_string)
    }

    /// Public member snapshot for the request surface.
    pub fn lobby_member_views(&self, game_id: &str, lobby_id: LobbyId) -> Vec<MemberView> {
        self.lobby_members(game_id, lobby_id)
            .iter()
            .map(crate::protocol::types::Member::view)
            .collect()
    }
}
