use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Hard limits for lobby inputs. These are protocol constants, not
/// deployment configuration.
pub const MIN_LOBBY_PLAYERS: u8 = 2;
pub const MAX_LOBBY_PLAYERS: u8 = 64;
pub const MAX_IDENTIFIER_LENGTH: usize = 128;
pub const LOBBY_CODE_LENGTH: usize = 6;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 64;
pub const MAX_PROPERTY_KEY_LENGTH: usize = 64;
pub const MAX_PROPERTY_VALUE_LENGTH: usize = 256;
pub const MAX_LOBBY_PROPERTIES: usize = 32;
pub const MIN_SEARCH_RESULTS: usize = 1;
pub const MAX_SEARCH_RESULTS: usize = 100;

/// The privileged property key mirrored into the lobby display name.
pub const NAME_PROPERTY_KEY: &str = "Name";

/// Unique identifier for lobbies
pub type LobbyId = Uuid;

/// A user admitted to a lobby.
///
/// The session token is the bearer captured at admission and is re-validated
/// on every mutating call; it never leaves the process. Clients see a
/// [`MemberView`] instead.
#[derive(Debug, Clone)]
pub struct Member {
    pub user_id: String,
    pub display_name: String,
    pub session_token: String,
    pub is_ready: bool,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn view(&self) -> MemberView {
        MemberView {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            is_ready: self.is_ready,
        }
    }
}

/// Client-visible projection of a member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: String,
    pub display_name: String,
    pub is_ready: bool,
}

/// Client-visible projection of a lobby.
///
/// `is_owner` is computed relative to the caller at projection time; search
/// results carry no caller context and always report `false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyView {
    pub lobby_id: LobbyId,
    pub lobby_code: String,
    pub game_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub owner_user_id: String,
    pub max_players: u8,
    pub created_at_utc: DateTime<Utc>,
    pub started: bool,
    pub is_owner: bool,
    pub properties: HashMap<String, String>,
    pub members: Vec<MemberView>,
}
