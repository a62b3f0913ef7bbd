// Protocol module: event taxonomy, lobby identifiers, input sanitization

pub mod events;
pub mod lobby_codes;
pub mod types;
pub mod validation;

pub use events::LobbyEvent;
pub use types::{
    LobbyId, LobbyView, Member, MemberView, LOBBY_CODE_LENGTH, MAX_DISPLAY_NAME_LENGTH,
    MAX_IDENTIFIER_LENGTH, MAX_LOBBY_PLAYERS, MAX_LOBBY_PROPERTIES, MAX_PROPERTY_KEY_LENGTH,
    MAX_PROPERTY_VALUE_LENGTH, MAX_SEARCH_RESULTS, MIN_LOBBY_PLAYERS, NAME_PROPERTY_KEY,
};
