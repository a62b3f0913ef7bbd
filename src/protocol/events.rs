use serde::{Deserialize, Serialize};

use super::types::LobbyId;

/// Events broadcast to lobby subscribers.
///
/// Wire format is a single-line JSON object with a snake_case `type`
/// discriminator and camelCase payload keys, e.g.
/// `{"type":"member_left","userId":"u1","newOwnerUserId":"u2"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LobbyEvent {
    #[serde(rename_all = "camelCase")]
    LobbyCreated {
        lobby_id: LobbyId,
        owner_user_id: String,
        owner_display_name: String,
        max_players: u8,
    },
    #[serde(rename_all = "camelCase")]
    MemberJoined { user_id: String, display_name: String },
    /// `new_owner_user_id` is present only when the departing member was the
    /// owner and a hand-off occurred.
    #[serde(rename_all = "camelCase")]
    MemberLeft {
        user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_owner_user_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    MemberReady { user_id: String, is_ready: bool },
    #[serde(rename_all = "camelCase")]
    EveryoneReady { affected_members: Vec<String> },
    LobbyData { key: String, value: String },
    LobbyStarted,
    LobbyEmpty,
    #[serde(rename_all = "camelCase")]
    LobbyDeleted { lobby_id: LobbyId, game_id: String },
    /// Server-initiated heartbeat probe; `ts` is the send time in epoch
    /// milliseconds.
    Ping { ts: i64 },
}

impl LobbyEvent {
    /// Short name of the event as it appears in the wire `type` field.
    /// Used for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LobbyCreated { .. } => "lobby_created",
            Self::MemberJoined { .. } => "member_joined",
            Self::MemberLeft { .. } => "member_left",
            Self::MemberReady { .. } => "member_ready",
            Self::EveryoneReady { .. } => "everyone_ready",
            Self::LobbyData { .. } => "lobby_data",
            Self::LobbyStarted => "lobby_started",
            Self::LobbyEmpty => "lobby_empty",
            Self::LobbyDeleted { .. } => "lobby_deleted",
            Self::Ping { .. } => "ping",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn events_serialize_with_snake_case_type_and_camel_case_fields() {
        let event = LobbyEvent::MemberLeft {
            user_id: "u1".to_string(),
            new_owner_user_id: Some("u2".to_string()),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"member_left","userId":"u1","newOwnerUserId":"u2"}"#
        );
    }

    #[test]
    fn member_left_omits_absent_owner_handoff() {
        let event = LobbyEvent::MemberLeft {
            user_id: "u1".to_string(),
            new_owner_user_id: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"member_left","userId":"u1"}"#);
    }

    #[test]
    fn unit_events_serialize_as_bare_type_objects() {
        let json = serde_json::to_string(&LobbyEvent::LobbyEmpty).unwrap();
        assert_eq!(json, r#"{"type":"lobby_empty"}"#);

        let json = serde_json::to_string(&LobbyEvent::LobbyStarted).unwrap();
        assert_eq!(json, r#"{"type":"lobby_started"}"#);
    }

    #[test]
    fn ping_round_trips() {
        let event = LobbyEvent::Ping { ts: 1_700_000_000_000 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"ping","ts":1700000000000}"#);
        let back: LobbyEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn lobby_deleted_carries_both_scope_ids() {
        let lobby_id = Uuid::new_v4();
        let event = LobbyEvent::LobbyDeleted {
            lobby_id,
            game_id: "g1".to_string(),
        };
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(value["type"], "lobby_deleted");
        assert_eq!(value["lobbyId"], lobby_id.to_string());
        assert_eq!(value["gameId"], "g1");
    }
}
