use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::protocol::types::{LobbyId, LobbyView, Member, NAME_PROPERTY_KEY};
use crate::protocol::MAX_LOBBY_PROPERTIES;

/// Outcome of writing a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyWrite {
    Inserted,
    Updated,
    CapReached,
}

/// Case-insensitive property map with bounded cardinality.
///
/// Backed by a small vector: the cap is 32 entries, so linear scans beat a
/// hash map and keep the original key casing for display.
#[derive(Debug, Default, Clone)]
pub(crate) struct PropertyMap {
    entries: Vec<(String, String)>,
}

impl PropertyMap {
    fn position(&self, key: &str) -> Option<usize> {
        let needle = key.to_lowercase();
        self.entries
            .iter()
            .position(|(k, _)| k.to_lowercase() == needle)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key)
            .map(|idx| self.entries[idx].1.as_str())
    }

    /// Write a property. An existing key (case-insensitive) is updated in
    /// place and keeps its original casing; a new key is appended unless the
    /// cardinality cap is reached.
    pub fn write(&mut self, key: String, value: String) -> PropertyWrite {
        if let Some(idx) = self.position(&key) {
            self.entries[idx].1 = value;
            return PropertyWrite::Updated;
        }
        if self.entries.len() >= MAX_LOBBY_PROPERTIES {
            return PropertyWrite::CapReached;
        }
        self.entries.push((key, value));
        PropertyWrite::Inserted
    }

    /// Case-insensitive equality check on both key and value, used by
    /// search filters.
    pub fn matches(&self, key: &str, value: &str) -> bool {
        self.get(key)
            .is_some_and(|stored| stored.to_lowercase() == value.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}

/// Outcome of an admission attempt, decided under the lobby mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdmitOutcome {
    Admitted,
    /// The same session token is already a member; joins are idempotent.
    AlreadyMember,
    /// The same user is already a member under a different session token.
    DuplicateUser,
    Full,
    Started,
    Closing,
}

/// Result of removing a member.
#[derive(Debug)]
pub(crate) struct Departure {
    pub member: Member,
    /// Set when the departing member was the owner and a hand-off occurred.
    pub new_owner_user_id: Option<String>,
    pub now_empty: bool,
}

/// Mutable lobby state. All fields are guarded by the owning
/// [`Lobby::state`] mutex.
#[derive(Debug)]
pub(crate) struct LobbyState {
    pub name: Option<String>,
    pub owner_user_id: String,
    pub max_players: u8,
    pub started: bool,
    pub properties: PropertyMap,
    /// Insertion order is load-bearing: index 0 is the owner hand-off
    /// target.
    pub members: Vec<Member>,
    /// Tombstone set when the lobby has been removed from the registry
    /// while a racing caller still holds the `Arc`.
    pub closing: bool,
}

impl LobbyState {
    pub fn member_by_token(&self, token: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.session_token == token)
    }

    fn has_user(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_user_id == user_id
    }

    pub fn admit(&mut self, member: Member) -> AdmitOutcome {
        if self.closing {
            return AdmitOutcome::Closing;
        }
        if self.started {
            return AdmitOutcome::Started;
        }
        if self.member_by_token(&member.session_token).is_some() {
            return AdmitOutcome::AlreadyMember;
        }
        if self.has_user(&member.user_id) {
            return AdmitOutcome::DuplicateUser;
        }
        if self.members.len() >= usize::from(self.max_players) {
            return AdmitOutcome::Full;
        }
        self.members.push(member);
        AdmitOutcome::Admitted
    }

    /// Remove the member holding `token`. Ownership hands off to the
    /// longest-tenured remaining member (index 0 after removal).
    pub fn remove_by_token(&mut self, token: &str) -> Option<Departure> {
        let idx = self
            .members
            .iter()
            .position(|m| m.session_token == token)?;
        let member = self.members.remove(idx);

        let mut new_owner_user_id = None;
        if member.user_id == self.owner_user_id {
            if let Some(next) = self.members.first() {
                self.owner_user_id = next.user_id.clone();
                new_owner_user_id = Some(next.user_id.clone());
            }
        }

        Some(Departure {
            member,
            new_owner_user_id,
            now_empty: self.members.is_empty(),
        })
    }

    /// Set one member's ready flag. Returns the member's user id, or `None`
    /// when the token is not a member or the lobby has started.
    pub fn set_ready(&mut self, token: &str, is_ready: bool) -> Option<String> {
        if self.started || self.closing {
            return None;
        }
        let member = self
            .members
            .iter_mut()
            .find(|m| m.session_token == token)?;
        member.is_ready = is_ready;
        Some(member.user_id.clone())
    }

    /// Mark every member ready, returning the affected user ids.
    pub fn mark_all_ready(&mut self) -> Vec<String> {
        self.members
            .iter_mut()
            .map(|m| {
                m.is_ready = true;
                m.user_id.clone()
            })
            .collect()
    }

    /// Write a property and mirror the privileged `Name` key into the
    /// display name.
    pub fn apply_property(&mut self, key: String, value: String) -> PropertyWrite {
        let outcome = self.properties.write(key.clone(), value.clone());
        if outcome != PropertyWrite::CapReached
            && key.to_lowercase() == NAME_PROPERTY_KEY.to_lowercase()
        {
            self.name = Some(value);
        }
        outcome
    }
}

/// A single lobby: immutable header plus mutex-guarded state.
///
/// The mutex is never held across a suspension point; engine operations
/// acquire, mutate, release, then emit events.
#[derive(Debug)]
pub(crate) struct Lobby {
    id: LobbyId,
    code: String,
    game_id: String,
    created_at: DateTime<Utc>,
    state: Mutex<LobbyState>,
}

impl Lobby {
    pub fn new(
        id: LobbyId,
        code: String,
        game_id: String,
        max_players: u8,
        owner: Member,
    ) -> Self {
        let owner_user_id = owner.user_id.clone();
        Self {
            id,
            code,
            game_id,
            created_at: Utc::now(),
            state: Mutex::new(LobbyState {
                name: None,
                owner_user_id,
                max_players,
                started: false,
                properties: PropertyMap::default(),
                members: vec![owner],
                closing: false,
            }),
        }
    }

    pub fn id(&self) -> LobbyId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Acquire the state mutex. A poisoned lock is recovered rather than
    /// propagated: lobby state stays internally consistent because every
    /// mutation is a single non-panicking sequence.
    pub fn state(&self) -> MutexGuard<'_, LobbyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Project the client-visible view. `caller` is the authenticated user
    /// id when the projection is for a specific caller.
    pub fn project(&self, state: &LobbyState, caller: Option<&str>) -> LobbyView {
        LobbyView {
            lobby_id: self.id,
            lobby_code: self.code.clone(),
            game_id: self.game_id.clone(),
            name: state.name.clone(),
            owner_user_id: state.owner_user_id.clone(),
            max_players: state.max_players,
            created_at_utc: self.created_at,
            started: state.started,
            is_owner: caller.is_some_and(|user| state.owner_user_id == user),
            properties: state.properties.to_map(),
            members: state.members.iter().map(Member::view).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn member(user: &str, token: &str) -> Member {
        Member {
            user_id: user.to_string(),
            display_name: user.to_uppercase(),
            session_token: token.to_string(),
            is_ready: false,
            joined_at: Utc::now(),
        }
    }

    fn lobby_with_capacity(max_players: u8) -> Lobby {
        Lobby::new(
            Uuid::new_v4(),
            "ABCDEF".to_string(),
            "game-1".to_string(),
            max_players,
            member("u1", "t1"),
        )
    }

    #[test]
    fn creator_is_sole_member_and_owner() {
        let lobby = lobby_with_capacity(4);
        let state = lobby.state();
        assert_eq!(state.members.len(), 1);
        assert_eq!(state.owner_user_id, "u1");
        assert!(!state.started);
    }

    #[test]
    fn admission_respects_capacity() {
        let lobby = lobby_with_capacity(2);
        let mut state = lobby.state();
        assert_eq!(state.admit(member("u2", "t2")), AdmitOutcome::Admitted);
        assert_eq!(state.admit(member("u3", "t3")), AdmitOutcome::Full);
        assert_eq!(state.members.len(), 2);
    }

    #[test]
    fn admission_is_idempotent_per_token() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        assert_eq!(state.admit(member("u1", "t1")), AdmitOutcome::AlreadyMember);
        assert_eq!(state.members.len(), 1);
    }

    #[test]
    fn same_user_with_different_token_is_rejected() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        assert_eq!(
            state.admit(member("u1", "other-token")),
            AdmitOutcome::DuplicateUser
        );
    }

    #[test]
    fn started_lobby_admits_nobody() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        state.started = true;
        assert_eq!(state.admit(member("u2", "t2")), AdmitOutcome::Started);
    }

    #[test]
    fn owner_handoff_is_deterministic_by_insertion_order() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        state.admit(member("u2", "t2"));
        state.admit(member("u3", "t3"));

        let departure = state.remove_by_token("t1").expect("owner leaves");
        assert_eq!(departure.member.user_id, "u1");
        assert_eq!(departure.new_owner_user_id.as_deref(), Some("u2"));
        assert_eq!(state.owner_user_id, "u2");
        assert!(!departure.now_empty);
    }

    #[test]
    fn non_owner_departure_keeps_owner() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        state.admit(member("u2", "t2"));

        let departure = state.remove_by_token("t2").expect("member leaves");
        assert_eq!(departure.new_owner_user_id, None);
        assert_eq!(state.owner_user_id, "u1");
    }

    #[test]
    fn last_departure_reports_empty() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        let departure = state.remove_by_token("t1").expect("creator leaves");
        assert!(departure.now_empty);
        assert!(state.members.is_empty());
    }

    #[test]
    fn ready_flag_updates_until_start() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        assert_eq!(state.set_ready("t1", true), Some("u1".to_string()));
        assert!(state.members[0].is_ready);

        state.started = true;
        assert_eq!(state.set_ready("t1", false), None);
        assert!(state.members[0].is_ready);
    }

    #[test]
    fn mark_all_ready_reports_every_member() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        state.admit(member("u2", "t2"));
        let affected = state.mark_all_ready();
        assert_eq!(affected, vec!["u1".to_string(), "u2".to_string()]);
        assert!(state.members.iter().all(|m| m.is_ready));
    }

    #[test]
    fn properties_are_case_insensitive_and_capped() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();

        assert_eq!(
            state.apply_property("Mode".to_string(), "ctf".to_string()),
            PropertyWrite::Inserted
        );
        assert_eq!(
            state.apply_property("MODE".to_string(), "koth".to_string()),
            PropertyWrite::Updated
        );
        assert_eq!(state.properties.get("mode"), Some("koth"));
        assert_eq!(state.properties.len(), 1);

        for i in 1..MAX_LOBBY_PROPERTIES {
            assert_eq!(
                state.apply_property(format!("k{i}"), "v".to_string()),
                PropertyWrite::Inserted
            );
        }
        assert_eq!(
            state.apply_property("one-too-many".to_string(), "v".to_string()),
            PropertyWrite::CapReached
        );
        // Updates still succeed at the cap
        assert_eq!(
            state.apply_property("mode".to_string(), "dm".to_string()),
            PropertyWrite::Updated
        );
    }

    #[test]
    fn name_property_mirrors_into_display_name() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        state.apply_property("name".to_string(), "Friday Night".to_string());
        assert_eq!(state.name.as_deref(), Some("Friday Night"));
        assert_eq!(state.properties.get("Name"), Some("Friday Night"));
    }

    #[test]
    fn search_filter_matching_ignores_case_on_both_sides() {
        let lobby = lobby_with_capacity(4);
        let mut state = lobby.state();
        state.apply_property("Region".to_string(), "EU-West".to_string());
        assert!(state.properties.matches("region", "eu-west"));
        assert!(!state.properties.matches("region", "us-east"));
        assert!(!state.properties.matches("missing", "eu-west"));
    }

    #[test]
    fn projection_computes_owner_flag_per_caller() {
        let lobby = lobby_with_capacity(4);
        {
            let mut state = lobby.state();
            state.admit(member("u2", "t2"));
        }
        let state = lobby.state();
        assert!(lobby.project(&state, Some("u1")).is_owner);
        assert!(!lobby.project(&state, Some("u2")).is_owner);
        assert!(!lobby.project(&state, None).is_owner);
    }
}
