//! The environment an item is evaluated against: which event fired, with what
//! payload, and which players it involves.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a player in the host game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub i32);

impl PlayerId {
    /// No player could be determined.
    pub const NONE: PlayerId = PlayerId(-1);

    /// Check if this is the "no player" sentinel.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::NONE
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventOrigin {
    /// Host engine callback.
    #[default]
    Engine,
    /// Custom event raised by the user interface.
    Interface,
}

/// Opaque payload accompanying a dispatched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventPayload {
    pub origin: EventOrigin,
    pub data: Value,
}

impl EventPayload {
    /// Payload from a host engine callback.
    pub fn engine(data: Value) -> Self {
        Self {
            origin: EventOrigin::Engine,
            data,
        }
    }

    /// Payload from a UI custom event.
    pub fn interface(data: Value) -> Self {
        Self {
            origin: EventOrigin::Interface,
            data,
        }
    }

    /// Engine event without any payload.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<Value> for EventPayload {
    fn from(data: Value) -> Self {
        Self::engine(data)
    }
}

/// Immediate information about the running environment, captured when an
/// event is dispatched and kept on items that activate from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentProperties {
    /// Name of the event that fired.
    pub event_name: String,

    /// The event payload itself.
    pub payload: EventPayload,

    /// Player that initiated the event.
    pub player: PlayerId,

    /// Other player involved in the event, if any.
    pub alt_player: PlayerId,

    /// Whether the event happened during the local player's turn.
    pub is_local_player_turn: bool,
}

impl EnvironmentProperties {
    /// Build properties for an event, deriving the players from its payload.
    pub fn new(
        event_name: impl Into<String>,
        payload: EventPayload,
        local_player: PlayerId,
        is_local_player_turn: bool,
    ) -> Self {
        let (player, alt_player) = derive_players(&payload, local_player);
        Self {
            event_name: event_name.into(),
            payload,
            player,
            alt_player,
            is_local_player_turn,
        }
    }

    /// Properties for work done outside of any event (loading, debug).
    pub fn detached(local_player: PlayerId) -> Self {
        Self {
            event_name: String::new(),
            payload: EventPayload::empty(),
            player: local_player,
            alt_player: PlayerId::NONE,
            is_local_player_turn: true,
        }
    }

    /// Check if a player takes part in this environment.
    pub fn involves(&self, id: PlayerId) -> bool {
        self.player == id || self.alt_player == id
    }
}

fn player_field(data: &Value, name: &str) -> Option<PlayerId> {
    data.get(name)
        .and_then(Value::as_i64)
        .and_then(|id| i32::try_from(id).ok())
        .map(PlayerId)
}

fn owner_field(data: &Value, name: &str) -> Option<PlayerId> {
    data.get(name).and_then(|component| player_field(component, "owner"))
}

fn pair(data: &Value, first: &str, second: &str) -> Option<(PlayerId, PlayerId)> {
    player_field(data, first).map(|p| (p, player_field(data, second).unwrap_or(PlayerId::NONE)))
}

/// Determine the player(s) an event is about.
///
/// Fields are inspected in a fixed priority order and the first match wins:
/// `player`, `initialPlayer`/`targetPlayer`, `unit.owner`, `owningPlayer`,
/// `player1`/`player2`, `actingPlayer`/`reactingPlayer`, then the local player
/// for UI events, then the owner of `changedBy`, `cityID`, `unitID` or
/// `district`. Returns `(player, alt_player)`.
pub fn derive_players(payload: &EventPayload, local_player: PlayerId) -> (PlayerId, PlayerId) {
    let data = &payload.data;
    if data.is_null() {
        return (local_player, PlayerId::NONE);
    }

    if let Some(player) = player_field(data, "player") {
        return (player, PlayerId::NONE);
    }
    if let Some(players) = pair(data, "initialPlayer", "targetPlayer") {
        return players;
    }
    if let Some(owner) = owner_field(data, "unit") {
        return (owner, PlayerId::NONE);
    }
    if let Some(player) = player_field(data, "owningPlayer") {
        return (player, PlayerId::NONE);
    }
    if let Some(players) = pair(data, "player1", "player2") {
        return players;
    }
    if let Some(players) = pair(data, "actingPlayer", "reactingPlayer") {
        return players;
    }
    if payload.origin == EventOrigin::Interface {
        return (local_player, PlayerId::NONE);
    }

    // Component id fallbacks
    ["changedBy", "cityID", "unitID", "district"]
        .iter()
        .find_map(|name| owner_field(data, name))
        .map(|owner| (owner, PlayerId::NONE))
        .unwrap_or((PlayerId::NONE, PlayerId::NONE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LOCAL: PlayerId = PlayerId(0);

    #[test]
    fn test_null_payload_is_local_player() {
        let players = derive_players(&EventPayload::empty(), LOCAL);
        assert_eq!(players, (LOCAL, PlayerId::NONE));
    }

    #[test]
    fn test_explicit_player_wins() {
        let payload = EventPayload::engine(json!({ "player": 3, "player1": 4, "player2": 5 }));
        assert_eq!(derive_players(&payload, LOCAL), (PlayerId(3), PlayerId::NONE));
    }

    #[test]
    fn test_player_pairs() {
        let payload = EventPayload::engine(json!({ "initialPlayer": 2, "targetPlayer": 7 }));
        assert_eq!(derive_players(&payload, LOCAL), (PlayerId(2), PlayerId(7)));

        let payload = EventPayload::engine(json!({ "actingPlayer": 1 }));
        assert_eq!(derive_players(&payload, LOCAL), (PlayerId(1), PlayerId::NONE));
    }

    #[test]
    fn test_unit_owner_before_owning_player() {
        let payload = EventPayload::engine(json!({ "unit": { "owner": 6 }, "owningPlayer": 2 }));
        assert_eq!(derive_players(&payload, LOCAL), (PlayerId(6), PlayerId::NONE));
    }

    #[test]
    fn test_interface_event_defaults_to_local() {
        let payload = EventPayload::interface(json!({ "cityID": { "owner": 9 } }));
        assert_eq!(derive_players(&payload, LOCAL), (LOCAL, PlayerId::NONE));
    }

    #[test]
    fn test_component_owner_fallback() {
        let payload = EventPayload::engine(json!({ "district": { "owner": 4 } }));
        assert_eq!(derive_players(&payload, LOCAL), (PlayerId(4), PlayerId::NONE));
    }

    #[test]
    fn test_no_player_found() {
        let payload = EventPayload::engine(json!({}));
        assert_eq!(derive_players(&payload, LOCAL), (PlayerId::NONE, PlayerId::NONE));
    }

    #[test]
    fn test_out_of_range_player_is_absent() {
        let payload = EventPayload::engine(json!({ "player": 4_294_967_299_i64, "owningPlayer": 2 }));
        assert_eq!(derive_players(&payload, LOCAL), (PlayerId(2), PlayerId::NONE));

        let payload = EventPayload::engine(json!({ "player": -4_294_967_296_i64 }));
        assert_eq!(derive_players(&payload, LOCAL), (PlayerId::NONE, PlayerId::NONE));
    }

    #[test]
    fn test_environment_involves() {
        let payload = EventPayload::engine(json!({ "player1": 1, "player2": 2 }));
        let env = EnvironmentProperties::new("WarDeclared", payload, LOCAL, true);
        assert!(env.involves(PlayerId(1)));
        assert!(env.involves(PlayerId(2)));
        assert!(!env.involves(LOCAL));
    }
}
