use crate::state::RoomState;
use serde::{Deserialize, Serialize};

/// Per-room version counter. A freshly created room is at version 1.
pub type Version = u64;

// --- client -> server ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Long-poll: answered as soon as the room is at a version other than
    /// `known_version`, or with `Timeout` once the poll window closes.
    /// `None` asks for the current snapshot straight away.
    List { room: String, known_version: Option<Version> },
    /// Replace the room state if it is still at `base_version`.
    Commit { room: String, base_version: Version, state: RoomState },
}

// --- server -> client ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Snapshot { room: String, version: Version, data: RoomState },
    Timeout { room: String },
    CommitResult { room: String, success: bool },
    Error { message: String },
}

impl ClientMessage {
    pub fn room(&self) -> &str {
        match self {
            ClientMessage::List { room, .. } | ClientMessage::Commit { room, .. } => room,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_are_tagged_by_type() {
        let msg = ClientMessage::List { room: "den".into(), known_version: Some(3) };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "type": "list", "room": "den", "known_version": 3 })
        );
        assert_eq!(msg.room(), "den");

        let reply: ServerMessage =
            serde_json::from_str(r#"{"type":"commit_result","room":"den","success":false}"#).unwrap();
        assert_eq!(reply, ServerMessage::CommitResult { room: "den".into(), success: false });
    }

    #[test]
    fn snapshot_carries_the_room_state() {
        let msg = ServerMessage::Snapshot { room: "den".into(), version: 1, data: RoomState::default() };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["data"]["phase"], "setup");
        assert_eq!(serde_json::from_value::<ServerMessage>(value).unwrap(), msg);
    }
}
