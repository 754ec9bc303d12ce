//! WebSocket event DTOs.
//!
//! Every frame is a JSON object tagged by `"type"` (kebab-case). The
//! two directions are separate enums so a client can never replay a
//! server-only event. Domain payloads (`move`, `new_state`, `payload`)
//! stay `serde_json::Value`: the relay stores and forwards them but
//! never looks inside.
//!
//! Deserialization is the normalization boundary: a frame that does not
//! parse into `ClientEvent` is malformed by definition and is dropped
//! before it can reach any policy code.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Role;

/// Events a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join (or create) a room. `requested_role` accepts
    /// `white`/`black`/`viewer` and the `w`/`b` shorthands.
    Join {
        room_id: String,
        display_name: Option<String>,
        requested_role: Option<Role>,
    },
    /// Leave the current room. The registry association is
    /// authoritative; any `room_id` carried here is ignored.
    Leave {
        #[serde(default)]
        room_id: Option<String>,
    },
    /// A move was played; `new_state` replaces the room's blob.
    Move {
        room_id: String,
        r#move: Value,
        new_state: Value,
    },
    /// Full state reset; relayed to the whole room, sender included.
    FullStateSync { room_id: String, new_state: Value },
    /// Annotation overlay update.
    Annotation { room_id: String, payload: Value },
    /// Chat message.
    Chat { room_id: String, payload: Value },
    /// Shared control-panel state; relayed to the whole room.
    Control { room_id: String, payload: Value },
    /// Ask the room's peers for their authoritative state.
    SyncRequest { room_id: String },
    /// Directed instruction for a specific peer.
    SyncInstruct { target_id: String },
    /// Directed state payload answering a sync request.
    SyncData { target_id: String, payload: Value },
}

/// Roster entry carried in `joined`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub connection_id: String,
    pub display_name: String,
    pub role: Role,
    /// Unix timestamp (milliseconds since epoch, UTC)
    pub connected_at: i64,
}

/// Events the server sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Greeting carrying the transport identity assigned to this socket
    Connected { connection_id: String },
    /// Join acknowledgement: granted role, roster, current state blob
    Joined {
        room_id: String,
        role: Role,
        participants: Vec<ParticipantInfo>,
        state: Value,
    },
    /// Another connection joined the room
    PeerJoined {
        connection_id: String,
        display_name: String,
        role: Role,
    },
    /// Both exclusive roles are now held; fired once per transition edge
    SessionReady { room_id: String },
    /// Leave acknowledgement
    Left { room_id: String },
    /// A room member left or disconnected
    PeerLeft { connection_id: String, role: Role },
    /// Relayed move
    Move {
        from: String,
        r#move: Value,
        new_state: Value,
    },
    /// Relayed full state reset (sender receives this too)
    FullStateSync { new_state: Value },
    /// Relayed annotation
    Annotation { from: String, payload: Value },
    /// Relayed chat message
    Chat { from: String, payload: Value },
    /// Relayed control state (whole room)
    Control { payload: Value },
    /// A peer asked for state; answer with `sync-data` at `requester_id`
    PerformSync { requester_id: String },
    /// Relayed directed instruction
    SyncInstruct { from: String },
    /// Directed state payload, delivered only to the sync requester
    ReceiveSyncData { payload: Value },
    /// The peer-pull handshake expired without data
    SyncFailed { reason: String },
    /// Request-scoped error, delivered only to the requester
    Error { reason: String },
}

impl ServerEvent {
    /// Serialize for the wire. These DTOs have no fallible fields.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}
