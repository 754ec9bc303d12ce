//! Session store abstraction.
//!
//! The domain layer defines the trait; the infrastructure layer provides
//! the concrete store (dependency inversion). Each method is a complete,
//! atomic operation: callers never compose multiple calls and expect the
//! composition to be race-free.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use super::{
    entity::{Role, Room},
    error::RepositoryError,
    value_object::{ConnectionId, DisplayName, RoomId, Timestamp},
};

/// Registry view of one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionSnapshot {
    /// Transport identity
    pub id: ConnectionId,
    /// Room the connection is attached to, if any
    pub room_id: Option<RoomId>,
    /// Role held in that room, if any
    pub role: Option<Role>,
    /// Display name supplied at join time, if any
    pub display_name: Option<DisplayName>,
    /// Outbound channel for this connection's WebSocket writer task
    pub sender: UnboundedSender<String>,
    /// Timestamp when the transport connected
    pub connected_at: Timestamp,
}

/// Result of a successful join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The role actually granted
    pub role: Role,
    /// Room snapshot taken after the join (roster and state blob)
    pub room: Room,
    /// True when this join filled the second exclusive role
    pub session_ready: bool,
    /// True when the connection was already in this room: the join was
    /// a no-op and the rest of the room must not be re-notified
    pub rejoined: bool,
    /// Effects of the implicit leave when the connection was already in
    /// another room (auto-leave-then-join policy)
    pub departed: Option<LeaveOutcome>,
}

/// Result of a leave or disconnect removal.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    /// Room the connection was removed from
    pub room_id: RoomId,
    /// Role the connection held there
    pub role: Role,
    /// Display name it was known by
    pub display_name: DisplayName,
    /// Remaining room members, for peer-left notification
    pub remaining: Vec<ConnectionSnapshot>,
    /// True when the removal emptied (and therefore deleted) the room
    pub room_deleted: bool,
}

/// Store for the connection registry and the room directory.
///
/// Implementations must keep the two sides consistent: a connection's
/// room association and the room's participant map never disagree.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Register a freshly connected transport. No room, no role.
    async fn register(
        &self,
        id: ConnectionId,
        sender: UnboundedSender<String>,
        connected_at: Timestamp,
    );

    /// Read-only registry lookup.
    async fn lookup(&self, id: &ConnectionId) -> Option<ConnectionSnapshot>;

    /// Attach a registered connection to a room, creating the room on
    /// first use and assigning a role per the room policy. A connection
    /// already in a room is detached from it first.
    async fn join_room(
        &self,
        id: &ConnectionId,
        room_id: RoomId,
        display_name: DisplayName,
        requested_role: Option<Role>,
    ) -> Result<JoinOutcome, RepositoryError>;

    /// Detach a connection from its current room. The registry entry
    /// itself survives (the transport is still up).
    async fn leave_room(&self, id: &ConnectionId) -> Result<LeaveOutcome, RepositoryError>;

    /// Remove a connection entirely (transport teardown). Returns the
    /// leave effects when the connection was in a room, `None` when
    /// there is nothing to reconcile. Idempotent.
    async fn unregister(&self, id: &ConnectionId) -> Option<LeaveOutcome>;

    /// Replace a room's authoritative state blob. A missing room is a
    /// logged no-op: a state update racing the room's deletion must
    /// neither resurrect it nor fail.
    async fn update_state(&self, room_id: &RoomId, new_state: Value);

    /// Snapshot of one room.
    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;

    /// Snapshot of every room in the directory.
    async fn list_rooms(&self) -> Vec<Room>;

    /// Connection snapshots for every member of a room, for building
    /// broadcast lists. Empty when the room does not exist.
    async fn room_members(&self, room_id: &RoomId) -> Vec<ConnectionSnapshot>;

    /// Number of registered connections, reported by the health endpoint.
    async fn count_connections(&self) -> usize;

    /// Mark a pending peer-pull sync for the requester and return the
    /// token identifying it. `None` when the connection is unknown.
    async fn begin_sync(&self, id: &ConnectionId) -> Option<u64>;

    /// Clear any pending sync for the connection (sync data arrived).
    /// Returns whether one was pending.
    async fn clear_sync(&self, id: &ConnectionId) -> bool;

    /// Clear the pending sync only if it still carries `token`.
    /// Returns true when the sync had indeed timed out.
    async fn expire_sync(&self, id: &ConnectionId, token: u64) -> bool;
}
