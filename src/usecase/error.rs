//! UseCase layer error definitions.

use thiserror::Error;

/// Errors a join request can surface to the requester
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// Both exclusive roles are held by other connections
    #[error("room is full: both player roles are taken")]
    RoomFull,

    /// The connection id is not (or no longer) registered
    #[error("connection is not registered")]
    NotRegistered,
}

/// Errors a leave request can surface
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeaveError {
    /// The connection is not attached to any room
    #[error("connection is not in a room")]
    NotInRoom,
}

/// Errors raised while routing a relay event.
///
/// All of these are stale references or sender/room mismatches; the
/// handler drops the event without noise to the rest of the room.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The sender is not a member of the room named in the event
    #[error("connection '{connection_id}' is not a member of room '{room_id}'")]
    NotInRoom {
        connection_id: String,
        room_id: String,
    },

    /// The directed target is not (or no longer) registered
    #[error("target connection '{0}' is not registered")]
    StaleTarget(String),
}
