//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// ConnectionId validation error
    #[error("ConnectionId cannot be empty")]
    ConnectionIdEmpty,

    /// ConnectionId too long error
    #[error("ConnectionId cannot exceed {max} characters (got {actual})")]
    ConnectionIdTooLong { max: usize, actual: usize },

    /// RoomId validation error
    #[error("RoomId cannot be empty")]
    RoomIdEmpty,

    /// RoomId too long error
    #[error("RoomId cannot exceed {max} characters (got {actual})")]
    RoomIdTooLong { max: usize, actual: usize },

    /// DisplayName validation error
    #[error("DisplayName cannot be empty")]
    DisplayNameEmpty,

    /// DisplayName too long error
    #[error("DisplayName cannot exceed {max} characters (got {actual})")]
    DisplayNameTooLong { max: usize, actual: usize },
}

/// Errors related to Room domain logic
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Both exclusive roles are already held by other connections
    #[error("Room is full: both player roles are taken")]
    RoomFull,

    /// The connection already appears in the participant map
    #[error("Connection '{0}' is already a participant of this room")]
    DuplicateParticipant(String),
}

/// Errors surfaced by the session store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Connection id is not registered (stale reference)
    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),

    /// The connection is registered but not attached to any room
    #[error("Connection '{0}' is not in a room")]
    NotInRoom(String),

    /// Role assignment rejected by the room policy
    #[error(transparent)]
    Room(#[from] RoomError),
}
