//! Core domain models for the session relay.
//!
//! A `Room` groups participants around one opaque shared state blob.
//! The room itself owns the role-assignment policy: the two exclusive
//! colors are unique per room at all times, viewers are unbounded, and
//! the transition into "both colors held" is reported exactly once per
//! edge so the caller can fire the session-ready notification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    error::RoomError,
    value_object::{ConnectionId, DisplayName, RoomId, Timestamp},
};

/// Participant role within a room.
///
/// `White` and `Black` are the exclusive pair: at most one holder each
/// per room. `Viewer` is non-exclusive with no occupancy limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "w")]
    White,
    #[serde(alias = "b")]
    Black,
    Viewer,
}

impl Role {
    /// Whether this role is one of the exclusive pair.
    pub fn is_exclusive(&self) -> bool {
        matches!(self, Role::White | Role::Black)
    }

    /// The complementary exclusive role, if any.
    pub fn opposite(&self) -> Option<Role> {
        match self {
            Role::White => Some(Role::Black),
            Role::Black => Some(Role::White),
            Role::Viewer => None,
        }
    }

    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::White => "white",
            Role::Black => "black",
            Role::Viewer => "viewer",
        }
    }
}

/// Represents a participant in a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Transport connection identity
    pub id: ConnectionId,
    /// Human-readable label
    pub display_name: DisplayName,
    /// Assigned role (unique per room for exclusive roles)
    pub role: Role,
    /// Timestamp when the participant joined
    pub connected_at: Timestamp,
}

impl Participant {
    /// Create a new participant
    pub fn new(
        id: ConnectionId,
        display_name: DisplayName,
        role: Role,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            id,
            display_name,
            role,
            connected_at,
        }
    }
}

/// Outcome of admitting a connection into a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// The role actually granted (may differ from the requested one)
    pub role: Role,
    /// True exactly when this admission filled the second exclusive
    /// role, i.e. the session-ready transition edge
    pub session_ready: bool,
}

/// Represents one collaborative session: participants plus the
/// authoritative shared state blob the relay stores but never inspects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier (caller-supplied key)
    pub id: RoomId,
    /// Participants currently in the room
    pub participants: Vec<Participant>,
    /// Opaque authoritative state (e.g. position + move history);
    /// `Null` until the first state-changing event
    pub state: Value,
    /// Timestamp when the room was created
    pub created_at: Timestamp,
}

impl Room {
    /// Create a new empty room. The state blob starts as `Null`; the
    /// relay has no notion of a starting position.
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self {
            id,
            participants: Vec::new(),
            state: Value::Null,
            created_at,
        }
    }

    /// Admit a connection, resolving its role via the assignment policy:
    ///
    /// - no requested role, or `viewer` requested: admitted as viewer,
    ///   unconditionally
    /// - requested color free: granted as requested
    /// - requested color taken, complement free: granted the complement
    /// - both colors taken: rejected with `RoomError::RoomFull`
    ///
    /// # Errors
    ///
    /// Returns `RoomError::RoomFull` when an exclusive role is requested
    /// and both are held, or `RoomError::DuplicateParticipant` when the
    /// connection id is already present.
    pub fn admit(
        &mut self,
        id: ConnectionId,
        display_name: DisplayName,
        requested_role: Option<Role>,
        connected_at: Timestamp,
    ) -> Result<Admission, RoomError> {
        if self.get_participant(&id).is_some() {
            return Err(RoomError::DuplicateParticipant(id.into_string()));
        }

        let role = match requested_role {
            None | Some(Role::Viewer) => Role::Viewer,
            Some(color) => {
                if self.role_holder(color).is_none() {
                    color
                } else {
                    // Requested color taken: hand out the complement.
                    let opposite = color.opposite().unwrap_or(Role::Viewer);
                    if self.role_holder(opposite).is_none() {
                        opposite
                    } else {
                        return Err(RoomError::RoomFull);
                    }
                }
            }
        };

        let ready_before = self.both_colors_filled();
        self.participants
            .push(Participant::new(id, display_name, role, connected_at));
        let session_ready = !ready_before && self.both_colors_filled();

        Ok(Admission {
            role,
            session_ready,
        })
    }

    /// Remove a participant by connection id, returning the removed
    /// entry (the reconciler needs the former role).
    pub fn remove_participant(&mut self, id: &ConnectionId) -> Option<Participant> {
        let pos = self.participants.iter().position(|p| &p.id == id)?;
        Some(self.participants.remove(pos))
    }

    /// Get a participant by connection id
    pub fn get_participant(&self, id: &ConnectionId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    /// The participant currently holding the given exclusive role
    pub fn role_holder(&self, role: Role) -> Option<&Participant> {
        debug_assert!(role.is_exclusive());
        self.participants.iter().find(|p| p.role == role)
    }

    /// Whether both exclusive roles are currently held
    pub fn both_colors_filled(&self) -> bool {
        self.role_holder(Role::White).is_some() && self.role_holder(Role::Black).is_some()
    }

    /// A room with no participants must be deleted from the directory
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
