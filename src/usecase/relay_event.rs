//! UseCase: stateless event routing.
//!
//! One routing decision per domain event: who receives it, and whether
//! the room's authoritative state is replaced first. The relay never
//! inspects the payload itself.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{ConnectionId, ConnectionSnapshot, RoomId, SessionRepository};

use super::error::RelayError;

/// Fan-out scope for a room-addressed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayScope {
    /// Everyone in the room except the sender (move, annotation, chat)
    ExcludeSender,
    /// Everyone in the room, the sender included (full state resets,
    /// control state)
    WholeRoom,
}

pub struct RelayEventUseCase {
    repository: Arc<dyn SessionRepository>,
}

impl RelayEventUseCase {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    /// Resolve the broadcast list for a room-addressed event.
    ///
    /// The sender must actually be a member of the room it names;
    /// anything else is a stale or forged reference and yields an error
    /// the handler drops quietly.
    pub async fn targets(
        &self,
        sender_id: &ConnectionId,
        room_id: &RoomId,
        scope: RelayScope,
    ) -> Result<Vec<ConnectionSnapshot>, RelayError> {
        self.ensure_member(sender_id, room_id).await?;
        let members = self.repository.room_members(room_id).await;
        Ok(members
            .into_iter()
            .filter(|member| scope == RelayScope::WholeRoom || &member.id != sender_id)
            .collect())
    }

    /// Replace the room's state blob and resolve the broadcast list in
    /// one step, for events that mutate before fanning out.
    pub async fn update_state_and_targets(
        &self,
        sender_id: &ConnectionId,
        room_id: &RoomId,
        new_state: Value,
        scope: RelayScope,
    ) -> Result<Vec<ConnectionSnapshot>, RelayError> {
        self.ensure_member(sender_id, room_id).await?;
        self.repository.update_state(room_id, new_state).await;
        let members = self.repository.room_members(room_id).await;
        Ok(members
            .into_iter()
            .filter(|member| scope == RelayScope::WholeRoom || &member.id != sender_id)
            .collect())
    }

    async fn ensure_member(
        &self,
        sender_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<(), RelayError> {
        let snapshot = self.repository.lookup(sender_id).await;
        match snapshot.and_then(|s| s.room_id) {
            Some(current) if &current == room_id => Ok(()),
            _ => Err(RelayError::NotInRoom {
                connection_id: sender_id.as_str().to_string(),
                room_id: room_id.as_str().to_string(),
            }),
        }
    }
}
