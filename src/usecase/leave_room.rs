//! UseCase: explicit leave.
//!
//! Detaches the connection from its room while keeping the transport
//! alive, so the client can join another room on the same socket.

use std::sync::Arc;

use crate::domain::{ConnectionId, LeaveOutcome, SessionRepository};

use super::error::LeaveError;

pub struct LeaveRoomUseCase {
    repository: Arc<dyn SessionRepository>,
}

impl LeaveRoomUseCase {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    /// # Returns
    ///
    /// * `Ok(LeaveOutcome)` - the room left, the former role, and the
    ///   remaining members to notify
    /// * `Err(LeaveError)` - the connection was not in a room
    pub async fn execute(&self, connection_id: &ConnectionId) -> Result<LeaveOutcome, LeaveError> {
        self.repository
            .leave_room(connection_id)
            .await
            .map_err(|_| LeaveError::NotInRoom)
    }
}
