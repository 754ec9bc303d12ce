//! UseCase: joining (or creating) a room.
//!
//! The store applies the role-assignment policy atomically; this layer
//! translates errors for the requester and builds the roster the join
//! acknowledgement carries.

use std::sync::Arc;

use crate::{
    domain::{
        ConnectionId, DisplayName, JoinOutcome, RepositoryError, Role, Room, RoomError, RoomId,
        SessionRepository,
    },
    infrastructure::dto::websocket::ParticipantInfo,
};

use super::error::JoinError;

pub struct JoinRoomUseCase {
    repository: Arc<dyn SessionRepository>,
}

impl JoinRoomUseCase {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    /// Attach the connection to the room, creating it on first use.
    ///
    /// # Returns
    ///
    /// * `Ok(JoinOutcome)` - granted role, room snapshot, session-ready
    ///   edge, and the effects of any implicit leave of a previous room
    /// * `Err(JoinError)` - policy rejection, to be sent back to the
    ///   requester only
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        display_name: DisplayName,
        requested_role: Option<Role>,
    ) -> Result<JoinOutcome, JoinError> {
        self.repository
            .join_room(connection_id, room_id, display_name, requested_role)
            .await
            .map_err(|err| match err {
                RepositoryError::Room(RoomError::RoomFull) => JoinError::RoomFull,
                RepositoryError::ConnectionNotFound(_) => JoinError::NotRegistered,
                // DuplicateParticipant cannot happen through this path:
                // join_room detaches before attaching.
                other => {
                    tracing::warn!("unexpected join failure: {}", other);
                    JoinError::NotRegistered
                }
            })
    }

    /// Build the roster carried in the join acknowledgement, sorted by
    /// connection id for consistent ordering.
    pub fn build_roster(room: &Room) -> Vec<ParticipantInfo> {
        let mut roster: Vec<ParticipantInfo> = room
            .participants
            .iter()
            .map(|p| ParticipantInfo {
                connection_id: p.id.as_str().to_string(),
                display_name: p.display_name.as_str().to_string(),
                role: p.role,
                connected_at: p.connected_at.value(),
            })
            .collect();
        roster.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Timestamp, infrastructure::repository::InMemorySessionRepository,
        time::unix_timestamp_millis,
    };
    use tokio::sync::mpsc;

    fn cid(s: &str) -> ConnectionId {
        ConnectionId::new(s.to_string()).unwrap()
    }

    fn rid(s: &str) -> RoomId {
        RoomId::new(s.to_string()).unwrap()
    }

    fn name(s: &str) -> DisplayName {
        DisplayName::new(s.to_string()).unwrap()
    }

    async fn repo_with(ids: &[&str]) -> Arc<InMemorySessionRepository> {
        let repo = Arc::new(InMemorySessionRepository::new());
        for id in ids {
            let (tx, _rx) = mpsc::unbounded_channel();
            repo.register(cid(id), tx, Timestamp::new(unix_timestamp_millis()))
                .await;
        }
        repo
    }

    #[tokio::test]
    async fn test_join_scenario_first_second_third() {
        // given:
        let repo = repo_with(&["x", "y", "z"]).await;
        let usecase = JoinRoomUseCase::new(repo.clone());

        // when: X requests white on a fresh room
        let x = usecase
            .execute(&cid("x"), rid("r1"), name("X"), Some(Role::White))
            .await
            .unwrap();

        // then: granted as requested
        assert_eq!(x.role, Role::White);
        assert!(!x.session_ready);

        // when: Y also requests white
        let y = usecase
            .execute(&cid("y"), rid("r1"), name("Y"), Some(Role::White))
            .await
            .unwrap();

        // then: granted black instead, session-ready edge fires
        assert_eq!(y.role, Role::Black);
        assert!(y.session_ready);

        // when: Z requests white in the full room
        let z = usecase
            .execute(&cid("z"), rid("r1"), name("Z"), Some(Role::White))
            .await;

        // then: explicit room-full rejection
        assert_eq!(z.unwrap_err(), JoinError::RoomFull);
    }

    #[tokio::test]
    async fn test_viewers_never_rejected() {
        // given: a full room
        let repo = repo_with(&["x", "y", "v1", "v2", "v3"]).await;
        let usecase = JoinRoomUseCase::new(repo.clone());
        usecase
            .execute(&cid("x"), rid("r1"), name("X"), Some(Role::White))
            .await
            .unwrap();
        usecase
            .execute(&cid("y"), rid("r1"), name("Y"), Some(Role::Black))
            .await
            .unwrap();

        // when/then: viewers keep getting in
        for id in ["v1", "v2", "v3"] {
            let outcome = usecase
                .execute(&cid(id), rid("r1"), name("V"), None)
                .await
                .unwrap();
            assert_eq!(outcome.role, Role::Viewer);
            assert!(!outcome.session_ready);
        }
    }

    #[tokio::test]
    async fn test_unregistered_connection_rejected() {
        // given:
        let repo = repo_with(&[]).await;
        let usecase = JoinRoomUseCase::new(repo);

        // when:
        let result = usecase
            .execute(&cid("ghost"), rid("r1"), name("G"), None)
            .await;

        // then:
        assert_eq!(result.unwrap_err(), JoinError::NotRegistered);
    }

    #[tokio::test]
    async fn test_build_roster_sorted() {
        // given:
        let repo = repo_with(&["c", "a", "b"]).await;
        let usecase = JoinRoomUseCase::new(repo.clone());
        for id in ["c", "a", "b"] {
            usecase
                .execute(&cid(id), rid("r1"), name(id), None)
                .await
                .unwrap();
        }

        // when:
        let room = repo.get_room(&rid("r1")).await.unwrap();
        let roster = JoinRoomUseCase::build_roster(&room);

        // then:
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].connection_id, "a");
        assert_eq!(roster[1].connection_id, "b");
        assert_eq!(roster[2].connection_id, "c");
    }
}
