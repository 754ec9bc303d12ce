//! UseCase: disconnection reconciliation.
//!
//! Transport teardown is terminal for a connection id: the registry
//! entry goes away, the room (if any) drops the participant and is
//! deleted when that empties it, and the remaining members are handed
//! back so the caller can fan out the peer-left notification.

use std::sync::Arc;

use crate::domain::{ConnectionId, LeaveOutcome, SessionRepository};

pub struct DisconnectParticipantUseCase {
    repository: Arc<dyn SessionRepository>,
}

impl DisconnectParticipantUseCase {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    /// Reconcile a torn-down transport. Idempotent: a second call for
    /// the same id (or one for a never-registered id) returns `None`.
    pub async fn execute(&self, connection_id: &ConnectionId) -> Option<LeaveOutcome> {
        self.repository.unregister(connection_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{DisplayName, Role, RoomId, Timestamp},
        infrastructure::repository::InMemorySessionRepository,
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

    #[tokio::test]
    async fn test_disconnect_notifies_remaining_and_deletes_empty_room() {
        // given: a lone player
        let repo = Arc::new(InMemorySessionRepository::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        repo.register(cid("x"), tx, Timestamp::new(unix_timestamp_millis()))
            .await;
        repo.join_room(&cid("x"), rid("r1"), name("X"), Some(Role::White))
            .await
            .unwrap();
        let usecase = DisconnectParticipantUseCase::new(repo.clone());

        // when:
        let outcome = usecase.execute(&cid("x")).await.unwrap();

        // then: nobody to notify, room gone, registry entry gone
        assert!(outcome.remaining.is_empty());
        assert!(outcome.room_deleted);
        assert!(repo.get_room(&rid("r1")).await.is_none());
        assert!(repo.lookup(&cid("x")).await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        // given:
        let repo = Arc::new(InMemorySessionRepository::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        repo.register(cid("x"), tx, Timestamp::new(unix_timestamp_millis()))
            .await;
        repo.join_room(&cid("x"), rid("r1"), name("X"), None)
            .await
            .unwrap();
        let usecase = DisconnectParticipantUseCase::new(repo.clone());

        // when:
        let first = usecase.execute(&cid("x")).await;
        let second = usecase.execute(&cid("x")).await;

        // then:
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_without_room_is_quiet() {
        // given:
        let repo = Arc::new(InMemorySessionRepository::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        repo.register(cid("x"), tx, Timestamp::new(unix_timestamp_millis()))
            .await;
        let usecase = DisconnectParticipantUseCase::new(repo.clone());

        // when:
        let outcome = usecase.execute(&cid("x")).await;

        // then: nothing to reconcile beyond the registry entry
        assert!(outcome.is_none());
        assert_eq!(repo.count_connections().await, 0);
    }
}
