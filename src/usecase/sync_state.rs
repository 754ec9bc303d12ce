//! UseCase: peer-pull state synchronization.
//!
//! A joiner that needs richer state than the server's cached blob asks
//! the room for it: `sync-request` fans out to the peers, one of them
//! answers with a directed `sync-data`, and the server forwards the
//! payload to the requester alone. The server only tracks that a
//! request is pending so it can report `sync-failed` when no peer
//! answers within the deadline.

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionSnapshot, RoomId, SessionRepository};

use super::error::RelayError;

pub struct SyncStateUseCase {
    repository: Arc<dyn SessionRepository>,
}

impl SyncStateUseCase {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    /// Open a handshake: mark it pending and resolve the peers to ask.
    ///
    /// # Returns
    ///
    /// The expiry token and the peers (room members minus the
    /// requester) the `perform-sync` directive goes to.
    pub async fn request(
        &self,
        requester_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<(u64, Vec<ConnectionSnapshot>), RelayError> {
        let snapshot = self.repository.lookup(requester_id).await;
        let in_room = snapshot
            .and_then(|s| s.room_id)
            .map(|current| &current == room_id)
            .unwrap_or(false);
        if !in_room {
            return Err(RelayError::NotInRoom {
                connection_id: requester_id.as_str().to_string(),
                room_id: room_id.as_str().to_string(),
            });
        }

        let token = self
            .repository
            .begin_sync(requester_id)
            .await
            .ok_or_else(|| RelayError::StaleTarget(requester_id.as_str().to_string()))?;
        let peers = self
            .repository
            .room_members(room_id)
            .await
            .into_iter()
            .filter(|member| &member.id != requester_id)
            .collect();
        Ok((token, peers))
    }

    /// Resolve the requester for a directed `sync-data` payload and
    /// settle their pending handshake. The payload itself passes through
    /// untouched.
    pub async fn deliver(
        &self,
        target_id: &ConnectionId,
    ) -> Result<ConnectionSnapshot, RelayError> {
        let target = self
            .repository
            .lookup(target_id)
            .await
            .ok_or_else(|| RelayError::StaleTarget(target_id.as_str().to_string()))?;
        self.repository.clear_sync(target_id).await;
        Ok(target)
    }

    /// Resolve the target of a directed `sync-instruct`.
    pub async fn instruct_target(
        &self,
        target_id: &ConnectionId,
    ) -> Result<ConnectionSnapshot, RelayError> {
        self.repository
            .lookup(target_id)
            .await
            .ok_or_else(|| RelayError::StaleTarget(target_id.as_str().to_string()))
    }

    /// Called by the expiry timer. True when the handshake was still
    /// pending, i.e. the requester should be told it failed.
    pub async fn expire(&self, requester_id: &ConnectionId, token: u64) -> bool {
        self.repository.expire_sync(requester_id, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{DisplayName, MockSessionRepository, Role, Timestamp},
        infrastructure::repository::InMemorySessionRepository,
        time::unix_timestamp_millis,
    };
    use mockall::predicate::eq;
    use tokio::sync::mpsc;

    fn cid(s: &str) -> ConnectionId {
        ConnectionId::new(s.to_string()).unwrap()
    }

    fn rid(s: &str) -> RoomId {
        RoomId::new(s.to_string()).unwrap()
    }

    async fn seeded_repo() -> Arc<InMemorySessionRepository> {
        let repo = Arc::new(InMemorySessionRepository::new());
        for id in ["x", "y"] {
            let (tx, _rx) = mpsc::unbounded_channel();
            repo.register(cid(id), tx, Timestamp::new(unix_timestamp_millis()))
                .await;
        }
        repo.join_room(
            &cid("x"),
            rid("r1"),
            DisplayName::new("X".to_string()).unwrap(),
            Some(Role::White),
        )
        .await
        .unwrap();
        repo.join_room(
            &cid("y"),
            rid("r1"),
            DisplayName::new("Y".to_string()).unwrap(),
            Some(Role::Black),
        )
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_request_targets_peers_only() {
        // given:
        let usecase = SyncStateUseCase::new(seeded_repo().await);

        // when: y asks the room for state
        let (_token, peers) = usecase.request(&cid("y"), &rid("r1")).await.unwrap();

        // then: only x is asked
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].id, cid("x"));
    }

    #[tokio::test]
    async fn test_request_outside_room_rejected() {
        // given:
        let usecase = SyncStateUseCase::new(seeded_repo().await);

        // when:
        let result = usecase.request(&cid("y"), &rid("other")).await;

        // then:
        assert!(matches!(result.unwrap_err(), RelayError::NotInRoom { .. }));
    }

    #[tokio::test]
    async fn test_delivery_settles_pending_handshake() {
        // given: y has a handshake in flight
        let repo = seeded_repo().await;
        let usecase = SyncStateUseCase::new(repo.clone());
        let (token, _peers) = usecase.request(&cid("y"), &rid("r1")).await.unwrap();

        // when: data is forwarded to y
        let target = usecase.deliver(&cid("y")).await.unwrap();

        // then: resolved to y, and the timer has nothing left to expire
        assert_eq!(target.id, cid("y"));
        assert!(!usecase.expire(&cid("y"), token).await);
    }

    #[tokio::test]
    async fn test_unanswered_handshake_expires() {
        // given:
        let usecase = SyncStateUseCase::new(seeded_repo().await);
        let (token, _peers) = usecase.request(&cid("y"), &rid("r1")).await.unwrap();

        // when/then: first expiry reports the failure, repeats do not
        assert!(usecase.expire(&cid("y"), token).await);
        assert!(!usecase.expire(&cid("y"), token).await);
    }

    #[tokio::test]
    async fn test_second_request_invalidates_old_timer() {
        // given: two handshakes back to back
        let usecase = SyncStateUseCase::new(seeded_repo().await);
        let (token1, _) = usecase.request(&cid("y"), &rid("r1")).await.unwrap();
        let (token2, _) = usecase.request(&cid("y"), &rid("r1")).await.unwrap();

        // then: the stale timer no-ops, the live one fires
        assert!(!usecase.expire(&cid("y"), token1).await);
        assert!(usecase.expire(&cid("y"), token2).await);
    }

    #[tokio::test]
    async fn test_deliver_to_gone_target() {
        // given: a registry that knows nobody, via a mocked store. No
        // clear_sync expectation: a stale target must not touch tokens.
        let mut mock = MockSessionRepository::new();
        mock.expect_lookup()
            .with(eq(cid("gone")))
            .times(1)
            .returning(|_| None);
        let usecase = SyncStateUseCase::new(Arc::new(mock));

        // when:
        let result = usecase.deliver(&cid("gone")).await;

        // then:
        assert_eq!(
            result.unwrap_err(),
            RelayError::StaleTarget("gone".to_string())
        );
    }

    #[tokio::test]
    async fn test_instruct_gone_target() {
        // given:
        let usecase = SyncStateUseCase::new(seeded_repo().await);

        // when:
        let result = usecase.instruct_target(&cid("gone")).await;

        // then:
        assert_eq!(
            result.unwrap_err(),
            RelayError::StaleTarget("gone".to_string())
        );
    }
}
