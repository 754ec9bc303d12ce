//! In-memory SessionRepository implementation.
//!
//! Two HashMaps behind tokio mutexes serve as the store: the connection
//! registry and the room directory. Lock order is registry before
//! directory, never the reverse, and no await happens while a lock is
//! held, so every trait method is atomic with respect to the others.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc::UnboundedSender};

use crate::{
    domain::{
        ConnectionId, ConnectionSnapshot, DisplayName, JoinOutcome, LeaveOutcome, Participant,
        RepositoryError, Role, Room, RoomId, SessionRepository, Timestamp,
    },
    time::unix_timestamp_millis,
};

/// Registry entry for one live connection.
struct ConnectionEntry {
    sender: UnboundedSender<String>,
    connected_at: Timestamp,
    room_id: Option<RoomId>,
    role: Option<Role>,
    display_name: Option<DisplayName>,
    /// Token of an in-flight peer-pull sync, if any
    pending_sync: Option<u64>,
}

/// In-memory session store.
///
/// A room exists in the directory iff it has at least one participant;
/// `join_room`/`leave_room`/`unregister` maintain that invariant under
/// the directory lock.
pub struct InMemorySessionRepository {
    /// Connection registry, keyed by connection id
    connections: Mutex<HashMap<String, ConnectionEntry>>,
    /// Room directory, keyed by room id
    rooms: Mutex<HashMap<String, Room>>,
    /// Monotonic source for sync handshake tokens
    sync_counter: AtomicU64,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
            sync_counter: AtomicU64::new(1),
        }
    }

    fn snapshot(id: &str, entry: &ConnectionEntry) -> Option<ConnectionSnapshot> {
        let id = ConnectionId::new(id.to_string()).ok()?;
        Some(ConnectionSnapshot {
            id,
            room_id: entry.room_id.clone(),
            role: entry.role,
            display_name: entry.display_name.clone(),
            sender: entry.sender.clone(),
            connected_at: entry.connected_at,
        })
    }

    /// Build member snapshots for a room with both locks already held.
    fn members_locked(
        connections: &HashMap<String, ConnectionEntry>,
        rooms: &HashMap<String, Room>,
        room_id: &RoomId,
    ) -> Vec<ConnectionSnapshot> {
        let Some(room) = rooms.get(room_id.as_str()) else {
            return Vec::new();
        };
        room.participants
            .iter()
            .filter_map(|p| {
                connections
                    .get(p.id.as_str())
                    .and_then(|entry| Self::snapshot(p.id.as_str(), entry))
            })
            .collect()
    }

    /// Remove a connection from its room with both locks held, deleting
    /// the room if it empties. Returns the leave effects, or `None` when
    /// the connection was not in a room.
    fn detach_locked(
        connections: &mut HashMap<String, ConnectionEntry>,
        rooms: &mut HashMap<String, Room>,
        id: &ConnectionId,
    ) -> Option<LeaveOutcome> {
        let entry = connections.get_mut(id.as_str())?;
        let room_id = entry.room_id.take()?;
        entry.role = None;
        entry.display_name = None;

        let removed = rooms
            .get_mut(room_id.as_str())
            .and_then(|room| room.remove_participant(id));
        let Some(removed) = removed else {
            // Registry said "in a room" but the room disagreed. Guarded
            // here so a defect cannot corrupt the rest of the store.
            tracing::error!(
                "registry/directory disagreed for connection '{}' in room '{}'",
                id,
                room_id
            );
            return None;
        };

        let room_deleted = rooms
            .get(room_id.as_str())
            .map(|room| room.is_empty())
            .unwrap_or(false);
        if room_deleted {
            rooms.remove(room_id.as_str());
        }

        let remaining = Self::members_locked(connections, rooms, &room_id);
        Some(LeaveOutcome {
            room_id,
            role: removed.role,
            display_name: removed.display_name,
            remaining,
            room_deleted,
        })
    }
}

impl Default for InMemorySessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn register(
        &self,
        id: ConnectionId,
        sender: UnboundedSender<String>,
        connected_at: Timestamp,
    ) {
        let mut connections = self.connections.lock().await;
        connections.insert(
            id.into_string(),
            ConnectionEntry {
                sender,
                connected_at,
                room_id: None,
                role: None,
                display_name: None,
                pending_sync: None,
            },
        );
    }

    async fn lookup(&self, id: &ConnectionId) -> Option<ConnectionSnapshot> {
        let connections = self.connections.lock().await;
        connections
            .get(id.as_str())
            .and_then(|entry| Self::snapshot(id.as_str(), entry))
    }

    async fn join_room(
        &self,
        id: &ConnectionId,
        room_id: RoomId,
        display_name: DisplayName,
        requested_role: Option<Role>,
    ) -> Result<JoinOutcome, RepositoryError> {
        let now = Timestamp::new(unix_timestamp_millis());
        let mut connections = self.connections.lock().await;
        if !connections.contains_key(id.as_str()) {
            return Err(RepositoryError::ConnectionNotFound(id.as_str().to_string()));
        }
        let mut rooms = self.rooms.lock().await;

        let prev_room_id = connections
            .get(id.as_str())
            .and_then(|entry| entry.room_id.clone());

        // Re-joining the current room changes nothing: the assigned role
        // stands, nobody departed, and session-ready must not re-fire.
        if prev_room_id.as_ref() == Some(&room_id) {
            let role = connections.get(id.as_str()).and_then(|entry| entry.role);
            if let (Some(room), Some(role)) = (rooms.get(room_id.as_str()), role) {
                return Ok(JoinOutcome {
                    role,
                    room: room.clone(),
                    session_ready: false,
                    rejoined: true,
                    departed: None,
                });
            }
        }

        // Detach from any previous room first, deferring deletion and
        // notification effects until the new admission succeeds so a
        // rejected join leaves everything untouched.
        let prev_membership: Option<(RoomId, Participant)> = prev_room_id.and_then(|prev| {
            rooms
                .get_mut(prev.as_str())
                .and_then(|room| room.remove_participant(id))
                .map(|participant| (prev, participant))
        });

        let room = rooms
            .entry(room_id.as_str().to_string())
            .or_insert_with(|| Room::new(room_id.clone(), now));
        let admission = match room.admit(id.clone(), display_name.clone(), requested_role, now) {
            Ok(admission) => admission,
            Err(err) => {
                if room.is_empty() {
                    rooms.remove(room_id.as_str());
                }
                // Put the previous membership back; the failed join must
                // not have moved the connection anywhere.
                if let Some((prev_room_id, participant)) = prev_membership {
                    if let Some(prev_room) = rooms.get_mut(prev_room_id.as_str()) {
                        prev_room.participants.push(participant);
                    }
                }
                return Err(err.into());
            }
        };
        let room_snapshot = room.clone();

        // Finalize the deferred leave of the previous room.
        let departed = prev_membership.map(|(prev_room_id, participant)| {
            let room_deleted = rooms
                .get(prev_room_id.as_str())
                .map(|room| room.is_empty())
                .unwrap_or(false);
            if room_deleted {
                rooms.remove(prev_room_id.as_str());
            }
            let remaining = Self::members_locked(&connections, &rooms, &prev_room_id);
            LeaveOutcome {
                room_id: prev_room_id,
                role: participant.role,
                display_name: participant.display_name,
                remaining,
                room_deleted,
            }
        });

        if let Some(entry) = connections.get_mut(id.as_str()) {
            entry.room_id = Some(room_id);
            entry.role = Some(admission.role);
            entry.display_name = Some(display_name);
        }

        Ok(JoinOutcome {
            role: admission.role,
            room: room_snapshot,
            session_ready: admission.session_ready,
            rejoined: false,
            departed,
        })
    }

    async fn leave_room(&self, id: &ConnectionId) -> Result<LeaveOutcome, RepositoryError> {
        let mut connections = self.connections.lock().await;
        if !connections.contains_key(id.as_str()) {
            return Err(RepositoryError::ConnectionNotFound(id.as_str().to_string()));
        }
        let mut rooms = self.rooms.lock().await;
        Self::detach_locked(&mut connections, &mut rooms, id)
            .ok_or_else(|| RepositoryError::NotInRoom(id.as_str().to_string()))
    }

    async fn unregister(&self, id: &ConnectionId) -> Option<LeaveOutcome> {
        let mut connections = self.connections.lock().await;
        let mut rooms = self.rooms.lock().await;
        let outcome = Self::detach_locked(&mut connections, &mut rooms, id);
        connections.remove(id.as_str());
        outcome
    }

    async fn update_state(&self, room_id: &RoomId, new_state: Value) {
        let mut rooms = self.rooms.lock().await;
        match rooms.get_mut(room_id.as_str()) {
            Some(room) => room.state = new_state,
            None => {
                // Racing a deletion; last participant is already gone.
                tracing::debug!("state update for unknown room '{}' dropped", room_id);
            }
        }
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id.as_str()).cloned()
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        rooms.values().cloned().collect()
    }

    async fn room_members(&self, room_id: &RoomId) -> Vec<ConnectionSnapshot> {
        let connections = self.connections.lock().await;
        let rooms = self.rooms.lock().await;
        Self::members_locked(&connections, &rooms, room_id)
    }

    async fn count_connections(&self) -> usize {
        let connections = self.connections.lock().await;
        connections.len()
    }

    async fn begin_sync(&self, id: &ConnectionId) -> Option<u64> {
        let mut connections = self.connections.lock().await;
        let entry = connections.get_mut(id.as_str())?;
        let token = self.sync_counter.fetch_add(1, Ordering::Relaxed);
        entry.pending_sync = Some(token);
        Some(token)
    }

    async fn clear_sync(&self, id: &ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        connections
            .get_mut(id.as_str())
            .map(|entry| entry.pending_sync.take().is_some())
            .unwrap_or(false)
    }

    async fn expire_sync(&self, id: &ConnectionId, token: u64) -> bool {
        let mut connections = self.connections.lock().await;
        let Some(entry) = connections.get_mut(id.as_str()) else {
            return false;
        };
        if entry.pending_sync == Some(token) {
            entry.pending_sync = None;
            true
        } else {
            false
        }
    }
}
