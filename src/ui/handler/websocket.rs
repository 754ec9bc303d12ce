//! WebSocket connection handling.
//!
//! One socket maps to one registered connection id. All outbound
//! traffic for a connection goes through its registered mpsc channel
//! and a single writer task, so delivery order per connection is FIFO.
//! Event handling errors stay local to the event: a malformed or stale
//! frame never tears down the socket, let alone the process.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, ConnectionIdFactory, ConnectionSnapshot, DisplayName, Role, RoomId,
        Timestamp,
    },
    infrastructure::dto::websocket::{ClientEvent, ServerEvent},
    time::unix_timestamp_millis,
    ui::state::AppState,
    usecase::{
        DisconnectParticipantUseCase, JoinRoomUseCase, LeaveRoomUseCase, RelayEventUseCase,
        RelayScope, SyncStateUseCase,
    },
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = match ConnectionIdFactory::generate() {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("failed to generate connection id: {}", e);
            return;
        }
    };

    // Register before anything else so every later event for this id
    // resolves, then greet the client with its transport identity.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state
        .repository
        .register(
            connection_id.clone(),
            tx.clone(),
            Timestamp::new(unix_timestamp_millis()),
        )
        .await;
    tracing::info!("connection '{}' established", connection_id);

    let greeting = ServerEvent::Connected {
        connection_id: connection_id.as_str().to_string(),
    };
    let _ = tx.send(greeting.to_json());

    let (mut sink, mut stream) = socket.split();

    // Writer task: drain the connection's channel into the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader task: dispatch inbound frames.
    let recv_state = state.clone();
    let recv_id = connection_id.clone();
    let recv_tx = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("websocket error on '{}': {}", recv_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_event(&recv_state, &recv_id, &recv_tx, text.as_str()).await;
                }
                Message::Close(_) => {
                    tracing::info!("connection '{}' requested close", recv_id);
                    break;
                }
                // Ping/pong is answered by the protocol layer.
                _ => {}
            }
        }
    });

    // Whichever task finishes first, the connection is over.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Reconcile: remove from registry and room, notify the peers.
    let reconciler = DisconnectParticipantUseCase::new(state.repository.clone());
    if let Some(outcome) = reconciler.execute(&connection_id).await {
        let left = ServerEvent::PeerLeft {
            connection_id: connection_id.as_str().to_string(),
            role: outcome.role,
        };
        broadcast(&outcome.remaining, &left.to_json());
        if outcome.room_deleted {
            tracing::info!("room '{}' deleted (last participant left)", outcome.room_id);
        }
    }
    tracing::info!("connection '{}' closed", connection_id);
}

/// Route one inbound frame. Every failure path is local to this event.
async fn handle_event(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    reply: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("malformed event from '{}': {}", connection_id, e);
            send_error(reply, "malformed event");
            return;
        }
    };

    match event {
        ClientEvent::Join {
            room_id,
            display_name,
            requested_role,
        } => handle_join(state, connection_id, reply, room_id, display_name, requested_role).await,
        ClientEvent::Leave { room_id: _ } => handle_leave(state, connection_id, reply).await,
        ClientEvent::Move {
            room_id,
            r#move,
            new_state,
        } => {
            let relayed = ServerEvent::Move {
                from: connection_id.as_str().to_string(),
                r#move,
                new_state: new_state.clone(),
            };
            relay_with_state(
                state,
                connection_id,
                reply,
                room_id,
                Some(new_state),
                RelayScope::ExcludeSender,
                relayed,
            )
            .await;
        }
        ClientEvent::FullStateSync { room_id, new_state } => {
            let relayed = ServerEvent::FullStateSync {
                new_state: new_state.clone(),
            };
            relay_with_state(
                state,
                connection_id,
                reply,
                room_id,
                Some(new_state),
                RelayScope::WholeRoom,
                relayed,
            )
            .await;
        }
        ClientEvent::Annotation { room_id, payload } => {
            let relayed = ServerEvent::Annotation {
                from: connection_id.as_str().to_string(),
                payload,
            };
            relay_with_state(
                state,
                connection_id,
                reply,
                room_id,
                None,
                RelayScope::ExcludeSender,
                relayed,
            )
            .await;
        }
        ClientEvent::Chat { room_id, payload } => {
            let relayed = ServerEvent::Chat {
                from: connection_id.as_str().to_string(),
                payload,
            };
            relay_with_state(
                state,
                connection_id,
                reply,
                room_id,
                None,
                RelayScope::ExcludeSender,
                relayed,
            )
            .await;
        }
        ClientEvent::Control { room_id, payload } => {
            let relayed = ServerEvent::Control { payload };
            relay_with_state(
                state,
                connection_id,
                reply,
                room_id,
                None,
                RelayScope::WholeRoom,
                relayed,
            )
            .await;
        }
        ClientEvent::SyncRequest { room_id } => {
            handle_sync_request(state, connection_id, reply, room_id).await;
        }
        ClientEvent::SyncInstruct { target_id } => {
            handle_sync_instruct(state, connection_id, reply, target_id).await;
        }
        ClientEvent::SyncData { target_id, payload } => {
            handle_sync_data(state, connection_id, reply, target_id, payload).await;
        }
    }
}

async fn handle_join(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    reply: &mpsc::UnboundedSender<String>,
    room_id: String,
    display_name: Option<String>,
    requested_role: Option<Role>,
) {
    let room_id = match RoomId::new(room_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("join with invalid room id from '{}': {}", connection_id, e);
            send_error(reply, &e.to_string());
            return;
        }
    };
    let display_name = match display_name {
        Some(name) => match DisplayName::new(name) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("join with invalid name from '{}': {}", connection_id, e);
                send_error(reply, &e.to_string());
                return;
            }
        },
        None => DisplayName::anonymous(),
    };

    let usecase = JoinRoomUseCase::new(state.repository.clone());
    let outcome = match usecase
        .execute(connection_id, room_id.clone(), display_name.clone(), requested_role)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::info!("join rejected for '{}' in '{}': {}", connection_id, room_id, e);
            send_error(reply, &e.to_string());
            return;
        }
    };

    // The implicit leave of a previous room notifies that room first.
    if let Some(departed) = &outcome.departed {
        let left = ServerEvent::PeerLeft {
            connection_id: connection_id.as_str().to_string(),
            role: departed.role,
        };
        broadcast(&departed.remaining, &left.to_json());
    }

    tracing::info!(
        "'{}' joined room '{}' as {}",
        connection_id,
        room_id,
        outcome.role.as_str()
    );

    // Ack to the joiner: granted role, roster, current state blob.
    let joined = ServerEvent::Joined {
        room_id: room_id.as_str().to_string(),
        role: outcome.role,
        participants: JoinRoomUseCase::build_roster(&outcome.room),
        state: outcome.room.state.clone(),
    };
    let _ = reply.send(joined.to_json());

    // A no-op re-join of the current room is acked but never announced.
    if outcome.rejoined {
        return;
    }

    // Presence for everyone already there.
    let members = state.repository.room_members(&room_id).await;
    let peers: Vec<ConnectionSnapshot> = members
        .iter()
        .filter(|m| &m.id != connection_id)
        .cloned()
        .collect();
    let peer_joined = ServerEvent::PeerJoined {
        connection_id: connection_id.as_str().to_string(),
        display_name: display_name.as_str().to_string(),
        role: outcome.role,
    };
    broadcast(&peers, &peer_joined.to_json());

    // Fires exactly once per transition into "both colors held".
    if outcome.session_ready {
        let ready = ServerEvent::SessionReady {
            room_id: room_id.as_str().to_string(),
        };
        broadcast(&members, &ready.to_json());
        tracing::info!("room '{}' session ready", room_id);
    }
}

async fn handle_leave(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    reply: &mpsc::UnboundedSender<String>,
) {
    let usecase = LeaveRoomUseCase::new(state.repository.clone());
    match usecase.execute(connection_id).await {
        Ok(outcome) => {
            let left = ServerEvent::Left {
                room_id: outcome.room_id.as_str().to_string(),
            };
            let _ = reply.send(left.to_json());

            let peer_left = ServerEvent::PeerLeft {
                connection_id: connection_id.as_str().to_string(),
                role: outcome.role,
            };
            broadcast(&outcome.remaining, &peer_left.to_json());
            tracing::info!("'{}' left room '{}'", connection_id, outcome.room_id);
        }
        Err(e) => {
            // Leaving nothing is harmless; drop it.
            tracing::debug!("leave from '{}' ignored: {}", connection_id, e);
        }
    }
}

/// Shared path for room-addressed relay events, with an optional state
/// replacement before fan-out.
async fn relay_with_state(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    reply: &mpsc::UnboundedSender<String>,
    room_id: String,
    new_state: Option<Value>,
    scope: RelayScope,
    relayed: ServerEvent,
) {
    let room_id = match RoomId::new(room_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("relay with invalid room id from '{}': {}", connection_id, e);
            send_error(reply, &e.to_string());
            return;
        }
    };

    let usecase = RelayEventUseCase::new(state.repository.clone());
    let targets = match new_state {
        Some(new_state) => {
            usecase
                .update_state_and_targets(connection_id, &room_id, new_state, scope)
                .await
        }
        None => usecase.targets(connection_id, &room_id, scope).await,
    };

    match targets {
        Ok(targets) => broadcast(&targets, &relayed.to_json()),
        Err(e) => {
            // Stale or mismatched reference; no noise to anyone.
            tracing::debug!("relay from '{}' dropped: {}", connection_id, e);
        }
    }
}

async fn handle_sync_request(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    reply: &mpsc::UnboundedSender<String>,
    room_id: String,
) {
    let room_id = match RoomId::new(room_id) {
        Ok(id) => id,
        Err(e) => {
            send_error(reply, &e.to_string());
            return;
        }
    };

    let usecase = SyncStateUseCase::new(state.repository.clone());
    let (token, peers) = match usecase.request(connection_id, &room_id).await {
        Ok(opened) => opened,
        Err(e) => {
            tracing::debug!("sync request from '{}' dropped: {}", connection_id, e);
            return;
        }
    };

    let perform = ServerEvent::PerformSync {
        requester_id: connection_id.as_str().to_string(),
    };
    broadcast(&peers, &perform.to_json());

    // Expiry timer: if no peer answers in time, tell the requester.
    // The token makes a timer stale the moment data arrives or a newer
    // request supersedes this one.
    let timer_state = state.clone();
    let requester = connection_id.clone();
    let requester_tx = reply.clone();
    let timeout = state.sync_timeout;
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let usecase = SyncStateUseCase::new(timer_state.repository.clone());
        if usecase.expire(&requester, token).await {
            tracing::info!("sync request from '{}' timed out", requester);
            let failed = ServerEvent::SyncFailed {
                reason: "no peer answered the sync request in time".to_string(),
            };
            let _ = requester_tx.send(failed.to_json());
        }
    });
}

async fn handle_sync_instruct(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    reply: &mpsc::UnboundedSender<String>,
    target_id: String,
) {
    let target_id = match ConnectionId::new(target_id) {
        Ok(id) => id,
        Err(e) => {
            send_error(reply, &e.to_string());
            return;
        }
    };

    let usecase = SyncStateUseCase::new(state.repository.clone());
    match usecase.instruct_target(&target_id).await {
        Ok(target) => {
            let instruct = ServerEvent::SyncInstruct {
                from: connection_id.as_str().to_string(),
            };
            let _ = target.sender.send(instruct.to_json());
        }
        Err(e) => {
            tracing::debug!("sync instruct from '{}' dropped: {}", connection_id, e);
        }
    }
}

async fn handle_sync_data(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    reply: &mpsc::UnboundedSender<String>,
    target_id: String,
    payload: Value,
) {
    let target_id = match ConnectionId::new(target_id) {
        Ok(id) => id,
        Err(e) => {
            send_error(reply, &e.to_string());
            return;
        }
    };

    let usecase = SyncStateUseCase::new(state.repository.clone());
    match usecase.deliver(&target_id).await {
        Ok(target) => {
            // Store-and-forward only: the payload is the peers' business.
            let data = ServerEvent::ReceiveSyncData { payload };
            let _ = target.sender.send(data.to_json());
        }
        Err(e) => {
            tracing::debug!("sync data from '{}' dropped: {}", connection_id, e);
        }
    }
}

/// Fan a serialized event out to a target list, logging refused sends.
fn broadcast(targets: &[ConnectionSnapshot], json: &str) {
    for target in targets {
        if target.sender.send(json.to_string()).is_err() {
            tracing::warn!("failed to send to connection '{}'", target.id);
        }
    }
}

fn send_error(reply: &mpsc::UnboundedSender<String>, reason: &str) {
    let event = ServerEvent::Error {
        reason: reason.to_string(),
    };
    let _ = reply.send(event.to_json());
}
