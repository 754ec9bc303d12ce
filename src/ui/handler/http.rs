//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::RoomId,
    infrastructure::dto::http::{ParticipantDetailDto, RoomDetailDto, RoomSummaryDto},
    time::timestamp_to_rfc3339,
    ui::state::AppState,
};

/// Health check endpoint, reporting the live connection count
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let connections = state.repository.count_connections().await;
    Json(serde_json::json!({"status": "ok", "connections": connections}))
}

/// Get the list of active rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.repository.list_rooms().await;

    let mut summaries: Vec<RoomSummaryDto> = rooms
        .iter()
        .map(|room| RoomSummaryDto {
            id: room.id.as_str().to_string(),
            participants: room
                .participants
                .iter()
                .map(|p| p.id.as_str().to_string())
                .collect(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        })
        .collect();
    summaries.sort_by(|a, b| a.id.cmp(&b.id));

    Json(summaries)
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, StatusCode> {
    let room_id = RoomId::new(room_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    let room = state
        .repository
        .get_room(&room_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let detail = RoomDetailDto {
        id: room.id.as_str().to_string(),
        participants: room
            .participants
            .iter()
            .map(|p| ParticipantDetailDto {
                connection_id: p.id.as_str().to_string(),
                display_name: p.display_name.as_str().to_string(),
                role: p.role.as_str().to_string(),
                connected_at: timestamp_to_rfc3339(p.connected_at.value()),
            })
            .collect(),
        created_at: timestamp_to_rfc3339(room.created_at.value()),
    };

    Ok(Json(detail))
}
