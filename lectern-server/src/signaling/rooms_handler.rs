use crate::signaling::SignalingService;
use axum::Json;
use axum::extract::{Path, State};
use lectern_core::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomExistsResponse {
    pub exists: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateRoomResponse {
    pub room_id: RoomId,
}

/// `GET /rooms/{id}/exists`
pub async fn room_exists(
    Path(room_id): Path<String>,
    State(service): State<SignalingService>,
) -> Json<RoomExistsResponse> {
    let exists = service.registry().contains(&RoomId::from(room_id));
    Json(RoomExistsResponse { exists })
}

/// `POST /rooms/{id}`, idempotent.
pub async fn create_room(
    Path(room_id): Path<String>,
    State(service): State<SignalingService>,
) -> Json<CreateRoomResponse> {
    let room_id = RoomId::from(room_id);
    service.registry().get_or_create(&room_id);
    Json(CreateRoomResponse { room_id })
}
