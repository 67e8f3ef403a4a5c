use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use spark_types::api::SendMessageRequest;
use spark_types::models::RoomId;

use crate::AppState;
use crate::error::ApiError;

pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ack = state
        .chat
        .send_message(room_id, req.sender_id, &req.body)
        .await?;

    Ok((StatusCode::CREATED, Json(ack)))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state.chat.fetch_history(room_id).await?;

    Ok(Json(history))
}
