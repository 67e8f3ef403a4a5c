use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use spark_types::api::{CreateRoomRequest, CreateRoomResponse};

use crate::AppState;
use crate::error::ApiError;

/// One room per matched pair: repeated calls (either argument order) return
/// the same room id.
pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let room_id = state.chat.create_room(req.user_a_id, req.user_b_id).await?;

    Ok((StatusCode::CREATED, Json(CreateRoomResponse { room_id })))
}
