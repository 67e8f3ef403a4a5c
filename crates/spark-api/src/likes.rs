use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use spark_types::api::{LikeRequest, LikeResponse, LikersResponse, UnlikeResponse};
use spark_types::models::UserId;

use crate::AppState;
use crate::error::ApiError;

pub async fn like(
    State(state): State<AppState>,
    Json(req): Json<LikeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking DB work off the async runtime
    let engine = state.engine.clone();
    let outcome =
        tokio::task::spawn_blocking(move || engine.like(req.liker_id, req.liked_id)).await??;

    Ok(Json(LikeResponse { result: outcome }))
}

pub async fn unlike(
    State(state): State<AppState>,
    Json(req): Json<LikeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || engine.unlike(req.liker_id, req.liked_id)).await??;

    Ok(Json(UnlikeResponse {
        result: "unliked".to_string(),
    }))
}

pub async fn list_likers(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let liked_by = tokio::task::spawn_blocking(move || engine.list_likers(user_id)).await??;

    Ok(Json(LikersResponse { liked_by }))
}
