use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use spark_types::api::MatchesResponse;
use spark_types::models::UserId;

use crate::AppState;
use crate::error::ApiError;

pub async fn list_matches(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let matches = tokio::task::spawn_blocking(move || engine.matches_for(user_id)).await??;

    Ok(Json(MatchesResponse { matches }))
}

pub async fn match_between(
    State(state): State<AppState>,
    Path((user_id, other_id)): Path<(UserId, UserId)>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let found =
        tokio::task::spawn_blocking(move || engine.match_between(user_id, other_id)).await??;

    Ok(Json(found))
}
