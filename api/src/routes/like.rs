use super::post_id;
use crate::{AppState, auth::CurrentUser, dto::LikeCountResponse, errors::ApiError};
use axum::{
    Json,
    extract::{Path, State},
};

/// POST /posts/{id}/like
pub async fn like(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LikeCountResponse>, ApiError> {
    let like_count = state.likes.like(&current.user, post_id(&id)?)?;
    Ok(Json(LikeCountResponse { like_count }))
}

/// POST /posts/{id}/unlike
pub async fn unlike(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LikeCountResponse>, ApiError> {
    let like_count = state.likes.unlike(&current.user, post_id(&id)?)?;
    Ok(Json(LikeCountResponse { like_count }))
}
