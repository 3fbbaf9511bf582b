use super::{post_id, post_response, redirect_with};
use crate::{
    AppState,
    auth::CurrentUser,
    dto::{FormPage, NoticeLevel, PaginatedResponse, PaginationParams, PostForm, PostResponse},
    errors::ApiError,
};
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::Response,
};

/// GET /home?page=1&limit=50
pub async fn home(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Json<PaginatedResponse<PostResponse>> {
    let posts = state
        .content
        .list_posts()
        .into_iter()
        .map(|entry| post_response(&state, entry.post, &entry.author, &current.user))
        .collect();

    Json(PaginatedResponse::paginate(posts, &params))
}

/// GET /posts/new
pub async fn new_post_page(_current: CurrentUser) -> Json<FormPage> {
    Json(FormPage {
        form: "post",
        fields: &["content"],
    })
}

/// POST /posts/new
/// Body (form): content
pub async fn create_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<PostForm>,
) -> Result<Response, ApiError> {
    state.content.create_post(&current.user, &form.content)?;
    Ok(redirect_with("/home", NoticeLevel::Success, "Posted"))
}

/// GET /posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let entry = state.content.get_post(post_id(&id)?)?;
    Ok(Json(post_response(
        &state,
        entry.post,
        &entry.author,
        &current.user,
    )))
}

/// POST /posts/{id}/delete
/// Only the author may delete.
pub async fn delete_post(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state.content.delete_post(&current.user, post_id(&id)?)?;
    Ok(redirect_with("/home", NoticeLevel::Success, "Post deleted"))
}
