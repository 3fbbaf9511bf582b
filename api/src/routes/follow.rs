use super::redirect_with;
use crate::{
    AppState,
    auth::CurrentUser,
    dto::{FollowEntry, FollowListResponse, NoticeLevel},
    errors::ApiError,
    services::{Connection, FollowOutcome, UnfollowOutcome},
};
use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};

/// POST /users/{username}/follow
pub async fn follow(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let (level, message) = match state.graph.follow(&current.user, &username)? {
        FollowOutcome::Followed => (NoticeLevel::Success, format!("You are now following {username}")),
        FollowOutcome::AlreadyFollowing => {
            (NoticeLevel::Info, format!("You already follow {username}"))
        }
    };
    Ok(redirect_with("/home", level, message))
}

/// POST /users/{username}/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> Result<Response, ApiError> {
    let (level, message) = match state.graph.unfollow(&current.user, &username)? {
        UnfollowOutcome::Unfollowed => (NoticeLevel::Success, format!("You unfollowed {username}")),
        UnfollowOutcome::NotFollowing => {
            (NoticeLevel::Info, format!("You don't follow {username}"))
        }
    };
    Ok(redirect_with("/home", level, message))
}

/// GET /users/{username}/following
pub async fn following_list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<FollowListResponse>, ApiError> {
    let (user, connections) = state.graph.list_following(&username)?;
    Ok(Json(list_response(user.username, connections)))
}

/// GET /users/{username}/followers
pub async fn follower_list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<FollowListResponse>, ApiError> {
    let (user, connections) = state.graph.list_followers(&username)?;
    Ok(Json(list_response(user.username, connections)))
}

fn list_response(user: String, connections: Vec<Connection>) -> FollowListResponse {
    FollowListResponse {
        user,
        entries: connections
            .into_iter()
            .map(|c| FollowEntry {
                username: c.user.username,
                followed_at: c.since,
            })
            .collect(),
    }
}
