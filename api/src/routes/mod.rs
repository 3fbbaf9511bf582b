mod follow;
mod health;
mod like;
mod post;
mod user;

use crate::{
    dto::{Notice, NoticeLevel, PostResponse},
    errors::ApiError,
    models::{Post, User},
    states::AppState,
};
use axum::{
    Json, Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::num::NonZeroUsize;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_in_flight = concurrency_limit(state.config.max_concurrent_requests);

    Router::new()
        // Public routes (no auth required)
        .route("/health", get(health::health_check))
        .route("/signup", get(user::signup_page).post(user::signup))
        .route("/login", get(user::login_page).post(user::login))
        // Protected routes (auth required)
        .route("/logout", post(user::logout))
        .route("/home", get(post::home))
        .route("/users/{username}", get(user::profile))
        .route("/users/{username}/follow", post(follow::follow))
        .route("/users/{username}/unfollow", post(follow::unfollow))
        .route("/users/{username}/following", get(follow::following_list))
        .route("/users/{username}/followers", get(follow::follower_list))
        .route("/posts/new", get(post::new_post_page).post(post::create_post))
        .route("/posts/{id}", get(post::get_post))
        .route("/posts/{id}/delete", post(post::delete_post))
        .route("/posts/{id}/like", post(like::like))
        .route("/posts/{id}/unlike", post(like::unlike))
        // Add state and middleware
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(max_in_flight)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// `Router::layer` applies a layer to each route separately, so the limit
/// has to share one semaphore across all of them.
fn concurrency_limit(max: NonZeroUsize) -> GlobalConcurrencyLimitLayer {
    GlobalConcurrencyLimitLayer::new(max.get())
}

/// 303 to `location`, with the notice as body.
fn redirect_with(location: &str, level: NoticeLevel, message: impl Into<String>) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location.to_string())],
        Json(Notice {
            level,
            message: message.into(),
        }),
    )
        .into_response()
}

/// Post ids come from the path as text so that a malformed id is just
/// another missing post.
fn post_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("Post not found".into()))
}

fn post_response(state: &AppState, post: Post, author: &User, viewer: &User) -> PostResponse {
    PostResponse {
        like_count: state.likes.like_count(post.id),
        liked: state.likes.has_liked(viewer, post.id),
        id: post.id,
        author: author.username.clone(),
        content: post.content,
        created_at: post.created_at,
    }
}
