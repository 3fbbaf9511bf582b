use super::post_response;
use crate::{
    AppState,
    auth::{CurrentUser, expired_session_cookie, session_cookie},
    dto::{AuthResponse, FormPage, LoginForm, ProfileResponse, SignupForm},
    errors::ApiError,
    services::Session,
};
use axum::{
    Form, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

/// Redirects home with the session cookie set. The token is also in the
/// body for clients that send it as a bearer header.
fn signed_in(state: &AppState, jar: CookieJar, session: Session) -> Response {
    let jar = jar.add(session_cookie(
        session.token.clone(),
        state.accounts.token_ttl_hours(),
    ));
    (
        StatusCode::SEE_OTHER,
        jar,
        [(header::LOCATION, "/home")],
        Json(AuthResponse {
            token: session.token,
            user: session.user.into(),
        }),
    )
        .into_response()
}

/// GET /signup
pub async fn signup_page() -> Json<FormPage> {
    Json(FormPage {
        form: "signup",
        fields: &["username", "email", "password1", "password2"],
    })
}

/// POST /signup
/// Body (form): username, email, password1, password2
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, ApiError> {
    let session = state.accounts.signup(form).await?;
    Ok(signed_in(&state, jar, session))
}

/// GET /login
pub async fn login_page() -> Json<FormPage> {
    Json(FormPage {
        form: "login",
        fields: &["username", "password"],
    })
}

/// POST /login
/// Body (form): username, password
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let session = state.accounts.login(form).await?;
    Ok(signed_in(&state, jar, session))
}

/// POST /logout
/// The session cookie, when the request carried one, is expired as well.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    current: CurrentUser,
) -> Response {
    state.accounts.logout(&current);
    (
        StatusCode::SEE_OTHER,
        jar.remove(expired_session_cookie()),
        [(header::LOCATION, "/login")],
    )
        .into_response()
}

/// GET /users/{username}
pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.accounts.find_by_username(&username)?;

    let posts = state
        .content
        .posts_by(&user)
        .into_iter()
        .map(|post| post_response(&state, post, &user, &current.user))
        .collect();

    Ok(Json(ProfileResponse {
        is_following: state.graph.is_following(&current.user, &user),
        following_count: state.graph.count_following(&user),
        follower_count: state.graph.count_followers(&user),
        posts,
        user: user.into(),
    }))
}
