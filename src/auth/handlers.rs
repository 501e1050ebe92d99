use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse},
        extractors::AuthUser,
    },
    error::AppError,
    extractors::AppJson,
    state::AppState,
    users::dto::{UserRequest, UserResponse},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserRequest>,
) -> Result<(StatusCode, &'static str), AppError> {
    state.users.create_user(payload).await?;
    Ok((StatusCode::CREATED, "User registered successfully"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let token = state.auth.authenticate_user(payload).await?;
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".into(),
        expires_in: state.keys.ttl().as_secs(),
    }))
}

#[instrument(skip(state, subject), fields(subject = %subject.subject))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(subject): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    match state.users.find_user_by_email(&subject.subject).await? {
        Some(user) => Ok(Json(user)),
        None => {
            warn!("token subject no longer exists");
            Err(AppError::InvalidCredentials)
        }
    }
}
