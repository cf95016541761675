use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, success_response, validate_input};
use super::users::UserResponse;
use crate::auth::{AuthUser, TokenResponse};
use crate::errors::ServiceError;
use crate::services::users::RegisterUserInput;
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub token: TokenResponse,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, token issued"),
        (status = 409, description = "Email already in use")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let (user, token) = state
        .services
        .users
        .register(RegisterUserInput {
            name: payload.name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    info!(user_id = %user.id, "new account registered");
    Ok(created_response(AuthResponse {
        user: UserResponse::from(user),
        token,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let (user, token) = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;

    info!(user_id = %user.id, "login succeeded");
    Ok(success_response(AuthResponse {
        user: UserResponse::from(user),
        token,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "The authenticated user"),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.get(actor.user_id).await?;
    Ok(success_response(UserResponse::from(user)))
}

/// Public routes: no auth layer here. `/me` gets its auth layer when the
/// router is assembled.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn auth_me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}
