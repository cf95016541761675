use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{
    created_response, message_response, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::auth::AuthUser;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::services::users::{CreateUserInput, UpdateUserInput};
use crate::AppState;

/// User payload returned by the API; never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(custom = "validate_role")]
    pub role: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom = "validate_role")]
    pub role: Option<String>,
    #[validate(custom = "validate_status")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub new_password: String,
}

fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    match role {
        user::ROLE_ADMIN | user::ROLE_USER => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("role");
            err.message = Some("role must be 'admin' or 'user'".into());
            Err(err)
        }
    }
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        user::STATUS_ACTIVE | user::STATUS_INACTIVE => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("status");
            err.message = Some("status must be 'active' or 'inactive'".into());
            Err(err)
        }
    }
}

fn ensure_admin_or_self(actor: &AuthUser, target: Uuid) -> Result<(), ServiceError> {
    if actor.is_admin() || actor.user_id == target {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "may only access your own account".to_string(),
        ))
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 409, description = "Email already in use")
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let created = state
        .services
        .users
        .create(
            CreateUserInput {
                name: payload.name,
                email: payload.email,
                password: payload.password,
                role: payload.role,
            },
            Some(actor.user_id),
        )
        .await?;

    info!(user_id = %created.id, "user created by admin");
    Ok(created_response(UserResponse::from(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(PaginationParams),
    responses((status = 200, description = "Paginated user list")),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, limit) = pagination.normalized();
    let (users, total) = state.services.users.list(page, limit).await?;
    let items: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(success_response(PaginatedResponse::new(
        items, page, limit, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses((status = 200, description = "The authenticated user")),
    tag = "users"
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.get(actor.user_id).await?;
    Ok(success_response(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    responses(
        (status = 200, description = "User found"),
        (status = 404, description = "Unknown user")
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_admin_or_self(&actor, id)?;
    let user = state.services.users.get(id).await?;
    Ok(success_response(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Would remove the last admin")
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_admin_or_self(&actor, id)?;
    validate_input(&payload)?;

    // Only admins may change roles or account status.
    if !actor.is_admin() && (payload.role.is_some() || payload.status.is_some()) {
        return Err(ServiceError::Forbidden(
            "only admins may change role or status".to_string(),
        ));
    }

    let updated = state
        .services
        .users
        .update(
            id,
            UpdateUserInput {
                name: payload.name,
                email: payload.email,
                role: payload.role,
                status: payload.status,
            },
            Some(actor.user_id),
        )
        .await?;
    Ok(success_response(UserResponse::from(updated)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Current password mismatch")
    ),
    tag = "users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    ensure_admin_or_self(&actor, id)?;
    validate_input(&payload)?;

    // Admins may reset any password without the current one; everyone else
    // must prove they know theirs.
    let verify_current = !actor.is_admin() || actor.user_id == id;
    state
        .services
        .users
        .change_password(
            id,
            payload.current_password.as_deref(),
            &payload.new_password,
            verify_current,
            Some(actor.user_id),
        )
        .await?;
    Ok(message_response(serde_json::json!({ "id": id }), "password changed"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    responses(
        (status = 200, description = "User deactivated"),
        (status = 400, description = "Would remove the last admin")
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.users.delete(id, Some(actor.user_id)).await?;
    Ok(message_response(
        serde_json::json!({ "id": id }),
        "user deactivated",
    ))
}

/// Routes any authenticated user may reach; self-or-admin checks live in the
/// handlers because the target id is only known per request.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_current_user))
        .route("/:id", get(get_user).put(update_user))
        .route("/:id/change-password", post(change_password))
}

/// Routes gated behind the admin role layer.
pub fn user_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/:id", delete(delete_user))
}
