use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::common::{
    created_response, message_response, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::auth::AuthUser;
use crate::entities::category;
use crate::errors::ServiceError;
use crate::services::categories::{CreateCategoryInput, UpdateCategoryInput};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_status")]
    pub status: Option<String>,
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        category::STATUS_ACTIVE | category::STATUS_INACTIVE => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("status");
            err.message = Some("status must be 'active' or 'inactive'".into());
            Err(err)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created"),
        (status = 409, description = "Name already in use")
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let created = state
        .services
        .categories
        .create(
            CreateCategoryInput {
                name: payload.name,
                description: payload.description,
            },
            Some(actor.user_id),
        )
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(PaginationParams),
    responses((status = 200, description = "Paginated category list")),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, limit) = pagination.normalized();
    let (categories, total) = state.services.categories.list(page, limit).await?;
    Ok(success_response(PaginatedResponse::new(
        categories, page, limit, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    responses(
        (status = 200, description = "Category found"),
        (status = 404, description = "Unknown category")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let found = state.services.categories.get(id).await?;
    Ok(success_response(found))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated"),
        (status = 409, description = "Name already in use")
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .categories
        .update(
            id,
            UpdateCategoryInput {
                name: payload.name,
                description: payload.description,
                status: payload.status,
            },
            Some(actor.user_id),
        )
        .await?;
    Ok(success_response(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    responses((status = 200, description = "Category deactivated")),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .categories
        .delete(id, Some(actor.user_id))
        .await?;
    Ok(message_response(
        serde_json::json!({ "id": id }),
        "category deactivated",
    ))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_category).get(list_categories))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}
