use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::{
    created_response, double_option, message_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::auth::AuthUser;
use crate::entities::stock_movement::MovementType;
use crate::entities::{product, stock_movement};
use crate::errors::ServiceError;
use crate::services::stock::{MovementFilter, RecordMovementInput, UpdateMovementInput};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordMovementRequest {
    #[schema(value_type = String, example = "in")]
    pub movement_type: MovementType,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMovementRequest {
    #[schema(value_type = Option<String>, example = "out")]
    pub movement_type: Option<MovementType>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub reason: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub reference: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MovementListParams {
    pub product_id: Option<Uuid>,
    /// "in" or "out"
    #[param(value_type = Option<String>)]
    pub movement_type: Option<MovementType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// A movement together with the product quantity it produced.
#[derive(Debug, Serialize, ToSchema)]
pub struct MovementResponse {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub movement: stock_movement::Model,
    pub product_quantity: i32,
}

#[utoipa::path(
    post,
    path = "/api/v1/stock/products/{id}",
    request_body = RecordMovementRequest,
    responses(
        (status = 201, description = "Movement recorded"),
        (status = 400, description = "Would drive stock negative"),
        (status = 404, description = "Unknown product")
    ),
    tag = "stock"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<RecordMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let (movement, product) = state
        .services
        .stock
        .record(
            RecordMovementInput {
                product_id,
                movement_type: payload.movement_type,
                quantity: payload.quantity,
                reason: payload.reason,
                reference: payload.reference,
            },
            Some(actor.user_id),
        )
        .await?;
    Ok(created_response(MovementResponse {
        movement,
        product_quantity: product.quantity,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/movements",
    params(PaginationParams, MovementListParams),
    responses((status = 200, description = "Paginated movement list, newest first")),
    tag = "stock"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(params): Query<MovementListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, limit) = pagination.normalized();
    let filter = MovementFilter {
        product_id: params.product_id,
        movement_type: params.movement_type,
        from: params.from,
        to: params.to,
    };
    let (movements, total) = state.services.stock.list(filter, page, limit).await?;
    Ok(success_response(PaginatedResponse::new(
        movements, page, limit, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/movements/{id}",
    responses(
        (status = 200, description = "Movement found"),
        (status = 404, description = "Unknown movement")
    ),
    tag = "stock"
)]
pub async fn get_movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let movement = state.services.stock.get(id).await?;
    Ok(success_response(movement))
}

#[utoipa::path(
    put,
    path = "/api/v1/stock/movements/{id}",
    request_body = UpdateMovementRequest,
    responses(
        (status = 200, description = "Movement corrected and product re-balanced"),
        (status = 400, description = "Correction would drive stock negative")
    ),
    tag = "stock"
)]
pub async fn update_movement(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let (movement, product) = state
        .services
        .stock
        .update(
            id,
            UpdateMovementInput {
                movement_type: payload.movement_type,
                quantity: payload.quantity,
                reason: payload.reason,
                reference: payload.reference,
            },
            Some(actor.user_id),
        )
        .await?;
    Ok(success_response(MovementResponse {
        movement,
        product_quantity: product.quantity,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/stock/movements/{id}",
    responses(
        (status = 200, description = "Movement deleted and its effect reversed"),
        (status = 400, description = "Reversal would drive stock negative")
    ),
    tag = "stock"
)]
pub async fn delete_movement(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product: product::Model = state.services.stock.delete(id, Some(actor.user_id)).await?;
    Ok(message_response(
        serde_json::json!({ "id": id, "product_quantity": product.quantity }),
        "movement deleted and reversed",
    ))
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/products/:id", post(record_movement))
        .route("/movements", get(list_movements))
        .route(
            "/movements/:id",
            get(get_movement).put(update_movement).delete(delete_movement),
        )
}
