use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::{
    created_response, double_option, message_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::services::products::{CreateProductInput, ProductFilter, UpdateProductInput};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    /// Opening stock; later changes go through the stock ledger.
    #[serde(default)]
    pub quantity: i32,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,
}

fn default_low_stock_threshold() -> i32 {
    10
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub supplier_id: Option<Option<Uuid>>,
    #[schema(value_type = Option<String>, example = "24.50")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub low_stock_threshold: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductListParams {
    /// Substring match on name or SKU
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub is_active: Option<bool>,
    /// When true, only products at or below their low-stock threshold
    #[serde(default)]
    pub low_stock: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Unknown category or supplier"),
        (status = 409, description = "SKU already in use")
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let created = state
        .services
        .products
        .create(
            CreateProductInput {
                name: payload.name,
                sku: payload.sku,
                description: payload.description,
                category_id: payload.category_id,
                supplier_id: payload.supplier_id,
                price: payload.price,
                quantity: payload.quantity,
                low_stock_threshold: payload.low_stock_threshold,
            },
            Some(actor.user_id),
        )
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams, ProductListParams),
    responses((status = 200, description = "Paginated product list")),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(params): Query<ProductListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, limit) = pagination.normalized();
    let filter = ProductFilter {
        search: params.search,
        category_id: params.category_id,
        supplier_id: params.supplier_id,
        is_active: params.is_active,
        low_stock: params.low_stock,
    };
    let (products, total) = state.services.products.list(filter, page, limit).await?;
    Ok(success_response(PaginatedResponse::new(
        products, page, limit, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    responses((status = 200, description = "Active products at or below their threshold")),
    tag = "products"
)]
pub async fn low_stock_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.products.low_stock().await?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    responses(
        (status = 200, description = "Product found"),
        (status = 404, description = "Unknown product")
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let found = state.services.products.get(id).await?;
    Ok(success_response(found))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated"),
        (status = 409, description = "SKU already in use")
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .products
        .update(
            id,
            UpdateProductInput {
                name: payload.name,
                sku: payload.sku,
                description: payload.description,
                category_id: payload.category_id,
                supplier_id: payload.supplier_id,
                price: payload.price,
                low_stock_threshold: payload.low_stock_threshold,
                is_active: payload.is_active,
            },
            Some(actor.user_id),
        )
        .await?;
    Ok(success_response(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    responses((status = 200, description = "Product deactivated")),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .products
        .delete(id, Some(actor.user_id))
        .await?;
    Ok(message_response(
        serde_json::json!({ "id": id }),
        "product deactivated",
    ))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/low-stock", get(low_stock_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}
