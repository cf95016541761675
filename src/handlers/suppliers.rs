use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::{
    created_response, double_option, message_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::auth::AuthUser;
use crate::entities::supplier;
use crate::errors::ServiceError;
use crate::services::suppliers::{CreateSupplierInput, UpdateSupplierInput};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 255))]
    pub contact_person: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub contact_person: Option<Option<String>>,
    #[validate(custom = "validate_status")]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SupplierListParams {
    /// Substring match on name or email
    pub search: Option<String>,
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        supplier::STATUS_ACTIVE | supplier::STATUS_INACTIVE => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("status");
            err.message = Some("status must be 'active' or 'inactive'".into());
            Err(err)
        }
    }
}

impl From<UpdateSupplierRequest> for UpdateSupplierInput {
    fn from(req: UpdateSupplierRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            address: req.address,
            contact_person: req.contact_person,
            status: req.status,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    request_body = CreateSupplierRequest,
    responses(
        (status = 201, description = "Supplier created"),
        (status = 409, description = "Email already in use")
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let created = state
        .services
        .suppliers
        .create(
            CreateSupplierInput {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                address: payload.address,
                contact_person: payload.contact_person,
            },
            Some(actor.user_id),
        )
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    params(PaginationParams, SupplierListParams),
    responses((status = 200, description = "Paginated supplier list")),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(params): Query<SupplierListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, limit) = pagination.normalized();
    let (suppliers, total) = state
        .services
        .suppliers
        .list(page, limit, params.search.as_deref())
        .await?;
    Ok(success_response(PaginatedResponse::new(
        suppliers, page, limit, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{id}",
    responses(
        (status = 200, description = "Supplier found"),
        (status = 404, description = "Unknown supplier")
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let found = state.services.suppliers.get(id).await?;
    Ok(success_response(found))
}

#[utoipa::path(
    put,
    path = "/api/v1/suppliers/{id}",
    request_body = UpdateSupplierRequest,
    responses((status = 200, description = "Supplier updated")),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .suppliers
        .update(id, payload.into(), Some(actor.user_id))
        .await?;
    Ok(success_response(updated))
}

// PATCH and PUT share the partial-update semantics: absent fields are left
// untouched either way.
#[utoipa::path(
    patch,
    path = "/api/v1/suppliers/{id}",
    request_body = UpdateSupplierRequest,
    responses((status = 200, description = "Supplier updated")),
    tag = "suppliers"
)]
pub async fn patch_supplier(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .suppliers
        .update(id, payload.into(), Some(actor.user_id))
        .await?;
    Ok(success_response(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/{id}",
    responses((status = 200, description = "Supplier deactivated")),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .suppliers
        .delete(id, Some(actor.user_id))
        .await?;
    Ok(message_response(
        serde_json::json!({ "id": id }),
        "supplier deactivated",
    ))
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_supplier).get(list_suppliers))
        .route(
            "/:id",
            get(get_supplier)
                .put(update_supplier)
                .patch(patch_supplier)
                .delete(delete_supplier),
        )
}
