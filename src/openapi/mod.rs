use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StockTrack API",
        description = r#"
Inventory tracking API: product catalog, categories, suppliers, an
append-only stock ledger, and analytics.

## Authentication

All endpoints except `/auth/register` and `/auth/login` require a JWT:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Failures use a consistent envelope with appropriate status codes:

```json
{
  "success": false,
  "error": { "code": "NOT_FOUND", "message": "product not found" },
  "timestamp": "2026-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, max 100).
        "#
    ),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "users", description = "User management"),
        (name = "categories", description = "Product categories"),
        (name = "suppliers", description = "Supplier directory"),
        (name = "products", description = "Product catalog"),
        (name = "stock", description = "Stock movement ledger"),
        (name = "analytics", description = "Dashboard and trends")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,

        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_current_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::change_password,
        crate::handlers::users::delete_user,

        crate::handlers::categories::create_category,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::patch_supplier,
        crate::handlers::suppliers::delete_supplier,

        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::low_stock_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        crate::handlers::stock::record_movement,
        crate::handlers::stock::list_movements,
        crate::handlers::stock::get_movement,
        crate::handlers::stock::update_movement,
        crate::handlers::stock::delete_movement,

        crate::handlers::analytics::dashboard,
        crate::handlers::analytics::movement_trend,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::handlers::common::PaginatedResponse<serde_json::Value>,
            crate::handlers::common::PaginationMeta,

            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthResponse,

            crate::handlers::users::UserResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::ChangePasswordRequest,

            crate::handlers::categories::CreateCategoryRequest,
            crate::handlers::categories::UpdateCategoryRequest,

            crate::handlers::suppliers::CreateSupplierRequest,
            crate::handlers::suppliers::UpdateSupplierRequest,

            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,

            crate::handlers::stock::RecordMovementRequest,
            crate::handlers::stock::UpdateMovementRequest,
            crate::handlers::stock::MovementResponse,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("StockTrack API"));
        assert!(json.contains("/api/v1/products"));
        assert!(json.contains("/api/v1/stock/movements"));
    }

    #[test]
    fn movement_list_filters_are_documented_as_query_params() {
        let openapi = ApiDocV1::openapi();
        let value = serde_json::to_value(&openapi).unwrap();
        let params = value["paths"]["/api/v1/stock/movements"]["get"]["parameters"]
            .as_array()
            .unwrap();
        let names: Vec<&str> = params
            .iter()
            .filter_map(|p| p["name"].as_str())
            .collect();
        assert!(names.contains(&"product_id"));
        assert!(names.contains(&"movement_type"));
    }
}
