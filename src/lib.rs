//! StockTrack API Library
//!
//! Inventory tracking service: product catalog, append-only stock ledger,
//! auth and analytics over a SeaORM-backed store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod services;

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService};
use crate::entities::user;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let auth = Arc::new(AuthService::new(auth::AuthConfig::from_app_config(&config)));
        let services = handlers::AppServices::new(db.clone(), auth.clone(), event_sender.clone());
        Self {
            db,
            config,
            auth,
            event_sender,
            services,
        }
    }
}

/// Envelope every successful response is wrapped in; failures use the
/// error envelope built by [`errors::ServiceError`].
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// All `/api/v1` routes, with auth layers applied per group.
pub fn api_v1_routes(auth: Arc<AuthService>) -> Router<AppState> {
    let public = Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/auth", handlers::auth::auth_routes());

    let authenticated = Router::new()
        .nest("/auth", handlers::auth::auth_me_routes())
        .nest("/users", handlers::users::user_routes())
        .nest("/categories", handlers::categories::category_routes())
        .nest("/suppliers", handlers::suppliers::supplier_routes())
        .nest("/products", handlers::products::product_routes())
        .nest("/stock", handlers::stock::stock_routes())
        .nest("/analytics", handlers::analytics::analytics_routes())
        .with_auth(auth.clone());

    let admin = Router::new()
        .nest("/users", handlers::users::user_admin_routes())
        .with_role(auth, user::ROLE_ADMIN);

    Router::new().merge(public).merge(authenticated).merge(admin)
}

/// Top-level router: `/api/v1` (status and health included), a bare
/// liveness probe at `/`, and the Swagger UI. Every request gets an
/// `x-request-id` (generated when the client did not send one), carried in
/// the trace span and echoed on the response.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .nest("/api/v1", api_v1_routes(state.auth.clone()))
        .merge(openapi::swagger_ui())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

fn request_span(request: &axum::http::Request<axum::body::Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

async fn liveness() -> &'static str {
    "stocktrack-api"
}

async fn api_status() -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "service": "stocktrack-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn success_envelope_carries_data_and_timestamp() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        assert!(response.message.is_none());
        DateTime::parse_from_rfc3339(&response.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn message_envelope_serializes_message() {
        let response = ApiResponse::success_with_message((), "done".to_string());
        let value = serde_json::to_value(&response).expect("serializes");
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "done");
    }
}
