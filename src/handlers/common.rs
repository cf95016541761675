use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::ServiceError;
use crate::ApiResponse;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Success response carrying a human-readable message
pub fn message_response<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::success_with_message(data, message.to_string())),
    )
        .into_response()
}

/// Deserializer for fields where "absent" and "null" mean different things:
/// absent leaves the column alone, null clears it. Pair with
/// `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Validate request input, flattening field errors into one message.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input.validate().map_err(|errors| {
        let mut parts: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect::<Vec<_>>()
                    .join(", ");
                if detail.is_empty() {
                    field.to_string()
                } else {
                    format!("{}: {}", field, detail)
                }
            })
            .collect();
        parts.sort();
        ServiceError::Validation(parts.join("; "))
    })
}

/// Pagination parameters for list operations
#[derive(Debug, Clone, Copy, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    crate::services::DEFAULT_LIMIT
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PaginationParams {
    /// Page clamped to at least 1, limit clamped to 1..=MAX_LIMIT.
    pub fn normalized(&self) -> (u64, u64) {
        (self.page.max(1), self.limit.clamp(1, crate::services::MAX_LIMIT))
    }
}

/// Pagination metadata included in every list response
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, page: u64, limit: u64, total: u64) -> Self {
        Self {
            items,
            pagination: PaginationMeta::new(page, limit, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_rounds_pages_up() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.pages, 3);
    }

    #[test]
    fn pagination_meta_empty_set_has_zero_pages() {
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.pages, 0);
    }

    #[test]
    fn normalized_clamps_out_of_range_values() {
        let params = PaginationParams { page: 0, limit: 10_000 };
        assert_eq!(params.normalized(), (1, crate::services::MAX_LIMIT));

        let params = PaginationParams { page: 3, limit: 0 };
        assert_eq!(params.normalized(), (3, 1));
    }

    #[test]
    fn defaults_match_list_conventions() {
        let params = PaginationParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 20);
    }
}
