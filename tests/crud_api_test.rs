//! CRUD flows for categories, suppliers, products and users.

mod common;

use axum::{
    body::Body,
    http::{Method, Request},
};
use common::{response_json, TestApp};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn category_lifecycle_with_soft_delete() {
    let app = TestApp::new().await;

    let created = app
        .request_as_admin(
            Method::POST,
            "/api/v1/categories",
            Some(json!({ "name": "Electronics", "description": "Gadgets" })),
        )
        .await;
    assert_eq!(created.status(), 201);
    let body = response_json(created).await;
    let id = body["data"]["id"].as_str().expect("category id").to_string();
    assert_eq!(body["data"]["status"], "active");

    let updated = app
        .request_as_admin(
            Method::PUT,
            &format!("/api/v1/categories/{id}"),
            Some(json!({ "name": "Consumer Electronics" })),
        )
        .await;
    assert_eq!(updated.status(), 200);
    let body = response_json(updated).await;
    assert_eq!(body["data"]["name"], "Consumer Electronics");

    let deleted = app
        .request_as_admin(Method::DELETE, &format!("/api/v1/categories/{id}"), None)
        .await;
    assert_eq!(deleted.status(), 200);

    // Soft delete: the row survives with inactive status.
    let fetched = app
        .request_as_admin(Method::GET, &format!("/api/v1/categories/{id}"), None)
        .await;
    assert_eq!(fetched.status(), 200);
    let body = response_json(fetched).await;
    assert_eq!(body["data"]["status"], "inactive");
}

#[tokio::test]
async fn duplicate_category_name_conflicts() {
    let app = TestApp::new().await;

    let payload = json!({ "name": "Tools" });
    let first = app
        .request_as_admin(Method::POST, "/api/v1/categories", Some(payload.clone()))
        .await;
    assert_eq!(first.status(), 201);

    let second = app
        .request_as_admin(Method::POST, "/api/v1/categories", Some(payload))
        .await;
    assert_eq!(second.status(), 409);
    let body = response_json(second).await;
    assert_eq!(body["error"]["code"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn supplier_patch_clears_nullable_fields() {
    let app = TestApp::new().await;

    let created = app
        .request_as_admin(
            Method::POST,
            "/api/v1/suppliers",
            Some(json!({
                "name": "Acme Supply",
                "email": "sales@acme.example",
                "phone": "+1-555-0100",
            })),
        )
        .await;
    assert_eq!(created.status(), 201);
    let body = response_json(created).await;
    let id = body["data"]["id"].as_str().expect("supplier id").to_string();

    // Explicit null clears the phone; an absent field leaves email alone.
    let patched = app
        .request_as_admin(
            Method::PATCH,
            &format!("/api/v1/suppliers/{id}"),
            Some(json!({ "phone": null, "contact_person": "Jo Vendor" })),
        )
        .await;
    assert_eq!(patched.status(), 200);
    let body = response_json(patched).await;
    assert_eq!(body["data"]["phone"], serde_json::Value::Null);
    assert_eq!(body["data"]["contact_person"], "Jo Vendor");
    assert_eq!(body["data"]["email"], "sales@acme.example");
}

#[tokio::test]
async fn supplier_search_matches_name_or_email() {
    let app = TestApp::new().await;

    for (name, email) in [
        ("Acme Supply", "sales@acme.example"),
        ("Globex", "orders@globex.example"),
    ] {
        let response = app
            .request_as_admin(
                Method::POST,
                "/api/v1/suppliers",
                Some(json!({ "name": name, "email": email })),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let listed = app
        .request_as_admin(Method::GET, "/api/v1/suppliers?search=acme", None)
        .await;
    let body = response_json(listed).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Acme Supply");
}

#[tokio::test]
async fn duplicate_sku_conflicts() {
    let app = TestApp::new().await;

    let payload = json!({ "name": "Widget", "sku": "SKU-1", "price": "1.00" });
    let first = app
        .request_as_admin(Method::POST, "/api/v1/products", Some(payload.clone()))
        .await;
    assert_eq!(first.status(), 201);

    let second = app
        .request_as_admin(Method::POST, "/api/v1/products", Some(payload))
        .await;
    assert_eq!(second.status(), 409);
    let body = response_json(second).await;
    assert_eq!(body["error"]["code"], "SKU_EXISTS");
}

#[tokio::test]
async fn product_with_unknown_category_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Widget",
                "sku": "SKU-2",
                "price": "1.00",
                "category_id": "00000000-0000-0000-0000-000000000001",
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "FOREIGN_KEY_VIOLATION");
}

#[tokio::test]
async fn product_delete_is_a_soft_delete() {
    let app = TestApp::new().await;

    let created = app
        .request_as_admin(
            Method::POST,
            "/api/v1/products",
            Some(json!({ "name": "Widget", "sku": "SKU-3", "price": "1.00" })),
        )
        .await;
    let body = response_json(created).await;
    let id = body["data"]["id"].as_str().expect("product id").to_string();

    let deleted = app
        .request_as_admin(Method::DELETE, &format!("/api/v1/products/{id}"), None)
        .await;
    assert_eq!(deleted.status(), 200);

    let fetched = app
        .request_as_admin(Method::GET, &format!("/api/v1/products/{id}"), None)
        .await;
    assert_eq!(fetched.status(), 200);
    let body = response_json(fetched).await;
    assert_eq!(body["data"]["is_active"], false);
}

#[tokio::test]
async fn low_stock_listing_only_returns_breached_active_products() {
    let app = TestApp::new().await;

    for (sku, quantity, threshold) in [("LOW-1", 3, 5), ("OK-1", 50, 5)] {
        let response = app
            .request_as_admin(
                Method::POST,
                "/api/v1/products",
                Some(json!({
                    "name": format!("Product {sku}"),
                    "sku": sku,
                    "price": "2.50",
                    "quantity": quantity,
                    "low_stock_threshold": threshold,
                })),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let listed = app
        .request_as_admin(Method::GET, "/api/v1/products/low-stock", None)
        .await;
    assert_eq!(listed.status(), 200);
    let body = response_json(listed).await;
    let items = body["data"].as_array().expect("low stock array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["sku"], "LOW-1");
}

#[tokio::test]
async fn pagination_caps_the_limit() {
    let app = TestApp::new().await;

    for i in 0..3 {
        let response = app
            .request_as_admin(
                Method::POST,
                "/api/v1/categories",
                Some(json!({ "name": format!("Category {i}") })),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let listed = app
        .request_as_admin(Method::GET, "/api/v1/categories?page=1&limit=2", None)
        .await;
    let body = response_json(listed).await;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["data"]["pagination"]["total"], 3);
    assert_eq!(body["data"]["pagination"]["pages"], 2);

    // limit above the cap falls back to the maximum (100)
    let capped = app
        .request_as_admin(Method::GET, "/api/v1/categories?limit=1000", None)
        .await;
    let body = response_json(capped).await;
    assert_eq!(body["data"]["pagination"]["limit"], 100);
}

#[tokio::test]
async fn the_last_admin_cannot_be_removed() {
    let app = TestApp::new().await;
    let admin_id = app.admin.id;

    let demoted = app
        .request_as_admin(
            Method::PUT,
            &format!("/api/v1/users/{admin_id}"),
            Some(json!({ "role": "user" })),
        )
        .await;
    assert_eq!(demoted.status(), 400);
    let body = response_json(demoted).await;
    assert_eq!(body["error"]["code"], "LAST_ADMIN");

    let deleted = app
        .request_as_admin(Method::DELETE, &format!("/api/v1/users/{admin_id}"), None)
        .await;
    assert_eq!(deleted.status(), 400);
    let body = response_json(deleted).await;
    assert_eq!(body["error"]["code"], "LAST_ADMIN");
}

#[tokio::test]
async fn a_second_admin_unlocks_demotion() {
    let app = TestApp::new().await;
    let admin_id = app.admin.id;

    let promoted = app
        .request_as_admin(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Second Admin",
                "email": "admin2@example.com",
                "password": "another-password",
                "role": "admin",
            })),
        )
        .await;
    assert_eq!(promoted.status(), 201);

    let demoted = app
        .request_as_admin(
            Method::PUT,
            &format!("/api/v1/users/{admin_id}"),
            Some(json!({ "role": "user" })),
        )
        .await;
    assert_eq!(demoted.status(), 200);
    let body = response_json(demoted).await;
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn regular_users_cannot_change_their_own_role() {
    let app = TestApp::new().await;
    let (user, token) = app.seed_user("plain@example.com").await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/users/{}", user.id),
            Some(json!({ "role": "admin" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/", None, None).await;
    assert_eq!(response.status(), 200);
    let generated = response
        .headers()
        .get("x-request-id")
        .expect("request id header")
        .to_str()
        .expect("ascii request id");
    assert!(!generated.is_empty());

    // A client-supplied id is kept and echoed back.
    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .header("x-request-id", "client-supplied-id")
        .body(Body::empty())
        .expect("build request");
    let response = app
        .router()
        .oneshot(request)
        .await
        .expect("router error during test request");
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .expect("request id header"),
        "client-supplied-id"
    );
}
