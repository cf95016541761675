//! Stock ledger integration tests: recording, correcting and deleting
//! movements while keeping the product quantity non-negative.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;

async fn seed_product(app: &TestApp, sku: &str, quantity: i32) -> String {
    let response = app
        .request_as_admin(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": format!("Widget {sku}"),
                "sku": sku,
                "price": "9.99",
                "quantity": quantity,
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    body["data"]["id"].as_str().expect("product id").to_string()
}

#[tokio::test]
async fn outbound_movement_reduces_quantity() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "WID-001", 100).await;

    let response = app
        .request_as_admin(
            Method::POST,
            &format!("/api/v1/stock/products/{product_id}"),
            Some(json!({
                "movement_type": "out",
                "quantity": 30,
                "reason": "sale",
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["product_quantity"], 70);
}

#[tokio::test]
async fn overdraw_is_rejected_and_quantity_unchanged() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "WID-002", 100).await;

    let ok = app
        .request_as_admin(
            Method::POST,
            &format!("/api/v1/stock/products/{product_id}"),
            Some(json!({ "movement_type": "out", "quantity": 30 })),
        )
        .await;
    assert_eq!(ok.status(), 201);

    // 70 on hand, taking 80 must fail
    let overdraw = app
        .request_as_admin(
            Method::POST,
            &format!("/api/v1/stock/products/{product_id}"),
            Some(json!({ "movement_type": "out", "quantity": 80 })),
        )
        .await;
    assert_eq!(overdraw.status(), 400);
    let body = response_json(overdraw).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");

    let product = app
        .request_as_admin(Method::GET, &format!("/api/v1/products/{product_id}"), None)
        .await;
    let body = response_json(product).await;
    assert_eq!(body["data"]["quantity"], 70);
}

#[tokio::test]
async fn editing_a_movement_rebalances_the_product() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "WID-003", 50).await;

    let recorded = app
        .request_as_admin(
            Method::POST,
            &format!("/api/v1/stock/products/{product_id}"),
            Some(json!({ "movement_type": "out", "quantity": 10 })),
        )
        .await;
    let body = response_json(recorded).await;
    let movement_id = body["data"]["id"].as_str().expect("movement id").to_string();
    assert_eq!(body["data"]["product_quantity"], 40);

    // Correct the quantity from 10 to 25: reverse then reapply.
    let updated = app
        .request_as_admin(
            Method::PUT,
            &format!("/api/v1/stock/movements/{movement_id}"),
            Some(json!({ "quantity": 25 })),
        )
        .await;
    assert_eq!(updated.status(), 200);
    let body = response_json(updated).await;
    assert_eq!(body["data"]["product_quantity"], 25);

    // Flip direction too: out 25 becomes in 5.
    let flipped = app
        .request_as_admin(
            Method::PUT,
            &format!("/api/v1/stock/movements/{movement_id}"),
            Some(json!({ "movement_type": "in", "quantity": 5 })),
        )
        .await;
    assert_eq!(flipped.status(), 200);
    let body = response_json(flipped).await;
    assert_eq!(body["data"]["product_quantity"], 55);
}

#[tokio::test]
async fn edit_that_would_overdraw_is_rejected() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "WID-004", 20).await;

    let recorded = app
        .request_as_admin(
            Method::POST,
            &format!("/api/v1/stock/products/{product_id}"),
            Some(json!({ "movement_type": "in", "quantity": 5 })),
        )
        .await;
    let body = response_json(recorded).await;
    let movement_id = body["data"]["id"].as_str().expect("movement id").to_string();

    // Reversing the +5 leaves 20; an outbound 30 would go negative.
    let rejected = app
        .request_as_admin(
            Method::PUT,
            &format!("/api/v1/stock/movements/{movement_id}"),
            Some(json!({ "movement_type": "out", "quantity": 30 })),
        )
        .await;
    assert_eq!(rejected.status(), 400);
    let body = response_json(rejected).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");

    // The failed edit must not have touched the product.
    let product = app
        .request_as_admin(Method::GET, &format!("/api/v1/products/{product_id}"), None)
        .await;
    let body = response_json(product).await;
    assert_eq!(body["data"]["quantity"], 25);
}

#[tokio::test]
async fn deleting_a_movement_reverses_its_effect() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "WID-005", 10).await;

    let recorded = app
        .request_as_admin(
            Method::POST,
            &format!("/api/v1/stock/products/{product_id}"),
            Some(json!({ "movement_type": "in", "quantity": 15 })),
        )
        .await;
    let body = response_json(recorded).await;
    let movement_id = body["data"]["id"].as_str().expect("movement id").to_string();
    assert_eq!(body["data"]["product_quantity"], 25);

    let deleted = app
        .request_as_admin(
            Method::DELETE,
            &format!("/api/v1/stock/movements/{movement_id}"),
            None,
        )
        .await;
    assert_eq!(deleted.status(), 200);
    let body = response_json(deleted).await;
    assert_eq!(body["data"]["product_quantity"], 10);

    // The movement is gone.
    let missing = app
        .request_as_admin(
            Method::GET,
            &format!("/api/v1/stock/movements/{movement_id}"),
            None,
        )
        .await;
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn deleting_an_inbound_movement_cannot_overdraw() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "WID-006", 0).await;

    let recorded = app
        .request_as_admin(
            Method::POST,
            &format!("/api/v1/stock/products/{product_id}"),
            Some(json!({ "movement_type": "in", "quantity": 10 })),
        )
        .await;
    let body = response_json(recorded).await;
    let inbound_id = body["data"]["id"].as_str().expect("movement id").to_string();

    // Consume the stock the inbound movement brought in.
    let consumed = app
        .request_as_admin(
            Method::POST,
            &format!("/api/v1/stock/products/{product_id}"),
            Some(json!({ "movement_type": "out", "quantity": 8 })),
        )
        .await;
    assert_eq!(consumed.status(), 201);

    // Reversing the +10 would leave -8.
    let rejected = app
        .request_as_admin(
            Method::DELETE,
            &format!("/api/v1/stock/movements/{inbound_id}"),
            None,
        )
        .await;
    assert_eq!(rejected.status(), 400);
    let body = response_json(rejected).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");
}

#[tokio::test]
async fn movement_list_filters_by_product_and_type() {
    let app = TestApp::new().await;
    let first = seed_product(&app, "WID-007", 100).await;
    let second = seed_product(&app, "WID-008", 100).await;

    for (product, movement_type, quantity) in [
        (&first, "in", 5),
        (&first, "out", 3),
        (&second, "out", 7),
    ] {
        let response = app
            .request_as_admin(
                Method::POST,
                &format!("/api/v1/stock/products/{product}"),
                Some(json!({ "movement_type": movement_type, "quantity": quantity })),
            )
            .await;
        assert_eq!(response.status(), 201);
    }

    let listed = app
        .request_as_admin(
            Method::GET,
            &format!("/api/v1/stock/movements?product_id={first}&movement_type=out"),
            None,
        )
        .await;
    assert_eq!(listed.status(), 200);
    let body = response_json(listed).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["quantity"], 3);
    assert_eq!(body["data"]["items"][0]["movement_type"], "out");
}

#[tokio::test]
async fn zero_quantity_movement_is_rejected() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app, "WID-009", 10).await;

    let response = app
        .request_as_admin(
            Method::POST,
            &format!("/api/v1/stock/products/{product_id}"),
            Some(json!({ "movement_type": "in", "quantity": 0 })),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
