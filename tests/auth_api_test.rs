//! Authentication and authorization flows over the HTTP surface.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn register_issues_a_working_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "New User",
                "email": "new@example.com",
                "password": "a-long-password",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["role"], "user");
    assert_eq!(body["data"]["token_type"], "Bearer");
    let token = body["data"]["access_token"].as_str().expect("token");

    let me = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(token))
        .await;
    assert_eq!(me.status(), 200);
    let body = response_json(me).await;
    assert_eq!(body["data"]["email"], "new@example.com");
}

#[tokio::test]
async fn register_never_leaks_the_password_hash() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "name": "New User",
                "email": "hash@example.com",
                "password": "a-long-password",
            })),
            None,
        )
        .await;
    let body = response_json(response).await;
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_registration_conflicts() {
    let app = TestApp::new().await;

    let payload = json!({
        "name": "New User",
        "email": "dup@example.com",
        "password": "a-long-password",
    });
    let first = app
        .request(Method::POST, "/api/v1/auth/register", Some(payload.clone()), None)
        .await;
    assert_eq!(first.status(), 201);

    let second = app
        .request(Method::POST, "/api/v1/auth/register", Some(payload), None)
        .await;
    assert_eq!(second.status(), 409);
    let body = response_json(second).await;
    assert_eq!(body["error"]["code"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "admin@example.com",
                "password": "not-the-password",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn login_as_deactivated_user_is_unauthorized() {
    let app = TestApp::new().await;
    let (user, _) = app.seed_user("inactive@example.com").await;

    let deleted = app
        .request_as_admin(Method::DELETE, &format!("/api/v1/users/{}", user.id), None)
        .await;
    assert_eq!(deleted.status(), 200);

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "inactive@example.com",
                "password": "user-password-1",
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 401);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn protected_route_requires_a_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(response.status(), 401);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/products", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn admin_routes_are_forbidden_for_regular_users() {
    let app = TestApp::new().await;
    let (_, token) = app.seed_user("plain@example.com").await;

    let response = app
        .request(Method::GET, "/api/v1/users", None, Some(&token))
        .await;
    assert_eq!(response.status(), 403);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn users_may_only_read_their_own_account() {
    let app = TestApp::new().await;
    let (first, token) = app.seed_user("first@example.com").await;
    let (second, _) = app.seed_user("second@example.com").await;

    let own = app
        .request(
            Method::GET,
            &format!("/api/v1/users/{}", first.id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(own.status(), 200);

    let other = app
        .request(
            Method::GET,
            &format!("/api/v1/users/{}", second.id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(other.status(), 403);
}

#[tokio::test]
async fn change_password_requires_the_current_one() {
    let app = TestApp::new().await;
    let (user, token) = app.seed_user("pw@example.com").await;

    let wrong = app
        .request(
            Method::POST,
            &format!("/api/v1/users/{}/change-password", user.id),
            Some(json!({
                "current_password": "wrong",
                "new_password": "brand-new-password",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(wrong.status(), 401);

    let right = app
        .request(
            Method::POST,
            &format!("/api/v1/users/{}/change-password", user.id),
            Some(json!({
                "current_password": "user-password-1",
                "new_password": "brand-new-password",
            })),
            Some(&token),
        )
        .await;
    assert_eq!(right.status(), 200);

    let login = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "pw@example.com",
                "password": "brand-new-password",
            })),
            None,
        )
        .await;
    assert_eq!(login.status(), 200);
}
