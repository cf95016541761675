use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use stocktrack_api::{
    app_router,
    config::AppConfig,
    db::{establish_connection_with_config, run_migrations, DbConfig},
    entities::user,
    events::{self, EventSender},
    services::users::CreateUserInput,
    AppState,
};

/// Test harness backed by an in-memory SQLite database.
///
/// The pool is pinned to a single connection so every query sees the same
/// in-memory database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    admin_token: String,
    pub admin: user::Model,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "test".to_string(),
        );

        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
        };
        let pool = establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db, cfg, event_sender);

        let admin = state
            .services
            .users
            .create(
                CreateUserInput {
                    name: "Test Admin".to_string(),
                    email: "admin@example.com".to_string(),
                    password: "admin-password-1".to_string(),
                    role: user::ROLE_ADMIN.to_string(),
                },
                None,
            )
            .await
            .expect("seed admin user");

        let admin_token = state
            .auth
            .generate_token(&admin)
            .expect("issue admin token")
            .access_token;

        let router = app_router(state.clone());

        Self {
            router,
            state,
            admin_token,
            admin,
            _event_task: event_task,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Creates a regular (non-admin) user and returns it with a token.
    pub async fn seed_user(&self, email: &str) -> (user::Model, String) {
        let created = self
            .state
            .services
            .users
            .create(
                CreateUserInput {
                    name: "Test User".to_string(),
                    email: email.to_string(),
                    password: "user-password-1".to_string(),
                    role: user::ROLE_USER.to_string(),
                },
                None,
            )
            .await
            .expect("seed user");
        let token = self
            .state
            .auth
            .generate_token(&created)
            .expect("issue user token")
            .access_token;
        (created, token)
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for admin-authenticated JSON requests.
    pub async fn request_as_admin(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.admin_token()))
            .await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
