#![allow(dead_code)]

use arcane_hunt_api::{
    config::Config,
    create_router,
    models::{competition::CompetitionWindow, user::UserRole},
    services::{data_store::MemoryStore, identity::MemoryIdentity, AppState},
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
}

/// Window that opened an hour ago and closes in an hour.
pub fn open_window() -> CompetitionWindow {
    let now = Utc::now();
    CompetitionWindow::new(now - Duration::hours(1), Some(now + Duration::hours(1)))
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_window(Some(open_window())).await
}

pub async fn create_test_app_with_window(window: Option<CompetitionWindow>) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemoryStore::with_demo_data());
    store.set_window(window).await;
    let identity = Arc::new(MemoryIdentity::new(JWT_SECRET));

    let state = Arc::new(AppState::with_backends(
        Config::in_memory(JWT_SECRET),
        store.clone(),
        identity,
    ));

    TestApp {
        router: create_router(state.clone()),
        store,
        state,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&body).to_string())
            })
        };
        (status, json)
    }

    /// Registers through the API and returns `(user_id, access_token)`.
    pub async fn register(&self, email: &str, username: &str) -> (String, String) {
        let (status, body) = self
            .send(post_json(
                "/api/v1/auth/register",
                None,
                json!({
                    "email": email,
                    "password": "correct-horse",
                    "username": username,
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        (
            body["user_id"].as_str().unwrap().to_string(),
            body["access_token"].as_str().unwrap().to_string(),
        )
    }

    pub async fn register_admin(&self, email: &str) -> (String, String) {
        let (user_id, token) = self.register(email, "gamemaster").await;
        self.store.set_role(&user_id, UserRole::Admin).await.unwrap();
        (user_id, token)
    }

    pub async fn submit(&self, token: &str, puzzle_id: i64, answer: &str) -> (StatusCode, Value) {
        self.send(post_json(
            &format!("/api/v1/puzzles/{}/answers", puzzle_id),
            Some(token),
            json!({ "answer": answer }),
        ))
        .await
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
