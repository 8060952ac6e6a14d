use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use serial_test::serial;
use tower::ServiceExt;

mod common;

use arcane_hunt_api::models::competition::CompetitionWindow;
use common::{create_test_app, create_test_app_with_window, get};

#[tokio::test]
async fn competition_reports_phase_and_remaining() {
    let app = create_test_app().await;
    let (_, token) = app.register("clock@example.com", "watcher").await;

    let (status, body) = app.send(get("/api/v1/competition", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "active");
    assert!(body["start"].is_string());
    assert!(body["server_time"].is_string());

    let remaining = &body["remaining"];
    assert_eq!(remaining["days"], 0);
    assert!(remaining["minutes"].as_u64().unwrap() < 60);
    assert!(remaining["hours"].as_u64().unwrap() <= 1);
}

#[tokio::test]
async fn open_ended_window_has_no_remaining() {
    let app = create_test_app_with_window(Some(CompetitionWindow::new(
        Utc::now() - Duration::minutes(5),
        None,
    )))
    .await;
    let (_, token) = app.register("forever@example.com", "endless").await;

    let (_, body) = app.send(get("/api/v1/competition", Some(&token))).await;
    assert_eq!(body["phase"], "active");
    assert!(body["remaining"].is_null());
    assert!(body["end"].is_null());
}

#[tokio::test]
async fn unscheduled_competition() {
    let app = create_test_app_with_window(None).await;
    let (_, token) = app.register("unset@example.com", "waiting").await;

    let (status, body) = app.send(get("/api/v1/competition", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "not_configured");
    assert!(body["remaining"].is_null());

    let (_, body) = app.send(get("/api/v1/dashboard", Some(&token))).await;
    assert_eq!(body["can_submit"], false);
}

#[tokio::test]
async fn countdown_stream_is_event_stream() {
    let app = create_test_app().await;
    let (_, token) = app.register("stream@example.com", "listener").await;

    let response = app
        .router
        .clone()
        .oneshot(get("/api/v1/competition/stream", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let (status, _) = app
        .send(get("/api/v1/competition/stream", None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = create_test_app().await;

    let (status, body) = app.send(get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "arcane-hunt-api");
    assert_eq!(body["dependencies"]["data_store"]["status"], "healthy");
}

#[tokio::test]
#[serial]
async fn metrics_require_basic_auth() {
    std::env::set_var("METRICS_AUTH", "scraper:hunter2");
    let app = create_test_app().await;

    let (status, _) = app.send(get("/metrics", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = general_purpose::STANDARD.encode("scraper:wrong");
    let (status, _) = app
        .send(
            Request::builder()
                .uri("/metrics")
                .header(header::AUTHORIZATION, format!("Basic {}", wrong))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Generate at least one labelled sample
    app.send(get("/health", None)).await;

    let credentials = general_purpose::STANDARD.encode("scraper:hunter2");
    let (status, body) = app
        .send(
            Request::builder()
                .uri("/metrics")
                .header(header::AUTHORIZATION, format!("Basic {}", credentials))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    std::env::remove_var("METRICS_AUTH");

    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("http_requests_total"));
}

#[tokio::test]
async fn responses_carry_trace_and_csp_headers() {
    let app = create_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-trace-id", "trace-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-trace-id").unwrap(), "trace-abc-123");
    assert!(response
        .headers()
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("default-src 'self'"));
}
