#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use whose_song_back::{
    config::AppConfig,
    routes,
    state::{AppState, ManualClock, SharedState},
};

pub const ADMIN_CODE: &str = "let-me-in";
pub const START_MS: i64 = 1_700_000_000_000;

/// Test config: known admin code, default 20 s rounds, no static files on disk.
pub fn test_config() -> AppConfig {
    AppConfig {
        admin_code: ADMIN_CODE.to_owned(),
        static_dir: "target/no-static-files".into(),
        ..AppConfig::default()
    }
}

/// Router over a fresh memory store, plus the clock driving round expiry.
pub fn build_test_app() -> (Router, Arc<ManualClock>) {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: AppConfig) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MS));
    let state: SharedState = AppState::in_memory(config, clock.clone());
    (routes::router(state), clock)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register `name` and return the new user id.
pub async fn register(app: &Router, name: &str) -> String {
    let response = post_json(app, "/api/register", serde_json::json!({ "firstName": name })).await;
    assert_eq!(response.status(), 200, "registering {name}");
    body_json(response).await["user"]["id"]
        .as_str()
        .unwrap()
        .to_owned()
}

/// Submit a song for `user_id` and return the new song id.
pub async fn submit_song(app: &Router, user_id: &str, title: &str) -> String {
    let response = post_json(
        app,
        "/api/submit-song",
        serde_json::json!({ "userId": user_id, "title": title, "artist": "Various" }),
    )
    .await;
    assert_eq!(response.status(), 200, "submitting {title}");
    body_json(response).await["song"]["id"]
        .as_str()
        .unwrap()
        .to_owned()
}
