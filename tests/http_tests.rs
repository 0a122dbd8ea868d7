// Control-surface tests: validation, the single-session gate, stop
// signaling. The happy start path is not exercised here because it launches
// a real browser.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use meet_scribe::http::{create_router, AppState};
use meet_scribe::session::SessionHandle;
use meet_scribe::Config;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        recording_duration_secs: 60,
        upload_endpoint: "http://127.0.0.1:8000/process_audio/".to_string(),
        listen_port: 0,
        recordings_dir: std::env::temp_dir().join("meet-scribe-tests"),
        allowed_url_prefix: "https://meet.google.com/".to_string(),
        chrome_path: None,
        headless: true,
    }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

#[tokio::test]
async fn health_check_responds_ok() {
    let app = create_router(AppState::new(test_config()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn start_rejects_missing_fields() {
    let app = create_router(AppState::new(test_config()));

    let response = app
        .clone()
        .oneshot(post_json("/start-recording", "{}"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/start-recording",
            r#"{"meetLink": "https://meet.google.com/abc-defg-hij"}"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn start_rejects_foreign_urls() {
    let app = create_router(AppState::new(test_config()));

    let response = app
        .oneshot(post_json(
            "/start-recording",
            r#"{"meetLink": "https://example.com/whatever", "durationInHours": 1}"#,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("meet.google.com"));
}

#[tokio::test]
async fn start_rejects_nonpositive_duration() {
    let app = create_router(AppState::new(test_config()));

    let response = app
        .oneshot(post_json(
            "/start-recording",
            r#"{"meetLink": "https://meet.google.com/abc-defg-hij", "durationInHours": 0}"#,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_start_conflicts_while_session_active() {
    let state = AppState::new(test_config());

    // Occupy the slot the way a live session does.
    let (handle, _stop_rx) = SessionHandle::new();
    state
        .registry
        .acquire(handle)
        .await
        .expect("slot initially free");

    let app = create_router(state.clone());
    let response = app
        .oneshot(post_json(
            "/start-recording",
            r#"{"meetLink": "https://meet.google.com/abc-defg-hij", "durationInHours": 1}"#,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    // The occupying session is untouched.
    assert!(state.registry.is_active().await);
}

#[tokio::test]
async fn stop_without_active_session_is_not_found() {
    let app = create_router(AppState::new(test_config()));

    let response = app
        .oneshot(post_json("/stop-recording", ""))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stop_signals_the_active_session() {
    let state = AppState::new(test_config());
    let (handle, mut stop_rx) = SessionHandle::new();
    state.registry.acquire(handle).await.expect("slot free");

    let app = create_router(state);
    let response = app
        .oneshot(post_json("/stop-recording", ""))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    stop_rx.changed().await.expect("stop signal observed");
    assert!(*stop_rx.borrow());
}
