use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use rtsp_timelapse_core::testing::{FakeCapturer, FakeFinalizer};
use rtsp_timelapse_core::{Config, TimelapseService};
use rtsp_timelapse_server::{create_app, AppState};
use tower::ServiceExt;

fn test_app(tmp: &tempfile::TempDir) -> (axum::Router, Arc<AppState>, Arc<FakeFinalizer>) {
    let config = Config {
        snapshot_root: tmp.path().join("snapshots"),
        output_dir: tmp.path().join("out"),
        ..Config::default()
    };
    let finalizer = Arc::new(FakeFinalizer::ok());
    let service = TimelapseService::new(config, Arc::new(FakeCapturer::ok()), finalizer.clone());
    let state = AppState::new(service);
    (create_app(state.clone(), None), state, finalizer)
}

/// Helper to make a request to the app.
async fn request(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = if let Some(json) = body {
        builder = builder.header("content-type", "application/json");
        Body::from(serde_json::to_string(&json).unwrap())
    } else {
        Body::empty()
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test(start_paused = true)]
async fn submit_list_cancel_lifecycle() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _state, finalizer) = test_app(&tmp);

    let (status, body) = request(
        app.clone(),
        "POST",
        "/api/timelapses",
        Some(serde_json::json!({"url": "rtsp://cam/1", "interval": 60, "frames": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["timelapse"]["timelapse_id"].as_str().unwrap().to_string();
    assert_eq!(body["timelapse"]["remaining"], 3);
    assert_eq!(body["timelapse"]["rtsp_url_hash"].as_str().unwrap().len(), 64);

    let (status, body) = request(app.clone(), "GET", "/api/timelapses", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["timelapses"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["timelapse_id"], id.as_str());

    let uri = format!("/api/timelapses/{id}");
    let (status, body) = request(app.clone(), "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "success");

    let (_, body) = request(app.clone(), "GET", "/api/timelapses", None).await;
    assert_eq!(body["timelapses"][0]["remaining"], -2);

    // A repeated cancel while the job is still winding down is accepted.
    let (status, _) = request(app.clone(), "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    // Cancellation lands on the next tick; the job then leaves the registry.
    tokio::time::sleep(Duration::from_secs(61)).await;

    let (_, body) = request(app.clone(), "GET", "/api/timelapses", None).await;
    assert!(body["timelapses"].as_array().unwrap().is_empty());

    let (status, body) = request(app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Timelapse not found");

    assert!(finalizer.calls().is_empty(), "a cancelled job is never finalized");
}

#[tokio::test(start_paused = true)]
async fn completed_job_is_finalized_and_pruned() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, state, finalizer) = test_app(&tmp);

    let (status, body) = request(
        app.clone(),
        "POST",
        "/api/timelapses",
        Some(serde_json::json!({"url": "rtsp://cam/2", "interval": 1.5, "frames": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timelapse"]["interval"], 1.5);

    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(state.service.list().is_empty());
    let calls = finalizer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].0.id.to_string(),
        body["timelapse"]["timelapse_id"].as_str().unwrap()
    );
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, state, _) = test_app(&tmp);

    for payload in [
        serde_json::json!({"interval": 1, "frames": 3}),
        serde_json::json!({"url": "rtsp://cam", "frames": 3}),
        serde_json::json!({"url": "rtsp://cam", "interval": 1}),
        serde_json::json!({"url": "rtsp://cam", "interval": 0, "frames": 3}),
        serde_json::json!({"url": "rtsp://cam", "interval": 1, "frames": -1}),
    ] {
        let (status, body) = request(app.clone(), "POST", "/api/timelapses", Some(payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(body["error"].is_string());
    }

    assert!(state.service.list().is_empty());
}

#[tokio::test]
async fn malformed_id_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let (app, _, _) = test_app(&tmp);

    let (status, body) = request(app, "DELETE", "/api/timelapses/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Timelapse not found");
}
