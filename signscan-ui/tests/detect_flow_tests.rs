//! End-to-end submission flow tests against a mock detection server
//!
//! The mock server counts every request it receives so the tests can
//! assert that validation failures never reach the network.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use signscan_common::config::ClientConfig;
use signscan_common::events::EventBus;
use signscan_common::types::DetectionResult;
use signscan_common::{ErrorCategory, MediaKind};
use signscan_ui::client::{DetectClient, DetectOptions};
use signscan_ui::controller::{ResultUpdate, SubmissionController, SubmissionOutcome, SubmissionState};
use signscan_ui::present::{present, RenderState};

#[derive(Clone)]
struct MockState {
    hits: Arc<AtomicUsize>,
}

/// Bind the mock router on an ephemeral port and return its base URL
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(base_url: &str) -> DetectClient {
    let config = ClientConfig {
        server_url: base_url.to_string(),
        request_timeout: Duration::from_secs(5),
    };
    DetectClient::new(&config).unwrap()
}

fn write_file(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"media payload").unwrap();
    path
}

fn controller_for(
    flow: MediaKind,
) -> (
    SubmissionController,
    tokio::sync::mpsc::UnboundedReceiver<ResultUpdate>,
) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (SubmissionController::new(flow, EventBus::new(64), tx), rx)
}

async fn image_ok(State(state): State<MockState>) -> Json<serde_json::Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "total": 1,
        "image_width": 640,
        "image_height": 480,
        "objects_simple": [
            {"label": "stop sign", "confidence": 0.92, "bbox": [10.0, 20.0, 40.0, 60.0]}
        ],
        "detections": [
            {"cls_name": "legacy stop", "conf": 0.5, "bbox": [0.0, 0.0, 1.0, 1.0]}
        ],
        "annotated_image": "YW5ub3RhdGVk"
    }))
}

async fn video_ok(State(state): State<MockState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        [(header::CONTENT_TYPE, "video/mp4")],
        b"processed video bytes".to_vec(),
    )
}

async fn reject_too_large(State(state): State<MockState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({"detail": "file too large"})),
    )
}

async fn plain_failure(State(state): State<MockState>) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::INTERNAL_SERVER_ERROR, "model crashed")
}

fn mock_router(state: MockState) -> Router {
    Router::new()
        .route("/api/detect/image", post(image_ok))
        .route("/api/detect/video", post(video_ok))
        .route(
            "/api/health",
            get(|| async { Json(json!({"status": "ok", "model": "best.pt"})) }),
        )
        .with_state(state)
}

#[tokio::test]
async fn image_flow_end_to_end_prefers_objects_simple() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_server(mock_router(MockState { hits: hits.clone() })).await;
    let client = client_for(&base);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "sign.jpg");
    let (mut controller, mut rx) = controller_for(MediaKind::Image);

    controller.select(&path).await.unwrap();
    controller.load_preview().await.unwrap();
    controller.submit(&client, &DetectOptions::default()).await.unwrap();

    assert!(matches!(controller.state(), SubmissionState::Succeeded(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let update = rx.try_recv().unwrap();
    let Some(DetectionResult::Image { detections, annotated_image, image_width, .. }) =
        update.result
    else {
        panic!("expected a published image result");
    };

    // objects_simple wins over the legacy detections list
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "stop sign");
    assert_eq!(detections[0].bbox.width, 30.0);
    assert_eq!(detections[0].bbox.height, 40.0);
    assert_eq!(annotated_image.as_deref(), Some("YW5ub3RhdGVk"));
    assert_eq!(image_width, Some(640));
}

#[tokio::test]
async fn image_result_presents_statistics() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_server(mock_router(MockState { hits })).await;
    let client = client_for(&base);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "sign.png");
    let (mut controller, mut rx) = controller_for(MediaKind::Image);

    controller.select(&path).await.unwrap();
    controller.submit(&client, &DetectOptions::default()).await.unwrap();

    let result = rx.try_recv().unwrap().result;
    let RenderState::Image(report) = present(result.as_ref()) else {
        panic!("expected image render state");
    };
    assert_eq!(report.total, 1);
    assert_eq!(report.mean_confidence_percent(), "92.0");
}

#[tokio::test]
async fn video_flow_end_to_end_materializes_the_payload() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_server(mock_router(MockState { hits })).await;
    let client = client_for(&base);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "dashcam.mp4");
    let (mut controller, mut rx) = controller_for(MediaKind::Video);

    controller.select(&path).await.unwrap();
    controller.submit(&client, &DetectOptions::default()).await.unwrap();

    let result = rx.try_recv().unwrap().result;
    let RenderState::Video(report) = present(result.as_ref()) else {
        panic!("expected video render state");
    };
    assert_eq!(report.download_name, "detected_video.mp4");
    assert_eq!(report.source_file_name, "dashcam.mp4");
    assert_eq!(
        std::fs::read(report.processed.path()).unwrap(),
        b"processed video bytes"
    );
}

#[tokio::test]
async fn server_detail_is_surfaced_exactly() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/detect/video", post(reject_too_large))
        .with_state(MockState { hits });
    let base = spawn_server(app).await;
    let client = client_for(&base);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "huge.mp4");
    let (mut controller, mut rx) = controller_for(MediaKind::Video);

    controller.select(&path).await.unwrap();
    let err = controller
        .submit(&client, &DetectOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "file too large");
    assert_eq!(err.category(), ErrorCategory::Service);
    assert!(matches!(controller.state(), SubmissionState::Failed(_)));
    // Failures publish nothing to the parent
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn failure_without_detail_gets_the_connectivity_message() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/detect/image", post(plain_failure))
        .with_state(MockState { hits });
    let base = spawn_server(app).await;
    let client = client_for(&base);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "sign.jpg");
    let (mut controller, _rx) = controller_for(MediaKind::Image);

    controller.select(&path).await.unwrap();
    let err = controller
        .submit(&client, &DetectOptions::default())
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("Cannot reach the detection server"));
    assert!(message.contains("HTTP 500"));
    assert!(message.contains("model crashed"));
}

#[tokio::test]
async fn wrong_kind_selection_triggers_zero_network_calls() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_server(mock_router(MockState { hits: hits.clone() })).await;
    let client = client_for(&base);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "dashcam.mp4");
    let (mut controller, _rx) = controller_for(MediaKind::Image);

    let err = controller.select(&path).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);

    // With no valid selection the submit is rejected locally as well
    let err = controller
        .submit(&client, &DetectOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reset_between_begin_and_apply_discards_the_network_response() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_server(mock_router(MockState { hits: hits.clone() })).await;
    let client = client_for(&base);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "sign.jpg");
    let (mut controller, mut rx) = controller_for(MediaKind::Image);

    controller.select(&path).await.unwrap();
    let ticket = controller.begin_submit().unwrap();

    // The request completes, but the user resets before it is applied
    let outcome = client
        .detect_image(ticket.media(), &DetectOptions::default())
        .await
        .map(SubmissionOutcome::Image);
    controller.reset();
    controller.apply_outcome(ticket, outcome).await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(matches!(controller.state(), SubmissionState::Idle));

    // Only the reset's None reached the parent
    assert!(rx.try_recv().unwrap().result.is_none());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn reset_after_success_returns_to_the_idle_placeholder() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_server(mock_router(MockState { hits })).await;
    let client = client_for(&base);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "sign.jpg");
    let (mut controller, mut rx) = controller_for(MediaKind::Image);

    controller.select(&path).await.unwrap();
    controller.submit(&client, &DetectOptions::default()).await.unwrap();
    assert!(rx.try_recv().unwrap().result.is_some());

    controller.reset();

    assert!(controller.selection().is_none());
    let latest = rx.try_recv().unwrap().result;
    assert!(latest.is_none());
    assert!(matches!(present(latest.as_ref()), RenderState::Empty));
}

#[tokio::test]
async fn health_reports_status_and_model() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = spawn_server(mock_router(MockState { hits })).await;
    let client = client_for(&base);

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.model.as_deref(), Some("best.pt"));
}
