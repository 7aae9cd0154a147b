use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use shared::domain::Judgment;
use tokio::{net::TcpListener, sync::Mutex};

use super::*;
use crate::file_slot::{FileCandidate, FileSlot, SizePolicy};

#[derive(Debug, Clone)]
struct ReceivedPart {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
struct ReceivedRequest {
    path: &'static str,
    parts: Vec<ReceivedPart>,
}

#[derive(Clone)]
struct BackendState {
    status: StatusCode,
    body: &'static str,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

async fn record(
    state: BackendState,
    path: &'static str,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string).unwrap_or_default();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(ReceivedPart {
            field: name,
            file_name,
            content_type,
            bytes,
        });
    }
    state
        .received
        .lock()
        .await
        .push(ReceivedRequest { path, parts });
    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body,
    )
}

async fn handle_predict_single(
    State(state): State<BackendState>,
    multipart: Multipart,
) -> impl IntoResponse {
    record(state, "/api/predict-single", multipart).await
}

async fn handle_compare(
    State(state): State<BackendState>,
    multipart: Multipart,
) -> impl IntoResponse {
    record(state, "/api/compare-signatures", multipart).await
}

async fn spawn_backend(
    status: StatusCode,
    body: &'static str,
) -> anyhow::Result<(String, Arc<Mutex<Vec<ReceivedRequest>>>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = BackendState {
        status,
        body,
        received: Arc::clone(&received),
    };
    let app = Router::new()
        .route("/api/predict-single", post(handle_predict_single))
        .route("/api/compare-signatures", post(handle_compare))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), received))
}

fn image(name: &str, mime_type: &str, content: &[u8]) -> FileHandle {
    let mut slot = FileSlot::new();
    slot.select(
        FileCandidate::new(name, mime_type, content.to_vec()),
        &SizePolicy::default(),
    )
    .expect("select image")
    .clone()
}

#[tokio::test]
async fn single_submission_posts_file_field_and_normalizes() {
    let (server_url, received) = spawn_backend(
        StatusCode::OK,
        r#"{"is_forged": true, "confidence": 0.82, "model_version": "cnn"}"#,
    )
    .await
    .expect("spawn backend");
    let client = VerificationClient::new(&server_url).expect("client");

    let result = client
        .submit_single(&image("sig.png", "image/png", b"png-bytes"))
        .await
        .expect("submit");
    assert_eq!(result.judgment, Judgment::Forged);
    assert_eq!(result.score, 0.82);
    assert_eq!(result.model_version.as_deref(), Some("cnn"));

    let received = received.lock().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "/api/predict-single");
    assert_eq!(received[0].parts.len(), 1);
    let part = &received[0].parts[0];
    assert_eq!(part.field, "file");
    assert_eq!(part.file_name.as_deref(), Some("sig.png"));
    assert_eq!(part.content_type.as_deref(), Some("image/png"));
    assert_eq!(part.bytes, b"png-bytes");
}

#[tokio::test]
async fn comparison_submission_posts_two_fields() {
    let (server_url, received) = spawn_backend(
        StatusCode::OK,
        r#"{"is_match": false, "similarity_score": 0.31}"#,
    )
    .await
    .expect("spawn backend");
    let client = VerificationClient::new(&server_url).expect("client");

    let result = client
        .submit_comparison(
            &image("ref.jpg", "image/jpeg", b"first"),
            &image("probe.jpg", "image/jpeg", b"second"),
        )
        .await
        .expect("submit");
    assert_eq!(result.judgment, Judgment::NoMatch);
    assert_eq!(result.score, 0.31);

    let received = received.lock().await;
    assert_eq!(received[0].path, "/api/compare-signatures");
    let fields: Vec<_> = received[0]
        .parts
        .iter()
        .map(|part| (part.field.as_str(), part.bytes.as_slice()))
        .collect();
    assert_eq!(
        fields,
        vec![("file1", b"first".as_slice()), ("file2", b"second".as_slice())]
    );
}

#[tokio::test]
async fn non_success_status_maps_to_backend_error_with_detail() {
    let (server_url, received) = spawn_backend(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"detail": "model not loaded"}"#,
    )
    .await
    .expect("spawn backend");
    let client = VerificationClient::new(&server_url).expect("client");

    let err = client
        .submit_single(&image("sig.png", "image/png", b"x"))
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        VerificationError::Backend {
            status_code: 500,
            detail: Some("model not loaded".into()),
        }
    );
    assert_eq!(received.lock().await.len(), 1, "no retry expected");
}

#[tokio::test]
async fn unparseable_body_is_malformed() {
    let (server_url, _received) = spawn_backend(StatusCode::OK, "not json at all")
        .await
        .expect("spawn backend");
    let client = VerificationClient::new(&server_url).expect("client");

    let err = client
        .submit_single(&image("sig.png", "image/png", b"x"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, VerificationError::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn payload_without_discriminant_is_malformed() {
    let (server_url, _received) = spawn_backend(StatusCode::OK, r#"{"success": true}"#)
        .await
        .expect("spawn backend");
    let client = VerificationClient::new(&server_url).expect("client");

    let err = client
        .submit_comparison(
            &image("a.png", "image/png", b"a"),
            &image("b.png", "image/png", b"b"),
        )
        .await
        .expect_err("must fail");
    assert!(matches!(err, VerificationError::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = VerificationClient::new(&format!("http://{addr}")).expect("client");
    let err = client
        .submit_single(&image("sig.png", "image/png", b"x"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, VerificationError::Network(_)), "{err:?}");
}

#[test]
fn endpoints_keep_base_path_prefix() {
    let client = VerificationClient::new("http://verifier.local:8000/sig").expect("client");
    assert_eq!(
        client
            .endpoint(VerificationMode::SingleAnalysis)
            .expect("endpoint")
            .as_str(),
        "http://verifier.local:8000/sig/api/predict-single"
    );

    let client = VerificationClient::new("http://localhost:8000").expect("client");
    assert_eq!(
        client
            .endpoint(VerificationMode::Comparison)
            .expect("endpoint")
            .as_str(),
        "http://localhost:8000/api/compare-signatures"
    );
}

#[test]
fn rejects_invalid_server_url() {
    assert!(VerificationClient::new("not a url").is_err());
}
