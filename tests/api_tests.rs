// Integration tests for the HTTP API
//
// These tests drive the full router with stub pipelines, so they verify
// routing, validation, error bodies, the notes store, and temp file handling
// without loading any model weights.

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use beleska::{
    create_router, AppState, NoteGenerator, QuestionAnswerer, SpeechToText, Summarizer,
    Transcript, TranscriptSegment,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// ============================================================================
// Stub pipelines
// ============================================================================

#[derive(Debug, Clone)]
struct RecordedUpload {
    path: PathBuf,
    existed_during_call: bool,
    bytes: Vec<u8>,
}

#[derive(Clone, Default)]
struct StubTranscriber {
    calls: Arc<Mutex<Vec<RecordedUpload>>>,
    fail: bool,
}

#[async_trait]
impl SpeechToText for StubTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        self.calls.lock().unwrap().push(RecordedUpload {
            path: audio.to_path_buf(),
            existed_during_call: audio.exists(),
            bytes: std::fs::read(audio).unwrap_or_default(),
        });

        if self.fail {
            anyhow::bail!("stub transcriber failure");
        }

        Ok(Transcript {
            language: "en".to_string(),
            segments: vec![
                TranscriptSegment {
                    start_secs: 0.0,
                    end_secs: 1.0,
                    text: " Hello".to_string(),
                },
                TranscriptSegment {
                    start_secs: 1.0,
                    end_secs: 2.0,
                    text: " world.".to_string(),
                },
            ],
        })
    }
}

#[derive(Clone, Default)]
struct StubSummarizer {
    fail: bool,
}

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        if self.fail {
            anyhow::bail!("stub summarizer failure");
        }
        Ok(format!("summary of {} chars", text.len()))
    }
}

#[derive(Clone, Default)]
struct StubNoteGenerator;

#[async_trait]
impl NoteGenerator for StubNoteGenerator {
    async fn generate_notes(&self, text: &str) -> Result<String> {
        Ok(format!("notes: {}", text))
    }
}

#[derive(Clone, Default)]
struct StubAnswerer;

#[async_trait]
impl QuestionAnswerer for StubAnswerer {
    async fn answer(&self, _question: &str, context: &str) -> Result<String> {
        Ok(context.split('.').next().unwrap_or("").trim().to_string())
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct TestApp {
    router: Router,
    state: AppState,
    transcriber: StubTranscriber,
}

fn build_app(transcriber: StubTranscriber, summarizer: StubSummarizer) -> TestApp {
    let state = AppState::new(
        Arc::new(transcriber.clone()),
        Arc::new(summarizer),
        Arc::new(StubNoteGenerator),
        Arc::new(StubAnswerer),
        2,
    );
    TestApp {
        router: create_router(state.clone(), 8),
        state,
        transcriber,
    }
}

fn default_app() -> TestApp {
    build_app(StubTranscriber::default(), StubSummarizer::default())
}

async fn get(router: Router, path: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(router: Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

const BOUNDARY: &str = "test-boundary-7f3a";

fn multipart_body(field_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"lecture.mp3\"\r\n\
             Content-Type: audio/mpeg\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_multipart(router: Router, field_name: &str, bytes: &[u8]) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/transcribe/")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(field_name, bytes)))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================================
// Liveness
// ============================================================================

#[tokio::test]
async fn test_root_reports_running() {
    let app = default_app();
    let (status, body) = get(app.router, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "Running"}));
}

// ============================================================================
// /summarize/
// ============================================================================

#[tokio::test]
async fn test_summarize_returns_summary() {
    let app = default_app();
    let (status, body) = post_json(
        app.router,
        "/summarize/",
        json!({"text": "a lecture transcript"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"summary": "summary of 20 chars"}));
}

#[tokio::test]
async fn test_summarize_empty_text_rejected() {
    let app = default_app();
    let (status, body) = post_json(app.router, "/summarize/", json!({"text": ""})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No text provided"}));
}

#[tokio::test]
async fn test_summarize_missing_text_rejected() {
    let app = default_app();
    let (status, body) = post_json(app.router, "/summarize/", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No text provided"}));
}

#[tokio::test]
async fn test_summarize_validation_precedes_inference() {
    // A failing summarizer must never be reached for an empty payload
    let app = build_app(StubTranscriber::default(), StubSummarizer { fail: true });
    let (status, body) = post_json(app.router, "/summarize/", json!({"text": ""})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No text provided"}));
}

#[tokio::test]
async fn test_summarize_failure_maps_to_500() {
    let app = build_app(StubTranscriber::default(), StubSummarizer { fail: true });
    let (status, body) = post_json(app.router, "/summarize/", json!({"text": "anything"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(
        error.contains("stub summarizer failure"),
        "Error should carry the cause, got: {error}"
    );
}

// ============================================================================
// /generate_notes/
// ============================================================================

#[tokio::test]
async fn test_generate_notes_empty_text_rejected() {
    let app = default_app();
    let (status, body) = post_json(app.router, "/generate_notes/", json!({"text": ""})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No text provided"}));
}

#[tokio::test]
async fn test_generate_notes_returns_and_stores_notes() {
    let app = default_app();

    let (status, body) = post_json(
        app.router.clone(),
        "/generate_notes/",
        json!({"text": "alpha"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"notes": "notes: alpha"}));
    assert_eq!(*app.state.notes_store.read().await, "notes: alpha");

    // A second call overwrites the store, last writer wins
    let (status, body) = post_json(
        app.router.clone(),
        "/generate_notes/",
        json!({"text": "beta"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"notes": "notes: beta"}));
    assert_eq!(*app.state.notes_store.read().await, "notes: beta");
}

#[tokio::test]
async fn test_generate_notes_is_deterministic() {
    let app = default_app();

    let (_, first) = post_json(
        app.router.clone(),
        "/generate_notes/",
        json!({"text": "same input"}),
    )
    .await;
    let (_, second) = post_json(
        app.router.clone(),
        "/generate_notes/",
        json!({"text": "same input"}),
    )
    .await;

    assert_eq!(first, second, "Identical inputs should yield identical notes");
}

// ============================================================================
// /ask/
// ============================================================================

#[tokio::test]
async fn test_ask_without_notes_rejected() {
    let app = default_app();
    let (status, body) = post_json(app.router, "/ask/", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": "No notes available. Generate notes first."})
    );
}

#[tokio::test]
async fn test_ask_notes_checked_before_question() {
    // Even with a question present, empty notes win
    let app = default_app();
    let (status, body) = post_json(
        app.router,
        "/ask/",
        json!({"question": "When is the exam?", "notes": ""}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": "No notes available. Generate notes first."})
    );
}

#[tokio::test]
async fn test_ask_without_question_rejected() {
    let app = default_app();
    let (status, body) = post_json(
        app.router,
        "/ask/",
        json!({"notes": "The exam is on Monday."}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No question provided."}));
}

#[tokio::test]
async fn test_ask_answers_from_supplied_notes() {
    let app = default_app();
    let (status, body) = post_json(
        app.router,
        "/ask/",
        json!({
            "question": "When is the exam?",
            "notes": "The exam is on Monday. Bring a pencil."
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "question": "When is the exam?",
            "answer": "The exam is on Monday"
        })
    );
}

#[tokio::test]
async fn test_ask_never_falls_back_to_stored_notes() {
    let app = default_app();

    // Populate the store first
    let (status, _) = post_json(
        app.router.clone(),
        "/generate_notes/",
        json!({"text": "stored transcript"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.state.notes_store.read().await.is_empty());

    // Asking with empty notes still fails; the store is never consulted
    let (status, body) = post_json(
        app.router.clone(),
        "/ask/",
        json!({"question": "anything?", "notes": ""}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": "No notes available. Generate notes first."})
    );
}

// ============================================================================
// /transcribe/
// ============================================================================

#[tokio::test]
async fn test_transcribe_missing_file_field_rejected() {
    let app = default_app();
    let (status, body) = post_multipart(app.router, "attachment", b"not the right field").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No audio file provided"}));
    assert!(
        app.transcriber.calls.lock().unwrap().is_empty(),
        "Transcriber should not run without an upload"
    );
}

#[tokio::test]
async fn test_transcribe_returns_language_and_joined_text() {
    let app = default_app();
    let upload = b"fake mp3 payload".to_vec();
    let (status, body) = post_multipart(app.router, "file", &upload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"language": "en", "text": "Hello world."}));

    let calls = app.transcriber.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].bytes, upload, "Upload should reach the pipeline intact");
}

#[tokio::test]
async fn test_transcribe_temp_file_scoped_to_request() {
    let app = default_app();
    let (status, _) = post_multipart(app.router, "file", b"fake mp3 payload").await;
    assert_eq!(status, StatusCode::OK);

    let calls = app.transcriber.calls.lock().unwrap();
    let upload = &calls[0];
    assert!(
        upload.existed_during_call,
        "Temp file should exist while the pipeline runs"
    );
    assert_eq!(
        upload.path.extension().and_then(|e| e.to_str()),
        Some("mp3"),
        "Temp file should carry the .mp3 suffix"
    );
    assert!(
        !upload.path.exists(),
        "Temp file should be deleted after the response"
    );
}

#[tokio::test]
async fn test_transcribe_failure_maps_to_500_and_cleans_up() {
    let app = build_app(
        StubTranscriber {
            fail: true,
            ..Default::default()
        },
        StubSummarizer::default(),
    );
    let (status, body) = post_multipart(app.router, "file", b"fake mp3 payload").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(
        error.contains("stub transcriber failure"),
        "Error should carry the cause, got: {error}"
    );

    let calls = app.transcriber.calls.lock().unwrap();
    assert!(
        !calls[0].path.exists(),
        "Temp file should be deleted on the failure path too"
    );
}
