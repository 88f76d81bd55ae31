use super::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    /// Text to summarize; an absent key behaves like an empty string
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateNotesRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateNotesResponse {
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
/// Liveness probe
pub async fn service_status() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: "Running".to_string(),
        }),
    )
}

/// POST /transcribe/
/// Accept a multipart audio upload and return detected language plus text
pub async fn transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    // Pull the uploaded bytes out of the "file" field
    let mut upload: Option<axum::body::Bytes> = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("Invalid multipart payload: {}", e),
                    }),
                )
                    .into_response();
            }
        };

        if field.name() == Some("file") {
            match field.bytes().await {
                Ok(bytes) => {
                    upload = Some(bytes);
                    break;
                }
                Err(e) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorResponse {
                            error: format!("Failed to read upload: {}", e),
                        }),
                    )
                        .into_response();
                }
            }
        }
    }

    let Some(upload) = upload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No audio file provided".to_string(),
            }),
        )
            .into_response();
    };

    info!("Transcription request: {} byte upload", upload.len());

    // Scoped temp file, deleted on drop whichever way the handler exits
    let temp = match tempfile::Builder::new().suffix(".mp3").tempfile() {
        Ok(temp) => temp,
        Err(e) => {
            error!("Failed to create temp file: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to persist upload: {}", e),
                }),
            )
                .into_response();
        }
    };
    if let Err(e) = tokio::fs::write(temp.path(), &upload).await {
        error!("Failed to write temp file: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to persist upload: {}", e),
            }),
        )
            .into_response();
    }

    let _permit = state.acquire_permit().await;
    match state.speech_to_text.transcribe(temp.path()).await {
        Ok(transcript) => (
            StatusCode::OK,
            Json(TranscribeResponse {
                language: transcript.language.clone(),
                text: transcript.joined_text(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Transcription failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Transcription failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /summarize/
/// Summarize the supplied text
pub async fn summarize(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> impl IntoResponse {
    if req.text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No text provided".to_string(),
            }),
        )
            .into_response();
    }

    info!("Summarization request: {} chars", req.text.len());

    let _permit = state.acquire_permit().await;
    match state.summarizer.summarize(&req.text).await {
        Ok(summary) => (StatusCode::OK, Json(SummarizeResponse { summary })).into_response(),
        Err(e) => {
            error!("Summarization failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Summarization failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /generate_notes/
/// Generate study notes from the supplied text and store them process-wide
pub async fn generate_notes(
    State(state): State<AppState>,
    Json(req): Json<GenerateNotesRequest>,
) -> impl IntoResponse {
    if req.text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No text provided".to_string(),
            }),
        )
            .into_response();
    }

    info!("Note generation request: {} chars", req.text.len());

    let _permit = state.acquire_permit().await;
    let notes = match state.note_generator.generate_notes(&req.text).await {
        Ok(notes) => notes,
        Err(e) => {
            error!("Note generation failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Note generation failed: {}", e),
                }),
            )
                .into_response();
        }
    };

    // Every successful call overwrites the previous notes
    *state.notes_store.write().await = notes.clone();

    (StatusCode::OK, Json(GenerateNotesResponse { notes })).into_response()
}

/// POST /ask/
/// Answer a question against the caller-supplied notes
pub async fn ask(State(state): State<AppState>, Json(req): Json<AskRequest>) -> impl IntoResponse {
    // Notes are validated before the question
    if req.notes.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No notes available. Generate notes first.".to_string(),
            }),
        )
            .into_response();
    }
    if req.question.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No question provided.".to_string(),
            }),
        )
            .into_response();
    }

    info!(
        "Question request: {} chars of notes, question '{}'",
        req.notes.len(),
        req.question
    );

    let _permit = state.acquire_permit().await;
    match state.answerer.answer(&req.question, &req.notes).await {
        Ok(answer) => (
            StatusCode::OK,
            Json(AskResponse {
                question: req.question,
                answer,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Answering failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Answering failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}
