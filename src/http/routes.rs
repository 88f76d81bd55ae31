use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState, max_upload_mb: usize) -> Router {
    Router::new()
        // Liveness
        .route("/", get(handlers::service_status))
        // Inference endpoints
        .route("/transcribe/", post(handlers::transcribe))
        .route("/summarize/", post(handlers::summarize))
        .route("/generate_notes/", post(handlers::generate_notes))
        .route("/ask/", post(handlers::ask))
        // Audio uploads exceed the default body limit
        .layer(DefaultBodyLimit::max(max_upload_mb * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
