//! HTTP API over the inference pipelines
//!
//! - GET / - Liveness probe
//! - POST /transcribe/ - Multipart audio upload, returns language + text
//! - POST /summarize/ - Bounded-length summary of the supplied text
//! - POST /generate_notes/ - Study notes, also stored process-wide
//! - POST /ask/ - Extractive answer against caller-supplied notes

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
