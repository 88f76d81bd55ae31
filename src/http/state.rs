use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore, SemaphorePermit};

use crate::pipeline::{NoteGenerator, QuestionAnswerer, SpeechToText, Summarizer};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub speech_to_text: Arc<dyn SpeechToText>,
    pub summarizer: Arc<dyn Summarizer>,
    pub note_generator: Arc<dyn NoteGenerator>,
    pub answerer: Arc<dyn QuestionAnswerer>,
    /// Most recently generated notes; every note-generation call overwrites it
    pub notes_store: Arc<RwLock<String>>,
    /// Bounds the number of inference calls running at once
    inference_semaphore: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        speech_to_text: Arc<dyn SpeechToText>,
        summarizer: Arc<dyn Summarizer>,
        note_generator: Arc<dyn NoteGenerator>,
        answerer: Arc<dyn QuestionAnswerer>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            speech_to_text,
            summarizer,
            note_generator,
            answerer,
            notes_store: Arc::new(RwLock::new(String::new())),
            inference_semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Acquire a permit before dispatching an inference call
    pub async fn acquire_permit(&self) -> SemaphorePermit<'_> {
        self.inference_semaphore
            .acquire()
            .await
            .expect("Semaphore is never closed")
    }
}
