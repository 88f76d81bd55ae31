//! Inference pipeline seams.
//!
//! The HTTP layer depends on these traits instead of concrete engines, which
//! keeps request handling decoupled from inference code.

use anyhow::Result;
use std::path::Path;

pub mod extract;
pub mod llama;
pub mod tasks;
pub mod whisper;

pub use llama::{DecodeParams, GeneratorConfig, TextGenerator};
pub use tasks::{LlamaAnswerer, LlamaNoteGenerator, LlamaSummarizer};
pub use whisper::WhisperTranscriber;

/// Time-bounded span of recognized speech
#[derive(Debug, Clone)]
pub struct TranscriptSegment {
    /// Segment start time in seconds
    pub start_secs: f64,
    /// Segment end time in seconds
    pub end_secs: f64,
    /// Text content for this segment
    pub text: String,
}

/// Full speech-to-text result
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Detected language code such as `"en"`
    pub language: String,
    /// Recognized segments in emission order
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Segment texts joined with single spaces, in emission order
    pub fn joined_text(&self) -> String {
        let mut text = String::new();
        for segment in &self.segments {
            let trimmed = segment.text.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
        text
    }
}

/// Speech-to-text over an audio file on disk
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;
}

/// Abstractive summarization with fixed length bounds
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Study-note generation from transcript text
#[async_trait::async_trait]
pub trait NoteGenerator: Send + Sync {
    async fn generate_notes(&self, text: &str) -> Result<String>;
}

/// Extractive question answering: the answer is a verbatim span of `context`
#[async_trait::async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<String>;
}
