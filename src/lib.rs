pub mod audio;
pub mod config;
pub mod http;
pub mod pipeline;

pub use audio::{AudioClip, TARGET_SAMPLE_RATE};
pub use config::Config;
pub use http::{create_router, AppState};
pub use pipeline::{
    GeneratorConfig, LlamaAnswerer, LlamaNoteGenerator, LlamaSummarizer, NoteGenerator,
    QuestionAnswerer, SpeechToText, Summarizer, TextGenerator, Transcript, TranscriptSegment,
    WhisperTranscriber,
};
