use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::extract;
use super::llama::{DecodeParams, TextGenerator};
use super::{NoteGenerator, QuestionAnswerer, Summarizer};

/// Summaries are never shorter than this many new tokens
pub const SUMMARY_MIN_NEW_TOKENS: i32 = 50;
/// Hard cap on summary length, in new tokens
pub const SUMMARY_MAX_NEW_TOKENS: i32 = 200;
pub const NOTES_MAX_NEW_TOKENS: i32 = 256;
pub const ANSWER_MAX_NEW_TOKENS: i32 = 64;

fn summarize_prompt(text: &str) -> String {
    format!("Summarize the following text in a short paragraph.\n\nText:\n{text}\n\nSummary:")
}

fn notes_prompt(text: &str) -> String {
    format!("Summarize the following lecture transcript into concise, bullet-style study notes: {text}")
}

fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question using only an exact quote from the context.\n\n\
         Context:\n{context}\n\nQuestion: {question}\n\nQuote:"
    )
}

/// Abstractive summarization with fixed 50..200 new-token bounds
pub struct LlamaSummarizer {
    generator: TextGenerator,
}

impl LlamaSummarizer {
    pub fn new(generator: TextGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait::async_trait]
impl Summarizer for LlamaSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let generator = self.generator.clone();
        let prompt = summarize_prompt(text);

        let summary = tokio::task::spawn_blocking(move || {
            generator.complete(
                &prompt,
                DecodeParams::bounded(SUMMARY_MIN_NEW_TOKENS, SUMMARY_MAX_NEW_TOKENS),
            )
        })
        .await
        .context("Summarization task panicked")??;

        Ok(summary.trim().to_string())
    }
}

pub struct LlamaNoteGenerator {
    generator: TextGenerator,
}

impl LlamaNoteGenerator {
    pub fn new(generator: TextGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait::async_trait]
impl NoteGenerator for LlamaNoteGenerator {
    async fn generate_notes(&self, text: &str) -> Result<String> {
        // The instruction prompt is logged only; the model receives the raw
        // transcript text
        let prompt = notes_prompt(text);
        debug!("Built notes prompt ({} chars)", prompt.len());

        let generator = self.generator.clone();
        let input = text.to_string();

        let notes = tokio::task::spawn_blocking(move || {
            generator.complete(&input, DecodeParams::up_to(NOTES_MAX_NEW_TOKENS))
        })
        .await
        .context("Note generation task panicked")??;

        Ok(notes.trim().to_string())
    }
}

/// Extractive question answering: generate a candidate, then align it onto
/// the supplied context so the returned answer is a verbatim span of it
pub struct LlamaAnswerer {
    generator: TextGenerator,
}

impl LlamaAnswerer {
    pub fn new(generator: TextGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait::async_trait]
impl QuestionAnswerer for LlamaAnswerer {
    async fn answer(&self, question: &str, context: &str) -> Result<String> {
        let generator = self.generator.clone();
        let prompt = answer_prompt(question, context);

        let generated = tokio::task::spawn_blocking(move || {
            generator.complete(&prompt, DecodeParams::up_to(ANSWER_MAX_NEW_TOKENS))
        })
        .await
        .context("Answering task panicked")??;

        match extract::align_to_context(context, &generated) {
            Some(span) => Ok(span.trim().to_string()),
            None => {
                warn!("Generated answer shares nothing with the context, returning it as-is");
                Ok(generated.trim().to_string())
            }
        }
    }
}
