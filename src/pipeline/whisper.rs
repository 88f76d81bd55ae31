use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{SpeechToText, Transcript, TranscriptSegment};
use crate::audio::AudioClip;

/// Fallback when whisper cannot name the detected language
const DEFAULT_LANGUAGE: &str = "en";

/// Speech-to-text over a GGML whisper.cpp model.
///
/// The context is loaded once and shared; every transcription creates its own
/// decode state, so concurrent calls against the same weights are safe.
pub struct WhisperTranscriber {
    ctx: Arc<WhisperContext>,
}

impl WhisperTranscriber {
    pub fn load(model_path: &Path) -> Result<Self> {
        let use_gpu = cfg!(any(feature = "metal", feature = "cuda", feature = "vulkan"));
        info!(
            "Loading whisper model: {} (gpu: {})",
            model_path.display(),
            use_gpu
        );

        let context_params = WhisperContextParameters {
            use_gpu,
            gpu_device: 0,
            ..Default::default()
        };
        let ctx = WhisperContext::new_with_params(&model_path.to_string_lossy(), context_params)
            .map_err(|e| {
                anyhow!(
                    "Failed to load whisper model {}: {}",
                    model_path.display(),
                    e
                )
            })?;

        Ok(Self { ctx: Arc::new(ctx) })
    }
}

#[async_trait::async_trait]
impl SpeechToText for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        let ctx = Arc::clone(&self.ctx);
        let path = audio.to_path_buf();

        tokio::task::spawn_blocking(move || transcribe_blocking(&ctx, &path))
            .await
            .context("Transcription task panicked")?
    }
}

fn transcribe_blocking(ctx: &WhisperContext, path: &Path) -> Result<Transcript> {
    let clip = AudioClip::open(path)?;
    let audio = clip.to_mono_16k();

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(None); // auto-detect
    params.set_translate(false);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_suppress_blank(true);

    let mut state = ctx
        .create_state()
        .context("Failed to create whisper state")?;
    state.full(params, &audio).context("Whisper inference failed")?;

    let language = state
        .full_lang_id_from_state()
        .ok()
        .and_then(whisper_rs::get_lang_str)
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_string();

    let num_segments = state
        .full_n_segments()
        .context("Failed to read segment count")?;
    let mut segments = Vec::with_capacity(num_segments as usize);

    for i in 0..num_segments {
        let text = match state.full_get_segment_text_lossy(i) {
            Ok(text) => text,
            Err(_) => continue,
        };
        // t0/t1 are reported in centiseconds
        let start = state.full_get_segment_t0(i).unwrap_or(0);
        let end = state.full_get_segment_t1(i).unwrap_or(0);

        segments.push(TranscriptSegment {
            start_secs: start as f64 / 100.0,
            end_secs: end as f64 / 100.0,
            text,
        });
    }

    info!(
        "Transcription complete: {:.1}s of audio, {} segments, language '{}'",
        clip.duration_seconds(),
        segments.len(),
        language
    );

    Ok(Transcript { language, segments })
}
