use anyhow::{bail, Context, Result};
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use std::num::NonZeroU32;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine settings fixed at load time
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Context window in tokens
    pub context_size: u32,
    /// Worker threads per decode call (0 = derive from available cores)
    pub threads: i32,
    /// Model layers to offload to the GPU
    pub gpu_layers: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            context_size: 4096,
            threads: 0,
            gpu_layers: 0,
        }
    }
}

/// Per-call decode bounds. Decoding is always greedy, so identical prompts
/// yield identical outputs under a fixed model.
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    /// Hard stop after this many new tokens
    pub max_tokens: i32,
    /// End-of-generation is ignored until this many new tokens were produced
    pub min_tokens: i32,
}

impl DecodeParams {
    pub fn up_to(max_tokens: i32) -> Self {
        Self {
            max_tokens,
            min_tokens: 0,
        }
    }

    pub fn bounded(min_tokens: i32, max_tokens: i32) -> Self {
        Self {
            max_tokens,
            min_tokens,
        }
    }
}

struct GeneratorInner {
    backend: LlamaBackend,
    model: LlamaModel,
    config: GeneratorConfig,
}

/// Text generation over a GGUF model via llama.cpp.
///
/// The weights are loaded once and shared; every call to [`complete`] builds
/// its own context, so concurrent calls are safe. Cloning is cheap and all
/// clones use the same loaded model.
///
/// [`complete`]: TextGenerator::complete
#[derive(Clone)]
pub struct TextGenerator {
    inner: Arc<GeneratorInner>,
}

impl TextGenerator {
    pub fn load(model_path: &Path, config: GeneratorConfig) -> Result<Self> {
        let backend = LlamaBackend::init().context("Failed to init llama backend")?;

        info!(
            "Loading generator model: {} (ctx: {}, gpu layers: {})",
            model_path.display(),
            config.context_size,
            config.gpu_layers
        );

        let model_params = LlamaModelParams::default().with_n_gpu_layers(config.gpu_layers);
        let model_params = pin!(model_params);
        let model = LlamaModel::load_from_file(&backend, model_path, &model_params)
            .with_context(|| format!("Failed to load generator model {}", model_path.display()))?;

        Ok(Self {
            inner: Arc::new(GeneratorInner {
                backend,
                model,
                config,
            }),
        })
    }

    /// Run one greedy completion. Blocking; callers dispatch through
    /// `spawn_blocking`.
    pub fn complete(&self, prompt: &str, params: DecodeParams) -> Result<String> {
        let model = &self.inner.model;
        let config = &self.inner.config;
        let threads = resolve_threads(config.threads);

        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(Some(
                NonZeroU32::new(config.context_size).context("Invalid context size")?,
            ))
            .with_n_batch(config.context_size)
            .with_n_threads(threads)
            .with_n_threads_batch(threads);

        let mut ctx = model
            .new_context(&self.inner.backend, ctx_params)
            .context("Failed to create llama context")?;

        let mut tokens_list = model
            .str_to_token(prompt, AddBos::Always)
            .context("Failed to tokenize prompt")?;

        // Leave room in the context window for the requested new tokens
        let budget = (config.context_size as usize).saturating_sub(params.max_tokens as usize + 4);
        if tokens_list.len() > budget {
            warn!(
                "Prompt of {} tokens exceeds context budget of {}, truncating",
                tokens_list.len(),
                budget
            );
            tokens_list.truncate(budget);
        }
        if tokens_list.is_empty() {
            bail!(
                "Context window of {} tokens leaves no room for the prompt",
                config.context_size
            );
        }

        debug!("Tokenized prompt: {} tokens", tokens_list.len());

        let mut batch = LlamaBatch::new(config.context_size as usize, 1);
        let last_index = (tokens_list.len() - 1) as i32;
        for (i, token) in (0_i32..).zip(tokens_list.into_iter()) {
            let is_last = i == last_index;
            batch
                .add(token, i, &[0], is_last)
                .context("Failed to add prompt token to batch")?;
        }

        ctx.decode(&mut batch).context("Prompt decode failed")?;

        let n_prompt_tokens = batch.n_tokens();
        let mut n_cur = n_prompt_tokens;
        let mut n_generated = 0i32;
        let mut decoder = encoding_rs::UTF_8.new_decoder();
        let mut output = String::new();

        let mut sampler = pin!(LlamaSampler::chain_simple([LlamaSampler::greedy()]));

        loop {
            if n_generated >= params.max_tokens {
                debug!("Reached max_tokens limit of {}", params.max_tokens);
                break;
            }

            let token = sampler.as_mut().sample(&ctx, batch.n_tokens() - 1);
            sampler.as_mut().accept(token);

            let is_eog = model.is_eog_token(token);
            if is_eog && n_generated >= params.min_tokens {
                break;
            }

            // Below min_tokens an end-of-generation token is fed back like any
            // other token, but contributes no text
            if !is_eog {
                let token_bytes = model
                    .token_to_bytes(token, Special::Tokenize)
                    .context("Failed to convert token to bytes")?;
                append_token_text(&mut decoder, &token_bytes, &mut output)?;
            }

            batch.clear();
            batch
                .add(token, n_cur, &[0], true)
                .context("Failed to add generated token to batch")?;
            n_cur += 1;
            n_generated += 1;
            ctx.decode(&mut batch).context("Token decode failed")?;
        }

        debug!(
            "Generation complete: {} prompt tokens, {} new tokens, {} chars",
            n_prompt_tokens,
            n_generated,
            output.len()
        );

        Ok(output)
    }
}

/// Append one token's bytes to `output` through the incremental UTF-8 decoder.
///
/// `decode_to_string` writes only into the destination's spare capacity and
/// never allocates, so the worst case must be reserved before each call. A
/// multibyte sequence split across tokens is carried in the decoder state and
/// completed by a later call.
fn append_token_text(
    decoder: &mut encoding_rs::Decoder,
    bytes: &[u8],
    output: &mut String,
) -> Result<()> {
    let worst_case = decoder
        .max_utf8_buffer_length(bytes.len())
        .context("Token byte length overflows the decode bound")?;
    output.reserve(worst_case);

    let (result, read, _) = decoder.decode_to_string(bytes, output, false);
    if !matches!(result, encoding_rs::CoderResult::InputEmpty) || read != bytes.len() {
        bail!("Token decode stalled at {} of {} bytes", read, bytes.len());
    }
    Ok(())
}

/// Conservative thread count that never starves the async runtime
fn resolve_threads(configured: i32) -> i32 {
    if configured > 0 {
        return configured;
    }
    std::thread::available_parallelism()
        .map(|n| {
            let cores = n.get() as i32;
            ((cores / 2) + 2).max(1)
        })
        .unwrap_or(2)
}
