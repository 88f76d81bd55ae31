use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

#[derive(Debug, Deserialize)]
pub struct ModelsConfig {
    pub dir: String,
    pub whisper: String,
    pub generator: String,
}

#[derive(Debug, Deserialize)]
pub struct InferenceConfig {
    /// Maximum number of inference calls running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Context window for the text generator, in tokens
    #[serde(default = "default_context_size")]
    pub context_size: u32,
    /// Worker threads per inference call (0 = derive from available cores)
    #[serde(default)]
    pub threads: i32,
    /// Model layers to offload to the GPU (requires an acceleration feature)
    #[serde(default)]
    pub gpu_layers: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            context_size: default_context_size(),
            threads: 0,
            gpu_layers: 0,
        }
    }
}

fn default_max_upload_mb() -> usize {
    64
}

fn default_max_concurrent() -> usize {
    2
}

fn default_context_size() -> u32 {
    4096
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl ModelsConfig {
    pub fn whisper_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.whisper)
    }

    pub fn generator_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.generator)
    }
}
