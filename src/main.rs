use anyhow::Result;
use beleska::pipeline::GeneratorConfig;
use beleska::{
    create_router, AppState, Config, LlamaAnswerer, LlamaNoteGenerator, LlamaSummarizer,
    TextGenerator, WhisperTranscriber,
};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "beleska", about = "Lecture transcription and study-notes service")]
struct Cli {
    /// Config file path, without extension
    #[arg(long, default_value = "config/beleska")]
    config: String,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beleska=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    info!("Beleska v0.1.0");
    info!("Loaded config: {}", config.service.name);

    let transcriber = WhisperTranscriber::load(&config.models.whisper_path())?;
    let generator = TextGenerator::load(
        &config.models.generator_path(),
        GeneratorConfig {
            context_size: config.inference.context_size,
            threads: config.inference.threads,
            gpu_layers: config.inference.gpu_layers,
        },
    )?;

    // The three text pipelines share the one loaded model
    let state = AppState::new(
        Arc::new(transcriber),
        Arc::new(LlamaSummarizer::new(generator.clone())),
        Arc::new(LlamaNoteGenerator::new(generator.clone())),
        Arc::new(LlamaAnswerer::new(generator)),
        config.inference.max_concurrent,
    );

    let app = create_router(state, config.service.http.max_upload_mb);

    let bind = cli.bind.unwrap_or(config.service.http.bind);
    let port = cli.port.unwrap_or(config.service.http.port);
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}
