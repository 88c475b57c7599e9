use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use voice_interview::audio::{AudioCaptureConfig, AudioCaptureFactory, AudioSource};
use voice_interview::provider::{NotesSettings, ProviderClient, ProviderSettings};
use voice_interview::script::ScriptCache;
use voice_interview::session::{ReconcilePolicy, SessionDeps};
use voice_interview::transport::RealtimeTransport;
use voice_interview::{create_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/voice-interview")?;

    info!("{} v0.1.0", cfg.service.name);

    let api_key = cfg
        .provider
        .api_key
        .clone()
        .or_else(|| std::env::var("XI_API_KEY").ok())
        .context("provider api key is not set (provider.api_key or XI_API_KEY)")?;
    let notes_api_key = cfg
        .notes
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());

    let provider = Arc::new(ProviderClient::new(
        ProviderSettings {
            base_url: cfg.provider.base_url.clone(),
            api_key,
            agent_id: cfg.provider.agent_id.clone(),
        },
        NotesSettings {
            base_url: cfg.notes.base_url.clone(),
            api_key: notes_api_key,
            model: cfg.notes.model.clone(),
        },
    ));

    let source = match &cfg.audio.source_path {
        Some(path) => AudioSource::File(path.clone()),
        None => AudioSource::Microphone,
    };
    let capture = AudioCaptureFactory::create(
        source,
        AudioCaptureConfig {
            sample_rate: cfg.audio.sample_rate,
            channels: cfg.audio.channels,
            buffer_duration_ms: cfg.audio.buffer_duration_ms,
        },
    )?;

    let deps = SessionDeps {
        capture: Arc::from(capture),
        broker: provider.clone(),
        transport: Arc::new(RealtimeTransport::new()),
        transcripts: provider.clone(),
    };

    let reconcile = ReconcilePolicy {
        poll_interval: std::time::Duration::from_millis(cfg.transcript.poll_interval_ms),
        max_attempts: cfg.transcript.max_attempts,
    };

    let script = Arc::new(ScriptCache::new(&cfg.script.path));

    let state = AppState::new(deps, reconcile, script, provider);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
