use anyhow::{Context, Result};
use clap::Parser;
use reel::media::MediaTools;
use reel::types::SessionConfig;
use reel::{telemetry, web};
use reelconf::ReelConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long shutdown waits for open connections to clean up their sessions.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Stream video to CC:Tweaked computers over WebSocket
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file, loaded in place of ./reel.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log filter, e.g. "debug" or "info,reel=trace". RUST_LOG wins if set.
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = ReelConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.infra.server.host = host;
    }
    if let Some(port) = cli.port {
        config.infra.server.port = port;
    }
    if let Some(level) = cli.log_level {
        config.infra.telemetry.log_level = level;
    }
    config.validate().context("Invalid configuration")?;

    if cli.print_config {
        print!("{}", config.to_toml().context("Failed to render configuration")?);
        return Ok(());
    }

    let telemetry = telemetry::init(&config.infra.telemetry)
        .context("Failed to initialize telemetry")?;

    for file in &sources.files {
        tracing::info!(path = %file.display(), "Loaded config file");
    }
    for var in &sources.env_overrides {
        tracing::info!(%var, "Config overridden from environment");
    }

    let session_config = SessionConfig::from(&config);
    std::fs::create_dir_all(&session_config.workspace_root).with_context(|| {
        format!(
            "Failed to create workspace root {}",
            session_config.workspace_root.display()
        )
    })?;

    tracing::info!(
        frame_chunk_size = session_config.frame_chunk_size,
        audio_chunk_size = session_config.audio_chunk_size,
        queue_capacity = session_config.queue_capacity,
        workspace_root = %session_config.workspace_root.display(),
        "Session settings"
    );
    tracing::info!(
        yt_dlp = %config.infra.tools.yt_dlp,
        ffmpeg = %config.infra.tools.ffmpeg,
        audio_sample_rate = config.infra.tools.audio_sample_rate,
        "Media tools"
    );

    let shutdown_token = CancellationToken::new();
    let tools = MediaTools::from_config(&config.infra.tools);
    let state = web::AppState::new(session_config, tools, shutdown_token.clone());
    let app = web::router(state.clone());

    let addr = config.infra.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local_addr = listener.local_addr()?;

    tracing::info!("reel listening on ws://{}", local_addr);
    tracing::info!("   Health: GET http://{}/health", local_addr);

    let shutdown_token_srv = shutdown_token.clone();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_token_srv.cancelled().await;
        tracing::info!("Server shutdown signal received");
    });

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("Server shutdown with error: {:?}", e);
        }
    });

    // Handle both SIGINT (Ctrl+C) and SIGTERM (systemd, containers)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        result = sigterm() => {
            result?;
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
    shutdown_token.cancel();

    if let Err(e) = server_handle.await {
        tracing::error!("Server task failed: {:?}", e);
    }

    // Upgraded sockets outlive the HTTP server; give their sessions a
    // chance to delete workspaces before the runtime goes away.
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while state.active_connections() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            connections = state.active_connections(),
            "Timed out waiting for connections to close"
        );
    }

    tracing::info!("Shutdown complete");
    telemetry.shutdown();
    Ok(())
}

#[cfg(unix)]
async fn sigterm() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to set up SIGTERM handler")?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn sigterm() -> Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}
