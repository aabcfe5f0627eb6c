use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use vodhound::archiver::Archiver;
use vodhound::intake::{self, IntakeState};
use vodhound::telemetry;
use vodhound::twitch::HelixClient;
use vodhound::writer::FsChapterWriter;

/// The vodhound archiving daemon
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a config file (replaces the local ./vodhound.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Root of the recording tree (overrides config)
    #[arg(long)]
    vods_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = houndconf::HoundConfig::load_from(cli.config.as_deref())
        .context("Failed to load config")?;
    if let Some(port) = cli.port {
        config.bind.http_port = port;
    }
    if let Some(vods_dir) = cli.vods_dir {
        config.paths.vods_dir = vods_dir;
    }

    telemetry::init(&config.telemetry.log_level).context("Failed to initialize tracing")?;

    if config.twitch.client_id.is_empty() || config.twitch.client_secret.is_empty() {
        anyhow::bail!("twitch.client_id and twitch.client_secret must be configured");
    }

    tracing::info!("Using vods directory: {}", config.paths.vods_dir.display());

    let helix = Arc::new(HelixClient::new(config.twitch.clone()));
    let archiver = Arc::new(Archiver::new(
        helix.clone(),
        helix.clone(),
        Arc::new(FsChapterWriter),
        config.paths.vods_dir.clone(),
        config.archive.max_title_length,
        config.archive.utc_offset_hours,
    ));

    let state = IntakeState {
        archiver: archiver.clone(),
        started: Instant::now(),
    };
    let app = intake::router(state);

    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", config.bind.http_port)
        .parse()
        .context("Failed to parse bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("🐕 vodhound listening on http://{}", addr);
    tracing::info!("   Live signal:      POST http://{}/live", addr);
    tracing::info!("   Offline signal:   POST http://{}/offline", addr);
    tracing::info!("   Category update:  POST http://{}/update", addr);
    tracing::info!("   Recorded signal:  POST http://{}/recorded", addr);
    tracing::info!("   Health:           GET  http://{}/health", addr);

    let shutdown_token = CancellationToken::new();
    let server_token = shutdown_token.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        server_token.cancelled().await;
        tracing::info!("Server shutdown signal received");
    });
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("Server shutdown with error: {:?}", e);
        }
    });

    // Handle both SIGINT (Ctrl+C) and SIGTERM (systemd, container runtimes)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
    shutdown_token.cancel();

    // Flush every in-flight session and delete subscriptions before exit.
    archiver.shutdown().await;
    let _ = server_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
