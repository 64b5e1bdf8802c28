//! RITMO recognition service - Main entry point
//!
//! Records ambient audio, identifies it against a cloud recognizer, filters
//! results through the Ecuadorian-artist allow-list, enriches recognized
//! tracks via the iTunes Search API, and exposes the whole pipeline over a
//! REST/SSE API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ritmo_common::db::{self, HistoryStore};
use ritmo_common::EventBus;
use ritmo_rec::allowlist::ArtistAllowlist;
use ritmo_rec::api;
use ritmo_rec::config;
use ritmo_rec::player::PreviewPlayer;
use ritmo_rec::recognizer::CloudRecognizer;
use ritmo_rec::services::ItunesClient;
use ritmo_rec::session::RecognitionSession;
use ritmo_rec::state::SharedState;

/// Command-line arguments for ritmo-rec
#[derive(Parser, Debug)]
#[command(name = "ritmo-rec")]
#[command(about = "Music recognition service for RITMO")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5750", env = "RITMO_PORT")]
    port: u16,

    /// Root folder for the database and service data
    #[arg(short, long, env = "RITMO_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "RITMO_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ritmo_rec=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    info!("Starting RITMO recognition service on port {}", args.port);

    let root_folder = ritmo_common::config::resolve_root_folder(
        args.root_folder.as_deref().and_then(|p| p.to_str()),
        "RITMO_ROOT_FOLDER",
    )
    .context("Failed to resolve root folder")?;
    info!("Root folder: {}", root_folder.display());

    let config = config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if config.recognizer.access_key.is_empty() {
        warn!("No recognizer access key configured; identify requests will be rejected upstream");
    }

    // Database and history store
    let db_path = root_folder.join("ritmo.db");
    let pool = db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    let history = HistoryStore::new(pool)
        .await
        .context("Failed to initialize history store")?;

    // Shared projections and event fan-out
    let state = Arc::new(SharedState::new());
    let events = EventBus::new(100);

    // Recognition pipeline
    let allowlist = match config.allowlist.artists.clone() {
        Some(artists) => {
            info!("Using configured allow-list ({} artists)", artists.len());
            ArtistAllowlist::new(artists)
        }
        None => ArtistAllowlist::builtin(),
    };

    let recognizer = Arc::new(
        CloudRecognizer::new(&config.recognizer).context("Failed to create cloud recognizer")?,
    );
    let lookup = ItunesClient::new().context("Failed to create iTunes client")?;

    let session = RecognitionSession::spawn(
        recognizer,
        lookup,
        allowlist,
        history.clone(),
        state.clone(),
        events.clone(),
    );

    // Preview playback
    let player = PreviewPlayer::spawn().context("Failed to start preview player")?;

    // Build the application router
    let app_state = api::AppState {
        session,
        state,
        history,
        player,
        events,
        port: args.port,
    };

    let app = api::create_router(app_state);

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
