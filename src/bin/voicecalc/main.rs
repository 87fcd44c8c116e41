//! Voice calculator service entrypoint.
//!
//! Loads (or trains) the intent model, wires the session, hub, and HTTP
//! surface together, then serves until Ctrl+C or SIGTERM.
//!
//! # Architecture
//!
//! - Ingestion worker: std thread owning the trigger engine
//! - HTTP server: control routes and the SSE event stream on tokio
//! - Stdin feed (optional): forwards typed lines as transcript segments

mod cli_utils;
mod feed;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use voicecalc::config::AppConfig;
use voicecalc::hub::EventHub;
use voicecalc::intent::{IntentClassifier, ModelStore};
use voicecalc::server::{self, AppState};
use voicecalc::session::SessionManager;
use voicecalc::telemetry::init_tracing;

use crate::cli_utils::{list_input_devices, select_source, shutdown_signal};
use crate::feed::spawn_stdin_feed;

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = AppConfig::parse();
    if config.list_input_devices {
        list_input_devices()?;
        return Ok(());
    }
    config.validate()?;
    if let Some(path) = init_tracing(&config) {
        eprintln!("voicecalc trace log: {}", path.display());
    }

    let dataset_path = config.dataset_path();
    let model_path = config.model_path();
    tracing::info!(
        dataset = %dataset_path.display(),
        model = %model_path.display(),
        "loading intent model"
    );
    let store = tokio::task::spawn_blocking(move || ModelStore::open(&dataset_path, &model_path))
        .await
        .context("model loader task failed")?
        .context("failed to load intent model")?;
    tracing::info!(version = store.version(), "intent model ready");

    let classifier = IntentClassifier::new(Arc::new(store));
    let hub = EventHub::new(config.subscriber_capacity, config.heartbeat_interval());
    let session = SessionManager::new(
        select_source(&config),
        classifier.clone(),
        hub.clone(),
        config.session_settings(),
    );

    if config.auto_start {
        if let Err(err) = session.start() {
            tracing::warn!("auto-start failed: {err}");
        }
    }
    if config.stdin_feed {
        // Detached: blocks on stdin until EOF or process exit.
        let _ = spawn_stdin_feed(session.clone());
    }

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let state = AppState::new(session.clone(), hub, classifier);
    server::serve(listener, state, shutdown_signal()).await?;

    tokio::task::spawn_blocking(move || session.stop())
        .await
        .context("session shutdown task failed")?;
    tracing::info!("voicecalc stopped");
    Ok(())
}
