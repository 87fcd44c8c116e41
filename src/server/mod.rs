//! HTTP control surface and the server-sent event stream.

mod routes;
mod stream;
#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::hub::EventHub;
use crate::intent::IntentClassifier;
use crate::session::SessionManager;

/// Shared handles every route needs.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionManager,
    pub hub: EventHub,
    pub classifier: IntentClassifier,
}

impl AppState {
    pub fn new(session: SessionManager, hub: EventHub, classifier: IntentClassifier) -> Self {
        Self {
            session,
            hub,
            classifier,
        }
    }
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session control
        .route("/voice/start", post(routes::start_voice))
        .route("/voice/stop", post(routes::stop_voice))
        .route("/voice/status", get(routes::voice_status))
        .route("/voice/segment", post(routes::submit_segment))
        // Model
        .route("/voice/reload-model", post(routes::reload_model))
        .route("/voice/interpret", post(routes::interpret))
        .route("/voice/samples", post(routes::add_sample))
        // Events
        .route("/voice/stream", get(stream::voice_stream))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!("voice service listening on http://{addr}");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")
}
