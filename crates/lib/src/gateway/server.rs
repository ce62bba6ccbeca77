//! Gateway HTTP server.

use crate::config::{self, Config};
use crate::dispatch::Dispatcher;
use crate::event::TransportEvent;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Clone)]
struct GatewayState {
    dispatcher: Arc<Dispatcher>,
    port: u16,
}

/// Load keys, wire the dispatcher, and serve until Ctrl+C / SIGTERM.
pub async fn run_gateway(config: Config) -> Result<()> {
    let dispatcher = Arc::new(Dispatcher::from_config_env(&config)?);
    let bind = config.gateway.bind.trim();
    if !config::is_loopback_bind(bind) {
        log::warn!(
            "gateway bound to non-loopback address {}; inbound events are not authenticated",
            bind
        );
    }
    let bind_addr = format!("{}:{}", bind, config.gateway.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);
    serve(listener, dispatcher, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, dispatcher: Arc<Dispatcher>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = listener.local_addr().context("reading local address")?.port();
    axum::serve(listener, router(dispatcher, port))
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server exited")
}

pub fn router(dispatcher: Arc<Dispatcher>, port: u16) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/events", post(post_event))
        .with_state(GatewayState { dispatcher, port })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}

/// POST /events: one transport event in, one reply out.
async fn post_event(State(state): State<GatewayState>, body: Bytes) -> Response {
    let raw: TransportEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("rejecting malformed event: {}", e);
            return bad_request(e.to_string());
        }
    };
    let event = match raw.into_event() {
        Ok(e) => e,
        Err(e) => {
            log::debug!("rejecting incomplete event: {}", e);
            return bad_request(e.to_string());
        }
    };
    match state.dispatcher.route(event).await {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
