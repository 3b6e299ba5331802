//! HTTP front-end.
//!
//! ```text
//! client ──POST / {"id","commands"}──> post_commands ──> Dispatcher::dispatch
//! client ──GET /─────────────────────> list_devices  ──> {"id": [keys]}
//! ```
//!
//! Every request runs in its own task, and every batch in a task of its own
//! that outlives the request. The router holds no lock of its own:
//! requests for different devices proceed in parallel and requests for the
//! same device queue on that device's lock inside the dispatcher.

use crate::error::RequestError;
use crate::request::parse_request;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use pinbridge_hardware::Dispatcher;
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Build the front-end router.
pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/", get(list_devices).post(post_commands))
        .with_state(dispatcher)
}

async fn post_commands(
    State(dispatcher): State<Dispatcher>,
    body: Bytes,
) -> Result<impl IntoResponse, RequestError> {
    let request = parse_request(&body)?;
    debug!(key = %request.id, commands = request.commands.len(), "Command request");

    // Detached from the connection: a client that goes away does not cut the
    // batch short.
    tokio::spawn(async move { dispatcher.dispatch(&request).await }).await??;
    Ok(Json(json!({ "status": "ok" })))
}

async fn list_devices(State(dispatcher): State<Dispatcher>) -> impl IntoResponse {
    Json(json!({ "id": dispatcher.keys() }))
}

/// Bind the front-end on all interfaces.
///
/// # Errors
///
/// Returns an error if the port cannot be bound.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await
}

/// Serve requests until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Dispatcher,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
