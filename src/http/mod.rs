//! HTTP control surface (server variant)
//!
//! REST endpoints for controlling the single recording slot plus a
//! WebSocket feed of progress events:
//! - POST /start-recording - start a session (409 when one is active)
//! - POST /stop-recording - signal the active session to stop
//! - GET /ws - observer WebSocket (server pushes JSON events)
//! - GET /health - health check

mod handlers;
mod routes;
mod state;
mod ws;

pub use routes::create_router;
pub use state::AppState;

use crate::broadcast::spawn_console_observer;
use crate::config::Config;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing::info;

/// Run the control server until it is shut down externally.
pub async fn serve(config: Config) -> Result<()> {
    let port = config.listen_port;
    let state = AppState::new(config);

    // Progress stays visible in the server log even with no WebSocket
    // observers attached.
    spawn_console_observer(&state.events);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    info!("control server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .await
        .context("control server error")?;
    Ok(())
}
