//! Router configuration and the serve loop.

use axum::{
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{health, list_sessions, AppState};
use super::websocket::ws_handler;
use crate::error::TtyShareError;
use crate::pty::default_shell;

/// Create the router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/l", get(list_sessions))
        .route("/ws/{session_id}", any(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Command spawned for each new session.
    pub command: String,
    pub args: Vec<String>,
    /// Shut down after the first receiver leaves.
    pub once: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the shared state for this configuration.
    pub fn state(&self) -> AppState {
        AppState::new(self.command.clone(), self.args.clone()).with_once(self.once)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            command: default_shell(),
            args: Vec::new(),
            once: false,
        }
    }
}

/// Bind and serve until Ctrl-C, or until the single receiver leaves in
/// `once` mode.
pub async fn serve(config: ServerConfig) -> crate::Result<()> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await.map_err(TtyShareError::Io)?;

    tracing::info!(command = %config.command, "Starting tty-share server on {}", addr);
    serve_on(listener, config.state()).await
}

/// Serve on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: AppState) -> crate::Result<()> {
    let router = create_router(state.clone());
    let shutdown = state.shutdown.clone();

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("received Ctrl-C"),
                () = shutdown.notified() => {}
            }
        })
        .await
        .map_err(|e| TtyShareError::Io(std::io::Error::other(e.to_string())))?;

    let stopped = state.store.stop_all()?;
    tracing::info!(stopped, "server stopped");
    Ok(())
}
