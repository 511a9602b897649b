//! HTTP handlers and shared server state.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tokio::sync::Notify;

use super::session::PtySession;
use super::store::SessionStore;
use crate::pty::default_shell;
use crate::Result;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    /// Command spawned for new sessions.
    pub command: Arc<str>,
    pub args: Arc<[String]>,
    /// Stop serving after the first receiver leaves.
    pub once: bool,
    /// Notified when the server should shut down.
    pub shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        let command: String = command.into();
        Self {
            store: Arc::new(SessionStore::new()),
            command: Arc::from(command),
            args: Arc::from(args),
            once: false,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Attach a receiver to the running session for `id`, spawning the
    /// command if needed. Returns the session and its receiver count.
    pub fn attach(&self, id: &str) -> Result<(Arc<PtySession>, usize)> {
        self.store
            .attach_or_insert_with(id, || PtySession::start(id, &self.command, &self.args))
    }

    /// Ask the server to stop accepting connections.
    pub fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(default_shell(), Vec::new())
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// List the ids of all active sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<String>>, (StatusCode, String)> {
    state
        .store
        .list_ids()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
