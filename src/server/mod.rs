//! Sharing server.
//!
//! Runs a command in a PTY per session id and lets receivers attach to it
//! over WebSocket, speaking the frame protocol from [`crate::protocol`].
//!
//! - `GET /health`: liveness check
//! - `GET /l`: JSON array of active session ids
//! - `GET /ws/{session_id}`: attach to (or start) a session

mod handlers;
mod router;
mod session;
mod store;
mod websocket;

pub use handlers::{health, list_sessions, AppState};
pub use router::{create_router, serve, serve_on, ServerConfig};
pub use session::PtySession;
pub use store::SessionStore;
pub use websocket::ws_handler;
