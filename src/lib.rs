//! # tty-share
//!
//! Share a terminal session over WebSocket.
//!
//! The server runs a command inside a PTY for every session id and streams
//! it to whoever attaches. The receiver side renders that stream in a
//! terminal widget, forwards keystrokes and window sizes back, and
//! reconnects after a fixed delay until the server ends the session.
//!
//! ## Features
//!
//! - **Wire protocol**: JSON frames with base64 payloads (`Write`, `WinSize`, `Terminate`)
//! - **Receiver**: connection state machine with a 3 second reconnect
//! - **Widgets**: an in-memory screen (vt100) and the local terminal
//! - **Server**: axum router with one shared PTY per session id
//!
//! ## Quick Start
//!
//! ```no_run
//! use tty_share::server::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> tty_share::Result<()> {
//!     tty_share::logging::try_init().ok();
//!     serve(ServerConfig::new("127.0.0.1", 8000)).await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod pty;
pub mod receiver;
pub mod server;
pub mod widget;

// Re-export commonly used types
pub use error::{Result, TtyShareError};
pub use protocol::{Frame, Message, MessageType};
pub use receiver::{ConnectionState, TtyReceiver};
pub use widget::{ScreenWidget, TermSize, TerminalWidget, WidgetEvent};
