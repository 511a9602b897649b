//! Session transport adapter.
//!
//! Bridges a [`TerminalWidget`](crate::widget::TerminalWidget) to a remote
//! PTY over a WebSocket: renders server output, forwards keystrokes and
//! resizes, and reconnects after a fixed delay until the server sends
//! `Terminate`.
//!
//! ```text
//! Connecting -> Open -> ClosedRetryable -> Connecting -> ...
//!                 |
//!                 +-> Terminating -> ClosedTerminal
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use tty_share::receiver::{run, TtyReceiver, WsTransport};
//! use tty_share::widget::ScreenWidget;
//!
//! #[tokio::main]
//! async fn main() -> tty_share::Result<()> {
//!     let mut receiver = TtyReceiver::new("ws://127.0.0.1:8000/ws/1", ScreenWidget::new());
//!     let (_events_tx, mut events) = mpsc::channel(64);
//!     run(&mut receiver, &mut WsTransport::new(), &mut events).await
//! }
//! ```

mod adapter;
mod resize;
mod run;
mod state;
mod transport;

pub use adapter::{
    CloseOutcome, TtyReceiver, CLOSED_BANNER, CONNECTING_BANNER, RECONNECT_BANNER,
    RECONNECT_DELAY,
};
pub use resize::ResizeSubscription;
pub use run::run;
pub use state::ConnectionState;
pub use transport::{Link, Transport, WsLink, WsTransport};
