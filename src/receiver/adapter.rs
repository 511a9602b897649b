//! Event handlers of the session transport adapter.
//!
//! [`TtyReceiver`] performs no I/O. Each handler mutates the widget and
//! connection state and hands back the frames that should go on the wire;
//! [`super::run`] owns the socket and calls them.

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::ConnectionState;
use crate::protocol::{Frame, Message, MessageType};
use crate::widget::{TermSize, TerminalWidget};

/// Delay between a close and the next connection attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Written once, when the receiver is created.
pub const CONNECTING_BANNER: &str = "Connecting to the server...\n\r";
/// Written on every close.
pub const CLOSED_BANNER: &str = "Session closed\n\r";
/// Written after [`CLOSED_BANNER`] when a reconnect is scheduled.
pub const RECONNECT_BANNER: &str = "Reconnecting after 3 seconds...\n\r";

/// What the driver should do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Connect again to the same target once `after` has elapsed.
    Reconnect { after: Duration },
    /// The session is over.
    Finished,
}

/// Bridges a terminal widget to one remote PTY session.
pub struct TtyReceiver<W> {
    target: String,
    widget: W,
    state: ConnectionState,
    attempts: u64,
}

impl<W: TerminalWidget> TtyReceiver<W> {
    /// Create a receiver for `target` rendering into `widget`.
    ///
    /// Starts in [`ConnectionState::Connecting`] with the connecting banner
    /// already written.
    pub fn new(target: impl Into<String>, mut widget: W) -> Self {
        widget.write_str(CONNECTING_BANNER);
        Self {
            target: target.into(),
            widget,
            state: ConnectionState::Connecting,
            attempts: 1,
        }
    }

    /// The address every connection attempt uses.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of connection attempts started so far, the first included.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn into_widget(self) -> W {
        self.widget
    }

    /// The connection is established.
    ///
    /// Focuses the widget, shrinks it by one cell and refits it (the widget
    /// may have measured its host before layout settled), then re-enables
    /// cursor blink. Returns the `WinSize` frames those changes produced.
    pub fn on_open(&mut self) -> Vec<String> {
        if let Err(e) = self.state.transition_to(ConnectionState::Open) {
            warn!("ignoring open event: {}", e);
            return Vec::new();
        }
        info!(url = %self.target, "connected");

        self.widget.focus();
        let shrunk = self.widget.size().shrunk();
        let mut frames = Vec::with_capacity(2);
        frames.extend(self.resize(shrunk));
        frames.extend(self.fit());
        self.widget.set_cursor_blink(true);
        frames
    }

    /// A text frame arrived from the server.
    ///
    /// Anything that does not decode is dropped without touching the widget.
    pub fn on_message(&mut self, text: &str) {
        let frame = match Frame::from_json(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("ignoring malformed frame: {}", e);
                return;
            }
        };

        match frame.kind {
            MessageType::Write => match frame.decode() {
                Ok(Message::Write(bytes)) => {
                    trace!("rendering {} bytes", bytes.len());
                    self.widget.write_bytes(&bytes);
                }
                Ok(_) => {}
                Err(e) => debug!("ignoring undecodable Write frame: {}", e),
            },
            MessageType::Terminate => match self.state.transition_to(ConnectionState::Terminating) {
                Ok(()) => info!("server terminated the session"),
                Err(e) => debug!("ignoring Terminate frame: {}", e),
            },
            other => debug!("ignoring {:?} frame", other),
        }
    }

    /// The connection closed, or a connection attempt failed.
    ///
    /// A close that arrives after the connection is already closed changes
    /// nothing and repeats the earlier outcome.
    pub fn on_close(&mut self) -> CloseOutcome {
        let retry = self.state.retries_on_close();
        let target = if retry {
            ConnectionState::ClosedRetryable
        } else {
            ConnectionState::ClosedTerminal
        };
        if let Err(e) = self.state.transition_to(target) {
            debug!("ignoring close event: {}", e);
            return self.close_outcome();
        }

        self.widget.blur();
        self.widget.set_cursor_blink(false);
        self.widget.write_str(CLOSED_BANNER);
        if retry {
            self.widget.write_str(RECONNECT_BANNER);
            info!(
                url = %self.target,
                "connection closed, reconnecting in {:?}",
                RECONNECT_DELAY
            );
        } else {
            info!("session ended");
        }
        self.close_outcome()
    }

    fn close_outcome(&self) -> CloseOutcome {
        if self.state.is_terminal() {
            CloseOutcome::Finished
        } else {
            CloseOutcome::Reconnect {
                after: RECONNECT_DELAY,
            }
        }
    }

    /// The reconnect delay elapsed.
    ///
    /// Returns `true` if a new connection attempt should start. Only a
    /// session still in [`ConnectionState::ClosedRetryable`] reconnects.
    pub fn begin_reconnect(&mut self) -> bool {
        match self.state.transition_to(ConnectionState::Connecting) {
            Ok(()) => {
                self.attempts += 1;
                debug!(attempt = self.attempts, "reconnecting");
                true
            }
            Err(_) => {
                debug!("reconnect skipped in state {:?}", self.state);
                false
            }
        }
    }

    /// The owner is going away. No further reconnects happen.
    pub fn shutdown(&mut self) {
        if self
            .state
            .transition_to(ConnectionState::ClosedTerminal)
            .is_ok()
        {
            debug!("receiver shut down");
        }
    }

    /// User input captured by the widget. Returns the `Write` frame to send.
    ///
    /// Input typed while disconnected is dropped.
    pub fn on_input(&mut self, data: &str) -> Option<String> {
        if !self.state.is_connected() {
            debug!("dropping {} bytes of input while {:?}", data.len(), self.state);
            return None;
        }
        Frame::write(data)
            .to_json()
            .map_err(|e| warn!("failed to encode input: {}", e))
            .ok()
    }

    /// The hosting window changed size.
    pub fn on_window_resize(&mut self) -> Option<String> {
        self.fit()
    }

    /// Set the widget size. Returns a `WinSize` frame if it changed.
    pub fn resize(&mut self, size: TermSize) -> Option<String> {
        self.apply_resize(|w| w.resize(size))
    }

    /// Refit the widget to its host. Returns a `WinSize` frame if it changed.
    pub fn fit(&mut self) -> Option<String> {
        self.apply_resize(|w| w.fit())
    }

    fn apply_resize(&mut self, f: impl FnOnce(&mut W)) -> Option<String> {
        let before = self.widget.size();
        f(&mut self.widget);
        let after = self.widget.size();
        if after == before {
            return None;
        }

        debug!(cols = after.cols, rows = after.rows, "terminal resized");
        if !self.state.is_connected() {
            return None;
        }
        Frame::win_size(after.cols, after.rows)
            .to_json()
            .map_err(|e| warn!("failed to encode window size: {}", e))
            .ok()
    }
}
