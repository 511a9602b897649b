//! Widget that passes bytes straight through to the controlling terminal.
//!
//! The host terminal does the actual rendering. This module only switches it
//! into raw mode, measures it, and turns stdin into input events.

use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use super::{TermSize, TerminalWidget, WidgetEvent};

const CURSOR_BLINK_ON: &[u8] = b"\x1b[?12h";
const CURSOR_BLINK_OFF: &[u8] = b"\x1b[?12l";

/// Ctrl-]: leaves the session instead of being forwarded.
pub const DETACH_KEY: char = '\x1d';

/// Measure the controlling terminal.
pub fn terminal_size() -> Option<TermSize> {
    let mut ws = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let ret = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    if ret == -1 || ws.ws_col == 0 || ws.ws_row == 0 {
        return None;
    }
    Some(TermSize::new(ws.ws_col, ws.ws_row))
}

/// RAII guard that puts stdin in raw mode and restores it on drop.
pub struct RawModeGuard {
    original: Option<nix::sys::termios::Termios>,
}

impl RawModeGuard {
    /// Enter raw mode. Does nothing when stdin is not a terminal.
    pub fn enter() -> Self {
        use nix::sys::termios;

        let stdin = std::io::stdin();
        let original = termios::tcgetattr(&stdin).ok();
        if let Some(ref original) = original {
            let mut raw = original.clone();
            termios::cfmakeraw(&mut raw);
            if let Err(e) = termios::tcsetattr(&stdin, termios::SetArg::TCSANOW, &raw) {
                warn!("failed to enter raw mode: {}", e);
            }
        }
        Self { original }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Some(ref original) = self.original {
            use nix::sys::termios;
            let stdin = std::io::stdin();
            let _ = termios::tcsetattr(&stdin, termios::SetArg::TCSANOW, original);
        }
    }
}

/// The controlling terminal as a widget.
pub struct LocalTerminal {
    out: std::io::Stdout,
    size: TermSize,
    focused: bool,
    _raw: RawModeGuard,
}

impl LocalTerminal {
    /// Take over the controlling terminal.
    pub fn new() -> Self {
        let raw = RawModeGuard::enter();
        Self {
            out: std::io::stdout(),
            size: terminal_size().unwrap_or_default(),
            focused: false,
            _raw: raw,
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    fn emit(&mut self, bytes: &[u8]) {
        let mut out = self.out.lock();
        if out.write_all(bytes).and_then(|_| out.flush()).is_err() {
            debug!("stdout closed, dropping {} bytes", bytes.len());
        }
    }
}

impl Default for LocalTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalWidget for LocalTerminal {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.emit(bytes);
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn blur(&mut self) {
        self.focused = false;
    }

    fn set_cursor_blink(&mut self, enabled: bool) {
        self.emit(if enabled {
            CURSOR_BLINK_ON
        } else {
            CURSOR_BLINK_OFF
        });
    }

    fn size(&self) -> TermSize {
        self.size
    }

    fn resize(&mut self, size: TermSize) {
        self.size = size;
    }

    fn fit(&mut self) {
        if let Some(size) = terminal_size() {
            self.size = size;
        }
    }
}

/// Incremental UTF-8 decoder that holds back sequences split across reads.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode as much of `pending + chunk` as possible.
    ///
    /// Invalid bytes become U+FFFD. An incomplete sequence at the end is kept
    /// for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // The prefix up to valid_up_to is valid UTF-8
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let remaining = rest.to_vec();
        self.pending = remaining;
        out
    }
}

/// Background thread turning stdin into [`WidgetEvent::Input`].
///
/// Stops when stdin reaches EOF, the channel closes, [`DETACH_KEY`] is
/// typed, or the handle is dropped.
pub struct StdinReader {
    shutdown: Arc<AtomicBool>,
    detached: Arc<Notify>,
}

impl StdinReader {
    pub fn spawn(tx: mpsc::Sender<WidgetEvent>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let detached = Arc::new(Notify::new());
        let thread_shutdown = Arc::clone(&shutdown);
        let thread_detached = Arc::clone(&detached);

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let fd = stdin.as_raw_fd();
            let mut buf = [0u8; 4096];
            let mut decoder = Utf8Decoder::default();

            while !thread_shutdown.load(Ordering::Relaxed) {
                // Poll with a timeout so the shutdown flag is noticed
                let mut pfd = libc::pollfd {
                    fd,
                    events: libc::POLLIN,
                    revents: 0,
                };
                let ret = unsafe { libc::poll(&mut pfd, 1, 100) };
                if ret <= 0 {
                    continue;
                }

                let n = match stdin.lock().read(&mut buf) {
                    Ok(0) => {
                        debug!("stdin: EOF");
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        debug!("stdin read error: {}", e);
                        break;
                    }
                };

                let (text, detach) = split_detach(decoder.decode(&buf[..n]));
                if !text.is_empty() && tx.blocking_send(WidgetEvent::Input(text)).is_err() {
                    break;
                }
                if detach {
                    info!("detach key pressed");
                    thread_detached.notify_one();
                    break;
                }
            }
        });

        Self { shutdown, detached }
    }

    /// Resolves once the user typed [`DETACH_KEY`].
    pub async fn detached(&self) {
        self.detached.notified().await;
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Cut `text` at the first [`DETACH_KEY`]. Returns the part to forward and
/// whether the key was present.
fn split_detach(mut text: String) -> (String, bool) {
    match text.find(DETACH_KEY) {
        Some(pos) => {
            text.truncate(pos);
            (text, true)
        }
        None => (text, false),
    }
}
