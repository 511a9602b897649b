//! PTY (Pseudo-Terminal) layer used by the server.
//!
//! Spawns the shared command inside a pseudo-terminal and exposes its I/O
//! to async code. Works on Unix PTYs and Windows ConPTY through
//! portable-pty.

mod async_adapter;
pub(crate) mod native;

pub use async_adapter::{AsyncPtyReader, AsyncPtyWriter};
pub use native::{default_shell, NativePty, PtyHandle};

use crate::widget::TermSize;

/// Size of a PTY in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    /// Number of rows (height).
    pub rows: u16,
    /// Number of columns (width).
    pub cols: u16,
}

impl PtySize {
    /// Create a new PtySize with the given dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for PtySize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

impl From<TermSize> for PtySize {
    fn from(size: TermSize) -> Self {
        Self {
            rows: size.rows,
            cols: size.cols,
        }
    }
}

impl From<PtySize> for portable_pty::PtySize {
    fn from(size: PtySize) -> Self {
        portable_pty::PtySize {
            rows: size.rows,
            cols: size.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}
