//! Headless widget backed by vt100.

use vt100::Parser;

use super::{TermSize, TerminalWidget};

/// Scrollback kept by the headless screen.
const SCROLLBACK: usize = 1000;

/// Terminal widget that renders into an in-memory vt100 screen.
///
/// The "host area" that [`TerminalWidget::fit`] measures is a plain value
/// set with [`ScreenWidget::set_host_size`], which makes window resizes
/// easy to simulate.
pub struct ScreenWidget {
    parser: Parser,
    host: TermSize,
    focused: bool,
    cursor_blink: bool,
    bytes_written: usize,
}

impl ScreenWidget {
    /// Create a new screen with default dimensions (80x24).
    pub fn new() -> Self {
        Self::with_size(TermSize::default())
    }

    /// Create a screen whose widget and host area both have `size`.
    pub fn with_size(size: TermSize) -> Self {
        Self {
            parser: Parser::new(size.rows.max(1), size.cols.max(1), SCROLLBACK),
            host: size,
            focused: false,
            cursor_blink: true,
            bytes_written: 0,
        }
    }

    /// Change the size of the hosting area. Takes effect on the next `fit`.
    pub fn set_host_size(&mut self, size: TermSize) {
        self.host = size;
    }

    /// Current screen contents as plain text.
    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    /// Non-empty rows, right-trimmed.
    pub fn non_empty_lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .map(|l| l.trim_end().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Current cursor position (row, col).
    pub fn cursor_position(&self) -> (u16, u16) {
        self.parser.screen().cursor_position()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn cursor_blink(&self) -> bool {
        self.cursor_blink
    }

    /// Total bytes fed to the screen since creation.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

impl Default for ScreenWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalWidget for ScreenWidget {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes_written += bytes.len();
        self.parser.process(bytes);
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn blur(&mut self) {
        self.focused = false;
    }

    fn set_cursor_blink(&mut self, enabled: bool) {
        self.cursor_blink = enabled;
    }

    fn size(&self) -> TermSize {
        let (rows, cols) = self.parser.screen().size();
        TermSize { cols, rows }
    }

    fn resize(&mut self, size: TermSize) {
        // vt100 cannot hold an empty grid
        self.parser
            .screen_mut()
            .set_size(size.rows.max(1), size.cols.max(1));
    }

    fn fit(&mut self) {
        let host = self.host;
        self.resize(host);
    }
}
