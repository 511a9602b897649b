//! Terminal widget abstraction.
//!
//! The receiver never renders anything itself. It drives a widget through
//! [`TerminalWidget`] and leaves grid management, glyphs and keyboard
//! decoding to the implementation.

mod screen;

#[cfg(unix)]
pub mod local;

pub use screen::ScreenWidget;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    /// Number of columns (width).
    pub cols: u16,
    /// Number of rows (height).
    pub rows: u16,
}

impl TermSize {
    /// Create a new TermSize with the given dimensions.
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// One cell smaller in each direction, never below 1x1.
    pub fn shrunk(self) -> Self {
        Self {
            cols: self.cols.saturating_sub(1).max(1),
            rows: self.rows.saturating_sub(1).max(1),
        }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Events a widget feeds back to the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    /// One unit of user input, as typed.
    Input(String),
    /// The hosting window changed size; the widget should be refit.
    WindowResized,
}

/// Operations the receiver needs from a terminal widget.
pub trait TerminalWidget {
    /// Write a status line (banners such as "Session closed").
    fn write_str(&mut self, text: &str) {
        self.write_bytes(text.as_bytes());
    }

    /// Feed raw terminal output, escape sequences included.
    fn write_bytes(&mut self, bytes: &[u8]);

    /// Give the widget input focus.
    fn focus(&mut self);

    /// Take input focus away from the widget.
    fn blur(&mut self);

    /// Enable or disable the blinking cursor.
    fn set_cursor_blink(&mut self, enabled: bool);

    /// Current dimensions.
    fn size(&self) -> TermSize;

    /// Set the dimensions explicitly.
    fn resize(&mut self, size: TermSize);

    /// Re-measure the hosting area and adopt its dimensions.
    fn fit(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_size_default() {
        let size = TermSize::default();
        assert_eq!(size.cols, 80);
        assert_eq!(size.rows, 24);
    }

    #[test]
    fn test_shrunk() {
        assert_eq!(TermSize::new(80, 24).shrunk(), TermSize::new(79, 23));
        assert_eq!(TermSize::new(1, 1).shrunk(), TermSize::new(1, 1));
        assert_eq!(TermSize::new(0, 5).shrunk(), TermSize::new(1, 4));
    }
}
