use ratatui::style::{Color, Style};

/// Colors of `tagedit`. Text colors come from the document itself; the
/// theme only covers the chrome around it and the selection.
#[derive(Clone, Debug)]
pub struct Theme {
    pub status_bar_fg: Color,
    pub status_bar_bg: Color,
    /// Path shown at the left of the status bar.
    pub filename_color: Color,
    pub selection_fg: Color,
    pub selection_bg: Color,
    /// Status messages about refused edits (unmatched markup, `<` typed).
    pub error_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            error_color: Color::LightRed,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    /// Patched over the resolved formatting of selected characters, so
    /// bold or underlined text stays recognizable while selected.
    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    /// Combined with the status bar style for refused edits.
    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error_color)
    }
}
