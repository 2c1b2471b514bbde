use std::time::{Duration, Instant};

use ratatui::prelude::Size;
use ratatui::style::Style;
use tui_textarea::TextArea;

use crate::ui::theme::Theme;

/// How long a transient status message stays in the title bar.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(4);

/// Presentation state that does not belong to the chat session itself.
#[derive(Debug, Clone)]
pub struct UiState {
    textarea: TextArea<'static>,
    pub theme: Theme,
    pub markdown_enabled: bool,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    pub show_help: bool,
    pub status: Option<String>,
    pub status_set_at: Option<Instant>,
    pub pulse_start: Instant,
    pub exit_requested: bool,
    pub last_term_size: Size,
}

impl UiState {
    pub fn new(theme: Theme, markdown_enabled: bool) -> Self {
        let mut ui = Self {
            textarea: TextArea::default(),
            theme,
            markdown_enabled,
            scroll_offset: 0,
            auto_scroll: true,
            show_help: false,
            status: None,
            status_set_at: None,
            pulse_start: Instant::now(),
            exit_requested: false,
            last_term_size: Size::default(),
        };
        ui.configure_textarea();
        ui
    }

    pub(crate) fn configure_textarea(&mut self) {
        let textarea_style = self
            .theme
            .input_text_style
            .patch(Style::default().bg(self.theme.background_color));
        self.textarea.set_style(textarea_style);
        self.textarea
            .set_cursor_style(self.theme.input_cursor_style);
        self.textarea
            .set_cursor_line_style(self.theme.input_cursor_line_style);
        self.textarea
            .set_placeholder_text("Type a message and press Enter");
        self.textarea.set_placeholder_style(self.theme.muted_style);
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn get_input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    /// Empty the input box and return what it held.
    pub fn take_input(&mut self) -> String {
        let text = self.get_input_text();
        self.clear_input();
        text
    }

    pub fn clear_input(&mut self) {
        self.textarea = TextArea::default();
        self.configure_textarea();
    }

    pub fn apply_textarea_edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut TextArea<'static>),
    {
        f(&mut self.textarea);
    }

    /// Rows the input box needs, between one and six.
    pub fn input_area_height(&self) -> u16 {
        (self.textarea.lines().len() as u16).clamp(1, 6)
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
        self.status_set_at = Some(Instant::now());
    }

    /// Drop the status message once it has been shown long enough.
    pub fn expire_status(&mut self, now: Instant) {
        if self
            .status_set_at
            .is_some_and(|set_at| now.saturating_duration_since(set_at) >= STATUS_TIMEOUT)
        {
            self.status = None;
            self.status_set_at = None;
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16, max_offset: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(max_offset);
        self.auto_scroll = self.scroll_offset >= max_offset;
    }

    pub fn scroll_to_top(&mut self) {
        self.auto_scroll = false;
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self, max_offset: u16) {
        self.auto_scroll = true;
        self.scroll_offset = max_offset;
    }

    /// Keep the offset in range; while auto-following, pin it to the bottom.
    pub fn sync_scroll(&mut self, max_offset: u16) {
        if self.auto_scroll {
            self.scroll_offset = max_offset;
        } else {
            self.scroll_offset = self.scroll_offset.min(max_offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ui() -> UiState {
        UiState::new(Theme::dark_default(), true)
    }

    #[test]
    fn take_input_returns_text_and_clears() {
        let mut ui = ui();
        ui.apply_textarea_edit(|ta| {
            ta.insert_str("hello");
            ta.insert_newline();
            ta.insert_str("world");
        });
        assert_eq!(ui.input_area_height(), 2);
        assert_eq!(ui.take_input(), "hello\nworld");
        assert_eq!(ui.get_input_text(), "");
        assert_eq!(ui.input_area_height(), 1);
    }

    #[test]
    fn scrolling_up_stops_auto_follow_until_bottom_is_reached() {
        let mut ui = ui();
        ui.sync_scroll(30);
        assert_eq!(ui.scroll_offset, 30);

        ui.scroll_up(5);
        assert!(!ui.auto_scroll);
        ui.sync_scroll(40);
        assert_eq!(ui.scroll_offset, 25);

        ui.scroll_down(100, 40);
        assert!(ui.auto_scroll);
        assert_eq!(ui.scroll_offset, 40);
    }

    #[test]
    fn scroll_to_top_and_bottom() {
        let mut ui = ui();
        ui.scroll_to_top();
        assert_eq!(ui.scroll_offset, 0);
        assert!(!ui.auto_scroll);
        ui.scroll_to_bottom(12);
        assert_eq!(ui.scroll_offset, 12);
        assert!(ui.auto_scroll);
    }

    #[test]
    fn status_expires_after_timeout() {
        let mut ui = ui();
        ui.set_status("Model set to llama3.2");
        let set_at = ui.status_set_at.expect("timestamp");
        ui.expire_status(set_at + Duration::from_secs(1));
        assert!(ui.status.is_some());
        ui.expire_status(set_at + STATUS_TIMEOUT);
        assert!(ui.status.is_none());
    }
}
