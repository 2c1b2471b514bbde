use ratatui::style::{Color, Modifier, Style};

/// Resolved styles for every part of the interface.
///
/// Built once at startup from the configured theme name and handed to the
/// renderer by reference; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background_color: Color,

    // Transcript
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub assistant_prefix_style: Style,
    pub assistant_text_style: Style,
    pub info_text_style: Style,
    pub error_text_style: Style,
    pub separator_style: Style,

    // Markdown
    pub md_heading_style: Style,
    pub md_code_style: Style,
    pub md_link_style: Style,
    pub md_quote_style: Style,
    pub md_list_marker_style: Style,

    // Chrome
    pub title_style: Style,
    pub status_style: Style,
    pub status_accent_style: Style,
    pub success_style: Style,
    pub muted_style: Style,
    pub help_border_style: Style,
    pub shortcut_style: Style,
    pub picker_highlight_style: Style,

    // Input area
    pub input_border_style: Style,
    pub input_title_style: Style,
    pub input_text_style: Style,
    pub input_cursor_style: Style,
    pub input_cursor_line_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        let indigo = Color::Rgb(0x63, 0x66, 0xf1);
        let emerald = Color::Rgb(0x10, 0xb9, 0x81);
        let amber = Color::Rgb(0xf5, 0x9e, 0x0b);
        let red = Color::Rgb(0xef, 0x44, 0x44);
        let green = Color::Rgb(0x22, 0xc5, 0x5e);
        let text = Color::Rgb(0xe5, 0xe7, 0xeb);
        let secondary = Color::Rgb(0x9c, 0xa3, 0xaf);
        let muted = Color::Rgb(0x6b, 0x72, 0x80);
        let border = Color::Rgb(0x37, 0x41, 0x51);

        Theme {
            background_color: Color::Rgb(0x11, 0x18, 0x27),

            user_prefix_style: Style::default()
                .fg(Color::Rgb(0x3b, 0x82, 0xf6))
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::White),
            assistant_prefix_style: Style::default()
                .fg(emerald)
                .add_modifier(Modifier::BOLD),
            assistant_text_style: Style::default().fg(text),
            info_text_style: Style::default().fg(muted).add_modifier(Modifier::ITALIC),
            error_text_style: Style::default().fg(red).add_modifier(Modifier::BOLD),
            separator_style: Style::default().fg(border),

            md_heading_style: Style::default().fg(indigo).add_modifier(Modifier::BOLD),
            md_code_style: Style::default().fg(amber),
            md_link_style: Style::default()
                .fg(Color::Rgb(0x60, 0xa5, 0xfa))
                .add_modifier(Modifier::UNDERLINED),
            md_quote_style: Style::default().fg(secondary).add_modifier(Modifier::ITALIC),
            md_list_marker_style: Style::default().fg(emerald),

            title_style: Style::default().fg(indigo).add_modifier(Modifier::BOLD),
            status_style: Style::default().fg(secondary),
            status_accent_style: Style::default().fg(amber).add_modifier(Modifier::BOLD),
            success_style: Style::default().fg(green).add_modifier(Modifier::BOLD),
            muted_style: Style::default().fg(secondary).add_modifier(Modifier::ITALIC),
            help_border_style: Style::default().fg(red),
            shortcut_style: Style::default().fg(amber).add_modifier(Modifier::BOLD),
            picker_highlight_style: Style::default()
                .fg(Color::White)
                .bg(indigo)
                .add_modifier(Modifier::BOLD),

            input_border_style: Style::default().fg(border),
            input_title_style: Style::default().fg(secondary),
            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            input_cursor_line_style: Style::default(),
        }
    }

    pub fn light() -> Self {
        let indigo = Color::Rgb(0x43, 0x38, 0xca);
        let emerald = Color::Rgb(0x04, 0x78, 0x57);
        let amber = Color::Rgb(0xb4, 0x53, 0x09);
        let red = Color::Rgb(0xb9, 0x1c, 0x1c);
        let green = Color::Rgb(0x15, 0x80, 0x3d);
        let text = Color::Rgb(0x1f, 0x29, 0x37);
        let secondary = Color::Rgb(0x4b, 0x55, 0x63);
        let muted = Color::Rgb(0x6b, 0x72, 0x80);
        let border = Color::Rgb(0xd1, 0xd5, 0xdb);

        Theme {
            background_color: Color::Rgb(0xf9, 0xfa, 0xfb),

            user_prefix_style: Style::default()
                .fg(Color::Rgb(0x1d, 0x4e, 0xd8))
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Rgb(0x1e, 0x3a, 0x8a)),
            assistant_prefix_style: Style::default()
                .fg(emerald)
                .add_modifier(Modifier::BOLD),
            assistant_text_style: Style::default().fg(text),
            info_text_style: Style::default().fg(muted).add_modifier(Modifier::ITALIC),
            error_text_style: Style::default().fg(red).add_modifier(Modifier::BOLD),
            separator_style: Style::default().fg(border),

            md_heading_style: Style::default().fg(indigo).add_modifier(Modifier::BOLD),
            md_code_style: Style::default().fg(amber),
            md_link_style: Style::default()
                .fg(Color::Rgb(0x1d, 0x4e, 0xd8))
                .add_modifier(Modifier::UNDERLINED),
            md_quote_style: Style::default().fg(secondary).add_modifier(Modifier::ITALIC),
            md_list_marker_style: Style::default().fg(emerald),

            title_style: Style::default().fg(indigo).add_modifier(Modifier::BOLD),
            status_style: Style::default().fg(secondary),
            status_accent_style: Style::default().fg(amber).add_modifier(Modifier::BOLD),
            success_style: Style::default().fg(green).add_modifier(Modifier::BOLD),
            muted_style: Style::default().fg(muted).add_modifier(Modifier::ITALIC),
            help_border_style: Style::default().fg(red),
            shortcut_style: Style::default().fg(amber).add_modifier(Modifier::BOLD),
            picker_highlight_style: Style::default()
                .fg(Color::White)
                .bg(indigo)
                .add_modifier(Modifier::BOLD),

            input_border_style: Style::default().fg(secondary),
            input_title_style: Style::default().fg(secondary),
            input_text_style: Style::default().fg(Color::Black),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            input_cursor_line_style: Style::default(),
        }
    }

    /// Look up a theme by name. Unknown names fall back to the dark theme.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark_default(),
        }
    }

    /// Style for a tokens-per-second reading.
    pub fn rate_style(&self, tokens_per_second: f64) -> Style {
        if tokens_per_second > 50.0 {
            self.success_style
        } else if tokens_per_second > 20.0 {
            self.status_accent_style
        } else {
            self.muted_style
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_case_insensitive_and_falls_back_to_dark() {
        assert_eq!(Theme::from_name("LIGHT"), Theme::light());
        assert_eq!(Theme::from_name("dark"), Theme::dark_default());
        assert_eq!(Theme::from_name("solarized"), Theme::dark_default());
    }

    #[test]
    fn rate_style_uses_three_tiers() {
        let theme = Theme::dark_default();
        assert_eq!(theme.rate_style(75.0), theme.success_style);
        assert_eq!(theme.rate_style(50.0), theme.status_accent_style);
        assert_eq!(theme.rate_style(21.0), theme.status_accent_style);
        assert_eq!(theme.rate_style(20.0), theme.muted_style);
        assert_eq!(theme.rate_style(0.0), theme.muted_style);
    }
}
