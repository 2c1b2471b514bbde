use std::time::{Duration, Instant};

use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::core::app::App;
use crate::core::session::{GenerationOutcome, GenerationState};
use crate::ui::markdown::build_display_lines;
use crate::ui::theme::Theme;
use crate::utils::scroll::ScrollCalculator;

const SPINNER_FRAMES: [&str; 4] = ["○", "◔", "◑", "◕"];

const SHORTCUTS: [(&str, &str); 9] = [
    ("Enter", "Send message"),
    ("Esc", "Cancel generation (quit when idle)"),
    ("Ctrl+P/F2", "Choose model"),
    ("Ctrl+L", "Clear chat"),
    ("Ctrl+G", "Pause or resume transcript log"),
    ("Ctrl+H/F1", "Toggle this help"),
    ("↑/↓ PgUp/PgDn", "Scroll messages"),
    ("Home/End", "Jump to top or bottom"),
    ("Ctrl+C", "Quit"),
];

/// Rows taken by the transcript view for a frame of `area`.
pub struct FrameLayout {
    pub title: Rect,
    pub transcript: Rect,
    pub help: Option<Rect>,
    pub status: Rect,
    pub input: Rect,
}

impl FrameLayout {
    pub fn new(area: Rect, input_height: u16, show_help: bool) -> Self {
        let help_height = if show_help {
            SHORTCUTS.len() as u16 + 2
        } else {
            0
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(help_height),
                Constraint::Length(1),
                Constraint::Length(input_height + 2),
            ])
            .split(area);

        Self {
            title: chunks[0],
            transcript: chunks[1],
            help: show_help.then_some(chunks[2]),
            status: chunks[3],
            input: chunks[4],
        }
    }
}

/// Total wrapped transcript rows and the largest valid scroll offset for a
/// terminal of `area`.
pub fn transcript_metrics(app: &App, area: Rect) -> (Vec<Line<'static>>, u16) {
    let layout = FrameLayout::new(area, app.ui.input_area_height(), app.ui.show_help);
    let lines = build_display_lines(
        app.session.transcript().turns(),
        &app.ui.theme,
        app.ui.markdown_enabled,
        layout.transcript.width,
    );
    let max_offset = ScrollCalculator::max_scroll_offset(lines.len(), layout.transcript.height);
    (lines, max_offset)
}

pub fn ui(f: &mut Frame, app: &App) {
    let now = Instant::now();
    let theme = &app.ui.theme;
    let area = f.area();
    let layout = FrameLayout::new(area, app.ui.input_area_height(), app.ui.show_help);

    f.render_widget(
        Block::default().style(Style::default().bg(theme.background_color)),
        area,
    );

    f.render_widget(Paragraph::new(title_line(app)), layout.title);

    let (lines, max_offset) = transcript_metrics(app, area);
    let scroll_offset = if app.ui.auto_scroll {
        max_offset
    } else {
        app.ui.scroll_offset.min(max_offset)
    };
    f.render_widget(
        Paragraph::new(lines).scroll((scroll_offset, 0)),
        layout.transcript,
    );

    if let Some(help_area) = layout.help {
        render_help(f, theme, help_area);
    }

    f.render_widget(Paragraph::new(status_line(app, now)), layout.status);

    let input_title = if app.is_generating() {
        "Generating… (Esc to cancel)"
    } else {
        "Message (Enter to send, Ctrl+H for help)"
    };
    let mut textarea = app.ui.textarea().clone();
    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.input_border_style)
            .title(Span::styled(input_title, theme.input_title_style)),
    );
    f.render_widget(&textarea, layout.input);

    if let Some(picker) = app.picker.as_ref() {
        let popup = centered_rect(area, 50, picker.items.len() as u16 + 2);
        let items: Vec<ListItem> = picker
            .items
            .iter()
            .map(|item| ListItem::new(item.as_str()))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.input_border_style)
                    .title(Span::styled(picker.title.as_str(), theme.title_style)),
            )
            .style(theme.assistant_text_style.bg(theme.background_color))
            .highlight_style(theme.picker_highlight_style)
            .highlight_symbol("› ");
        let mut state = ListState::default().with_selected(Some(picker.selected));
        f.render_widget(Clear, popup);
        f.render_stateful_widget(list, popup, &mut state);
    }
}

pub fn title_line(app: &App) -> Line<'static> {
    let theme = &app.ui.theme;
    let mut spans = vec![
        Span::styled(
            format!("Ollama TUI v{}", env!("CARGO_PKG_VERSION")),
            theme.title_style,
        ),
        Span::styled(
            format!(
                " • {} • Logging: {}",
                app.base_url,
                app.logging.get_status_string()
            ),
            theme.status_style,
        ),
    ];
    if let Some(status) = app.ui.status.as_ref() {
        spans.push(Span::styled(format!(" • {status}"), theme.status_accent_style));
    }
    Line::from(spans)
}

/// Activity icon, model, tokens, rate, elapsed time and last outcome.
pub fn status_line(app: &App, now: Instant) -> Line<'static> {
    let theme = &app.ui.theme;
    let metrics = app.session.metrics();
    let tokens_per_second = metrics.rate(now);
    let elapsed = metrics.elapsed(now).unwrap_or_default();

    let icon = match app.session.state() {
        GenerationState::Requesting | GenerationState::Streaming => {
            let ticks = now.saturating_duration_since(app.ui.pulse_start).as_millis() / 250;
            format!("⚡{}", SPINNER_FRAMES[ticks as usize % SPINNER_FRAMES.len()])
        }
        _ => "📊".to_string(),
    };

    let mut spans = vec![
        Span::styled(format!("{icon} "), theme.status_style),
        Span::styled(app.session.model().to_string(), theme.status_accent_style),
        Span::styled(" • tokens: ", theme.status_style),
        Span::styled(
            metrics.approx_token_count().to_string(),
            theme.status_accent_style,
        ),
        Span::styled(" • ", theme.status_style),
        Span::styled(
            format!("{tokens_per_second:.1} t/s"),
            theme.rate_style(tokens_per_second),
        ),
        Span::styled(" • time: ", theme.status_style),
        Span::styled(format_elapsed(elapsed), theme.muted_style),
    ];

    if let Some(outcome) = app.session.last_outcome() {
        let (label, style) = outcome_label(outcome, theme);
        spans.push(Span::styled(" • ", theme.status_style));
        spans.push(Span::styled(label, style));
    }

    Line::from(spans)
}

fn outcome_label(outcome: GenerationOutcome, theme: &Theme) -> (&'static str, Style) {
    match outcome {
        GenerationOutcome::Completed => ("done", theme.success_style),
        GenerationOutcome::ClosedWithoutFinal => ("closed early", theme.status_accent_style),
        GenerationOutcome::Cancelled => ("cancelled", theme.muted_style),
        GenerationOutcome::Failed => ("failed", theme.error_text_style),
    }
}

/// Millisecond precision, switching to minutes past one minute.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1_000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.3}s", millis as f64 / 1_000.0)
    } else {
        let secs = elapsed.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}

fn render_help(f: &mut Frame, theme: &Theme, area: Rect) {
    let lines: Vec<Line> = SHORTCUTS
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{keys:<15}"), theme.shortcut_style),
                Span::styled(format!("→ {action}"), theme.status_style),
            ])
        })
        .collect();
    let help = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.help_border_style)
            .title(Span::styled("Keyboard shortcuts", theme.shortcut_style)),
    );
    f.render_widget(help, area);
}

fn centered_rect(area: Rect, width_percent: u16, height: u16) -> Rect {
    let [vertical] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Percentage(width_percent)])
        .flex(Flex::Center)
        .areas(vertical);
    popup
}
