//! Markdown rendering for assistant replies and transcript line building.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::core::message::{ChatTurn, TranscriptRole};
use crate::ui::theme::Theme;
use crate::utils::scroll::ScrollCalculator;

const USER_PREFIX: &str = "You: ";
const ASSISTANT_PREFIX: &str = "AI: ";

#[derive(Clone, Debug)]
enum ListKind {
    Unordered,
    Ordered(u64),
}

struct LineCollector {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
}

impl LineCollector {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
        }
    }

    fn push(&mut self, text: &str, style: Style) {
        if !text.is_empty() {
            self.current.push(Span::styled(text.to_string(), style));
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
    }

    /// Close the current block with a single blank separator line.
    fn end_block(&mut self) {
        self.flush();
        if self
            .lines
            .last()
            .is_some_and(|line| !line.spans.is_empty())
        {
            self.lines.push(Line::from(""));
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Render markdown `content` into unwrapped, styled lines.
pub fn render_markdown(content: &str, base: Style, theme: &Theme) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = LineCollector::new();
    let mut style_stack: Vec<Style> = vec![base];
    let mut list_stack: Vec<ListKind> = Vec::new();
    let mut quote_depth = 0usize;
    let mut code_block: Option<Vec<String>> = None;
    let mut table_cell = 0usize;

    let current = |stack: &[Style]| stack.last().copied().unwrap_or(base);

    for event in Parser::new_ext(content, options) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Paragraph => {
                    if quote_depth > 0 && out.current.is_empty() {
                        out.push(&"│ ".repeat(quote_depth), theme.md_quote_style);
                    }
                }
                Tag::Heading { level, .. } => {
                    out.flush();
                    out.push(&"#".repeat(level as usize), theme.md_heading_style);
                    out.push(" ", theme.md_heading_style);
                    style_stack.push(theme.md_heading_style);
                }
                Tag::BlockQuote(_) => {
                    out.flush();
                    quote_depth += 1;
                    style_stack.push(theme.md_quote_style);
                }
                Tag::List(start) => {
                    out.flush();
                    list_stack.push(match start {
                        Some(n) => ListKind::Ordered(n),
                        None => ListKind::Unordered,
                    });
                }
                Tag::Item => {
                    out.flush();
                    let indent = "  ".repeat(list_stack.len().saturating_sub(1));
                    let marker = match list_stack.last_mut() {
                        Some(ListKind::Ordered(n)) => {
                            let marker = format!("{indent}{n}. ");
                            *n += 1;
                            marker
                        }
                        _ => format!("{indent}• "),
                    };
                    out.push(&marker, theme.md_list_marker_style);
                }
                Tag::CodeBlock(kind) => {
                    out.flush();
                    if let CodeBlockKind::Fenced(lang) = kind {
                        if !lang.is_empty() {
                            out.lines
                                .push(Line::from(Span::styled(format!("```{lang}"), theme.muted_style)));
                        }
                    }
                    code_block = Some(Vec::new());
                }
                Tag::Emphasis => style_stack.push(current(&style_stack).add_modifier(Modifier::ITALIC)),
                Tag::Strong => style_stack.push(current(&style_stack).add_modifier(Modifier::BOLD)),
                Tag::Strikethrough => {
                    style_stack.push(current(&style_stack).add_modifier(Modifier::CROSSED_OUT))
                }
                Tag::Link { .. } => style_stack.push(theme.md_link_style),
                Tag::TableRow | Tag::TableHead => {
                    out.flush();
                    table_cell = 0;
                }
                Tag::TableCell => {
                    if table_cell > 0 {
                        out.push(" │ ", theme.separator_style);
                    }
                    table_cell += 1;
                }
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Paragraph => {
                    if list_stack.is_empty() {
                        out.end_block();
                    } else {
                        out.flush();
                    }
                }
                TagEnd::Heading(_) => {
                    style_stack.pop();
                    out.end_block();
                }
                TagEnd::BlockQuote(_) => {
                    style_stack.pop();
                    quote_depth = quote_depth.saturating_sub(1);
                    out.end_block();
                }
                TagEnd::List(_) => {
                    list_stack.pop();
                    if list_stack.is_empty() {
                        out.end_block();
                    } else {
                        out.flush();
                    }
                }
                TagEnd::Item => out.flush(),
                TagEnd::CodeBlock => {
                    for line in code_block.take().unwrap_or_default() {
                        out.lines
                            .push(Line::from(Span::styled(format!("  {line}"), theme.md_code_style)));
                    }
                    out.end_block();
                }
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    style_stack.pop();
                }
                TagEnd::TableHead => {
                    // Header cells are bold
                    let header: Vec<Span<'static>> = std::mem::take(&mut out.current)
                        .into_iter()
                        .map(|span| {
                            let style = span.style.add_modifier(Modifier::BOLD);
                            span.style(style)
                        })
                        .collect();
                    out.lines.push(Line::from(header));
                }
                TagEnd::TableRow => out.flush(),
                TagEnd::Table => out.end_block(),
                _ => {}
            },
            Event::Text(text) => match code_block.as_mut() {
                Some(block) => block.extend(text.lines().map(detab)),
                None => out.push(&text, current(&style_stack)),
            },
            Event::Code(code) => out.push(&code, theme.md_code_style),
            Event::SoftBreak | Event::HardBreak => {
                out.flush();
                if quote_depth > 0 {
                    out.push(&"│ ".repeat(quote_depth), theme.md_quote_style);
                }
            }
            Event::Rule => {
                out.flush();
                out.lines
                    .push(Line::from(Span::styled("─".repeat(24), theme.separator_style)));
                out.end_block();
            }
            Event::TaskListMarker(checked) => {
                out.push(if checked { "[x] " } else { "[ ] " }, theme.md_list_marker_style);
            }
            Event::Html(html) | Event::InlineHtml(html) => out.push(&html, current(&style_stack)),
            _ => {}
        }
    }

    out.finish()
}

fn detab(line: &str) -> String {
    line.replace('\t', "    ")
}

fn plain_lines(text: &str, style: Style) -> Vec<Line<'static>> {
    text.lines()
        .map(|line| Line::from(Span::styled(line.to_string(), style)))
        .collect()
}

/// Build the wrapped display lines for the whole transcript.
///
/// User turns are right-aligned within roughly 80% of the width; assistant
/// turns use markdown when `markdown_enabled` is set.
pub fn build_display_lines(
    turns: &[ChatTurn],
    theme: &Theme,
    markdown_enabled: bool,
    width: u16,
) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (index, turn) in turns.iter().enumerate() {
        if index > 0 {
            lines.push(Line::from(""));
        }

        match turn.role {
            TranscriptRole::User => {
                let bubble_width = (width as usize * 4 / 5).max(20).min(width as usize) as u16;
                let mut body = plain_lines(&turn.text, theme.user_text_style);
                match body.first_mut() {
                    Some(first) => first
                        .spans
                        .insert(0, Span::styled(USER_PREFIX, theme.user_prefix_style)),
                    None => body.push(Line::from(Span::styled(USER_PREFIX, theme.user_prefix_style))),
                }
                for line in ScrollCalculator::prewrap_lines(&body, bubble_width) {
                    lines.push(line.alignment(Alignment::Right));
                }
                let rule_width = (width as usize / 3).max(3);
                lines.push(
                    Line::from(Span::styled("─".repeat(rule_width), theme.separator_style))
                        .alignment(Alignment::Center),
                );
            }
            TranscriptRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    ASSISTANT_PREFIX.trim_end().to_string(),
                    theme.assistant_prefix_style,
                )));
                let body = if markdown_enabled {
                    render_markdown(&turn.text, theme.assistant_text_style, theme)
                } else {
                    plain_lines(&turn.text, theme.assistant_text_style)
                };
                lines.extend(ScrollCalculator::prewrap_lines(&body, width));
            }
            TranscriptRole::AppInfo => {
                let body = plain_lines(&turn.text, theme.info_text_style);
                lines.extend(ScrollCalculator::prewrap_lines(&body, width));
            }
            TranscriptRole::AppError => {
                let mut body = plain_lines(&turn.text, theme.error_text_style);
                if let Some(first) = body.first_mut() {
                    first
                        .spans
                        .insert(0, Span::styled("✖ ", theme.error_text_style));
                }
                lines.extend(ScrollCalculator::prewrap_lines(&body, width));
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let theme = Theme::dark_default();
        let lines = render_markdown("First paragraph.\n\nSecond one.", Style::default(), &theme);
        assert_eq!(texts(&lines), vec!["First paragraph.", "", "Second one."]);
    }

    #[test]
    fn emphasis_and_inline_code_are_styled() {
        let theme = Theme::dark_default();
        let lines = render_markdown("Use **bold** and `code`", Style::default(), &theme);
        assert_eq!(lines.len(), 1);
        let bold = lines[0]
            .spans
            .iter()
            .find(|span| span.content == "bold")
            .expect("bold span");
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        let code = lines[0]
            .spans
            .iter()
            .find(|span| span.content == "code")
            .expect("code span");
        assert_eq!(code.style, theme.md_code_style);
    }

    #[test]
    fn lists_get_markers_and_numbers() {
        let theme = Theme::dark_default();
        let lines = render_markdown("- apples\n- pears\n\n3. three\n4. four", Style::default(), &theme);
        assert_eq!(
            texts(&lines),
            vec!["• apples", "• pears", "", "3. three", "4. four"]
        );
    }

    #[test]
    fn code_blocks_keep_their_lines() {
        let theme = Theme::dark_default();
        let lines = render_markdown("```rust\nfn main() {\n\tprintln!();\n}\n```", Style::default(), &theme);
        assert_eq!(
            texts(&lines),
            vec!["```rust", "  fn main() {", "      println!();", "  }"]
        );
    }

    #[test]
    fn headings_keep_their_level_marker() {
        let theme = Theme::dark_default();
        let lines = render_markdown("## Title\n\nBody", Style::default(), &theme);
        assert_eq!(texts(&lines), vec!["## Title", "", "Body"]);
        assert_eq!(lines[0].spans[0].style, theme.md_heading_style);
    }

    #[test]
    fn transcript_lines_align_user_right_and_prefix_errors() {
        let theme = Theme::dark_default();
        let turns = vec![
            ChatTurn::user("hello"),
            ChatTurn::assistant("Hi **there**"),
            ChatTurn::app_error("Request failed"),
        ];
        let lines = build_display_lines(&turns, &theme, true, 60);
        let rendered = texts(&lines);

        assert_eq!(rendered[0], "You: hello");
        assert_eq!(lines[0].alignment, Some(Alignment::Right));
        assert!(rendered.contains(&"AI:".to_string()));
        assert!(rendered.contains(&"Hi there".to_string()));
        assert_eq!(rendered.last().map(String::as_str), Some("✖ Request failed"));
    }

    #[test]
    fn plain_mode_shows_raw_markdown() {
        let theme = Theme::dark_default();
        let turns = vec![ChatTurn::assistant("Hi **there**")];
        let lines = build_display_lines(&turns, &theme, false, 60);
        assert_eq!(texts(&lines), vec!["AI:", "Hi **there**"]);
    }

    #[test]
    fn long_assistant_lines_wrap_to_width() {
        let theme = Theme::dark_default();
        let turns = vec![ChatTurn::assistant("alpha beta gamma delta")];
        let lines = build_display_lines(&turns, &theme, false, 11);
        assert_eq!(texts(&lines), vec!["AI:", "alpha beta ", "gamma delta"]);
    }
}
