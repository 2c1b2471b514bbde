use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

/// Handles wrapping and scroll-offset math for the transcript view.
///
/// Lines are wrapped here instead of by ratatui so the renderer and the
/// scroll bounds always agree on the number of visual rows.
pub struct ScrollCalculator;

/// Accumulates styled runs for one visual row.
struct RowBuilder {
    spans: Vec<Span<'static>>,
    width: usize,
}

impl RowBuilder {
    fn new() -> Self {
        Self {
            spans: Vec::new(),
            width: 0,
        }
    }

    fn push(&mut self, style: Style, text: &str, width: usize) {
        if text.is_empty() {
            return;
        }
        self.width += width;
        if let Some(last) = self.spans.last_mut() {
            if last.style == style {
                last.content.to_mut().push_str(text);
                return;
            }
        }
        self.spans.push(Span::styled(text.to_string(), style));
    }

    fn take(&mut self, alignment: Option<Alignment>) -> Line<'static> {
        self.width = 0;
        let mut line = Line::from(std::mem::take(&mut self.spans));
        line.alignment = alignment;
        line
    }
}

impl ScrollCalculator {
    /// Wrap `lines` to `width` columns at word boundaries, breaking words
    /// longer than a full row. Styles and line alignment are preserved.
    pub fn prewrap_lines(lines: &[Line<'_>], width: u16) -> Vec<Line<'static>> {
        let width = width as usize;
        let mut out: Vec<Line<'static>> = Vec::with_capacity(lines.len());

        for line in lines {
            if width == 0 || line.spans.is_empty() {
                let spans: Vec<Span<'static>> = line
                    .spans
                    .iter()
                    .map(|span| Span::styled(span.content.to_string(), span.style))
                    .collect();
                let mut owned = Line::from(spans);
                owned.alignment = line.alignment;
                out.push(owned);
                continue;
            }

            let start = out.len();
            let mut row = RowBuilder::new();
            // Pending word as (text, style, width) runs
            let mut word: Vec<(String, Style, usize)> = Vec::new();
            let mut word_width = 0usize;

            let flush_word =
                |row: &mut RowBuilder,
                 out: &mut Vec<Line<'static>>,
                 word: &mut Vec<(String, Style, usize)>,
                 word_width: &mut usize| {
                    if *word_width == 0 {
                        return;
                    }
                    if row.width > 0 && row.width + *word_width > width {
                        out.push(row.take(line.alignment));
                    }
                    for (text, style, _) in word.drain(..) {
                        for ch in text.chars() {
                            let ch_width = ch.width().unwrap_or(0);
                            if row.width > 0 && row.width + ch_width > width {
                                out.push(row.take(line.alignment));
                            }
                            let mut buf = [0u8; 4];
                            row.push(style, ch.encode_utf8(&mut buf), ch_width);
                        }
                    }
                    *word_width = 0;
                };

            for span in &line.spans {
                for ch in span.content.chars() {
                    if ch == ' ' {
                        flush_word(&mut row, &mut out, &mut word, &mut word_width);
                        if row.width < width {
                            row.push(span.style, " ", 1);
                        } else {
                            out.push(row.take(line.alignment));
                        }
                        continue;
                    }

                    let ch_width = ch.width().unwrap_or(0);
                    match word.last_mut() {
                        Some((text, style, run_width)) if *style == span.style => {
                            text.push(ch);
                            *run_width += ch_width;
                        }
                        _ => word.push((ch.to_string(), span.style, ch_width)),
                    }
                    word_width += ch_width;
                }
            }

            flush_word(&mut row, &mut out, &mut word, &mut word_width);
            if !row.spans.is_empty() || out.len() == start {
                out.push(row.take(line.alignment));
            }
        }

        out
    }

    /// Largest valid scroll offset for `total_lines` rows in a view of
    /// `available_height` rows.
    pub fn max_scroll_offset(total_lines: usize, available_height: u16) -> u16 {
        let total = u16::try_from(total_lines).unwrap_or(u16::MAX);
        total.saturating_sub(available_height)
    }
}
