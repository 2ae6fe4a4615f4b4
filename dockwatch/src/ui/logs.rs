//! Read-only log terminal: the tail of the scrollback, soft-wrapped.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ansi::{char_width, spans};
use crate::scrollback::Scrollback;

pub fn draw_logs(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    scrollback: &Scrollback,
    title: &str,
    minimized: bool,
) {
    if minimized {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{title} (minimized, press 'm' to restore)"))
            .border_style(Style::default().fg(Color::DarkGray));
        f.render_widget(block, area);
        return;
    }

    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let geometry = scrollback.geometry();
    let cols = geometry.cols as usize;
    let rows = geometry.rows as usize;
    if cols == 0 || rows == 0 {
        f.render_widget(block, area);
        return;
    }

    let mut screen: Vec<Line<'static>> = scrollback
        .visible()
        .into_iter()
        .flat_map(|l| wrap_line(l, cols))
        .collect();
    // follow the tail
    let overflow = screen.len().saturating_sub(rows);
    screen.drain(..overflow);

    f.render_widget(Paragraph::new(screen).block(block), area);
}

/// Character-wraps one line at `cols` display columns, keeping SGR styling.
pub fn wrap_line(line: &str, cols: usize) -> Vec<Line<'static>> {
    let cols = cols.max(1);
    let mut rows = Vec::new();
    let mut cur: Vec<Span<'static>> = Vec::new();
    let mut width = 0;
    for span in spans(line) {
        let style = span.style;
        let mut buf = String::new();
        for ch in span.content.chars() {
            let w = char_width(ch);
            if width + w > cols && width > 0 {
                if !buf.is_empty() {
                    cur.push(Span::styled(std::mem::take(&mut buf), style));
                }
                rows.push(Line::from(std::mem::take(&mut cur)));
                width = 0;
            }
            buf.push(ch);
            width += w;
        }
        if !buf.is_empty() {
            cur.push(Span::styled(buf, style));
        }
    }
    rows.push(Line::from(cur));
    rows
}
