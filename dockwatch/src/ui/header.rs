//! Top header with the backend target, log sink state and the last error.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

pub struct HeaderInfo<'a> {
    pub target: &'a str,
    pub containers: usize,
    pub logs: &'a str,
    pub status: Option<&'a str>,
}

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, h: &HeaderInfo<'_>) {
    let mut spans = vec![Span::raw(format!(
        "dockwatch @ {} | {} containers | logs: {}",
        h.target, h.containers, h.logs
    ))];
    if let Some(status) = h.status {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(status.to_string(), Style::default().fg(Color::Red)));
    }
    spans.push(Span::styled(
        "  (q quit, enter logs, d deploy, c clear, m minimize)",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(
        Block::default().title(Line::from(spans)).borders(Borders::BOTTOM),
        area,
    );
}
