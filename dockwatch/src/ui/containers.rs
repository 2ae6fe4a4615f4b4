//! Container table with per-cell coloring, a selection cursor and a scrollbar.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::style::Modifier;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::history::{memory_percent, MetricsAggregator};
use crate::ui::theme::{SB_ARROW, SB_THUMB, SB_TRACK};
use crate::ui::util::{human_opt, truncate_middle};

const COLS: [Constraint; 6] = [
    Constraint::Percentage(30), // Name
    Constraint::Length(8),      // CPU %
    Constraint::Length(20),     // Mem used / limit
    Constraint::Length(8),      // Mem %
    Constraint::Length(10),     // Net Rx
    Constraint::Length(10),     // Net Tx
];

/// Draws the table and returns the scroll offset actually used, which keeps
/// the selected row in view.
pub fn draw_containers(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    stats: &MetricsAggregator,
    selected: usize,
    scroll_offset: usize,
) -> usize {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Containers ({})", stats.len()));
    f.render_widget(block, area);

    // Inner area and content area (reserve 2 columns for scrollbar)
    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    if inner.height < 2 || inner.width < 3 {
        return scroll_offset;
    }
    let content = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.saturating_sub(2),
        height: inner.height,
    };

    let names: Vec<&str> = stats.entities().collect();
    let total_rows = names.len();
    let viewport_rows = content.height.saturating_sub(1) as usize;
    let offset = keep_in_view(selected, scroll_offset, viewport_rows, total_rows);
    let name_width = (content.width as usize * 30 / 100).max(4);

    let rows = names
        .iter()
        .enumerate()
        .skip(offset)
        .take(viewport_rows)
        .map(|(i, name)| {
            let latest = stats.latest(name);
            let cpu = latest.and_then(|s| s.cpu_percent);
            let mem_pct = latest.and_then(memory_percent);

            let cpu_fg = match cpu.unwrap_or(0.0) {
                x if x < 25.0 => Color::Green,
                x if x < 60.0 => Color::Yellow,
                _ => Color::Red,
            };
            let mem_fg = match mem_pct.unwrap_or(0.0) {
                x if x < 50.0 => Color::Blue,
                x if x < 80.0 => Color::Magenta,
                _ => Color::Red,
            };
            let mem = format!(
                "{} / {}",
                human_opt(latest.and_then(|s| s.memory_used_bytes)),
                human_opt(latest.and_then(|s| s.memory_limit_bytes))
            );

            let row_style = if i == selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(truncate_middle(name, name_width)),
                Cell::from(fmt_pct(cpu)).style(Style::default().fg(cpu_fg)),
                Cell::from(mem),
                Cell::from(fmt_pct(mem_pct)).style(Style::default().fg(mem_fg)),
                Cell::from(human_opt(latest.and_then(|s| s.network_rx_bytes))),
                Cell::from(human_opt(latest.and_then(|s| s.network_tx_bytes))),
            ])
            .style(row_style)
        });

    let header = Row::new(vec!["Name", "CPU %", "Memory", "Mem %", "Net Rx", "Net Tx"]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    let table = Table::new(rows, COLS.to_vec())
        .header(header)
        .column_spacing(1);
    f.render_widget(table, content);

    let scroll_area = Rect {
        x: inner.x + inner.width.saturating_sub(1),
        y: inner.y,
        width: 1,
        height: inner.height,
    };
    draw_scrollbar(f, scroll_area, total_rows, viewport_rows, offset);
    offset
}

fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:>5.1}", v.clamp(0.0, 100.0)),
        None => "    -".into(),
    }
}

/// Smallest change to `offset` that keeps `selected` inside the viewport.
pub fn keep_in_view(selected: usize, offset: usize, viewport: usize, total: usize) -> usize {
    if viewport == 0 {
        return 0;
    }
    let max_off = total.saturating_sub(viewport);
    let offset = if selected < offset {
        selected
    } else if selected >= offset + viewport {
        selected + 1 - viewport
    } else {
        offset
    };
    offset.min(max_off)
}

fn draw_scrollbar(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    total_rows: usize,
    viewport_rows: usize,
    offset: usize,
) {
    if area.height < 3 {
        return;
    }
    let track = (area.height - 2) as usize;
    let total = total_rows.max(1);
    let view = viewport_rows.clamp(1, total);
    let max_off = total.saturating_sub(view);

    let thumb_len = (track * view).div_ceil(total).max(1).min(track);
    let thumb_top = if max_off == 0 {
        0
    } else {
        ((track - thumb_len) * offset.min(max_off) + max_off / 2) / max_off
    };

    // Build lines: top arrow, track (with thumb), bottom arrow
    let mut lines: Vec<Line> = Vec::with_capacity(area.height as usize);
    lines.push(Line::from(Span::styled("▲", Style::default().fg(SB_ARROW))));
    for i in 0..track {
        if i >= thumb_top && i < thumb_top + thumb_len {
            lines.push(Line::from(Span::styled("█", Style::default().fg(SB_THUMB))));
        } else {
            lines.push(Line::from(Span::styled("│", Style::default().fg(SB_TRACK))));
        }
    }
    lines.push(Line::from(Span::styled("▼", Style::default().fg(SB_ARROW))));
    f.render_widget(Paragraph::new(lines), area);
}

/// Moves the selection with Up/Down/PageUp/PageDown/Home/End. Returns whether
/// the key was consumed.
pub fn containers_handle_key(selected: &mut usize, key: KeyEvent, total: usize, page: usize) -> bool {
    let last = total.saturating_sub(1);
    let page = page.max(1);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => *selected = selected.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => *selected = (*selected + 1).min(last),
        KeyCode::PageUp => *selected = selected.saturating_sub(page),
        KeyCode::PageDown => *selected = (*selected + page).min(last),
        KeyCode::Home => *selected = 0,
        KeyCode::End => *selected = last,
        _ => return false,
    }
    true
}
