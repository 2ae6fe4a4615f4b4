//! Multi-series time charts for container stats.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
};

use crate::history::ChartSeries;
use crate::ui::theme::SERIES;

/// Draws `series` against time. Series are grouped by `group`: series `i`
/// takes colour `i % group`, and every group after the first is dotted, so
/// paired Rx/Tx lines of one container share a colour.
pub fn draw_chart(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    unit: &str,
    series: &[ChartSeries],
    group: usize,
) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let newest = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.0))
        .fold(f64::NEG_INFINITY, f64::max);
    if !newest.is_finite() {
        f.render_widget(block.title_bottom("waiting for stats..."), area);
        return;
    }

    // x relative to the newest sample, in seconds (<= 0)
    let shifted: Vec<Vec<(f64, f64)>> = series
        .iter()
        .map(|s| s.points.iter().map(|&(x, y)| (x - newest, y)).collect())
        .collect();
    let oldest = shifted
        .iter()
        .flat_map(|pts| pts.iter().map(|p| p.0))
        .fold(0.0_f64, f64::min)
        .min(-1.0);
    let peak = shifted
        .iter()
        .flat_map(|pts| pts.iter().map(|p| p.1))
        .fold(0.0_f64, f64::max);
    let top = if peak > 0.0 { peak * 1.1 } else { 1.0 };

    let group = group.max(1);
    let datasets: Vec<Dataset> = series
        .iter()
        .zip(shifted.iter())
        .enumerate()
        .map(|(i, (s, pts))| {
            let color: Color = SERIES[(i % group) % SERIES.len()];
            let marker = if i >= group { Marker::Dot } else { Marker::Braille };
            Dataset::default()
                .name(s.name.clone())
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(pts)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([oldest, 0.0])
                .labels(vec![
                    Span::raw(format!("{:.0}s", oldest)),
                    Span::raw("now"),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, top])
                .labels(vec![
                    Span::raw(format!("0{unit}")),
                    Span::raw(format!("{:.1}{unit}", top)),
                ]),
        );
    f.render_widget(chart, area);
}
