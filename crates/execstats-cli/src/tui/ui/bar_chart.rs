use ratatui::prelude::*;

use super::widgets::{format_compact, intensity};
use crate::tui::app::App;

/// 8-level block characters for sub-cell precision
const BLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One column of a bar chart.
#[derive(Debug, Clone)]
pub struct BarData {
    pub label: String,
    pub value: u64,
    pub highlighted: bool,
}

/// Column chart with a y-axis maximum, an x-axis, and a few x labels.
///
/// Bars are shaded by their share of the busiest bar.
pub fn render_bar_chart(frame: &mut Frame, app: &App, area: Rect, title: &str, data: &[BarData]) {
    if data.is_empty() {
        return;
    }

    let is_very_narrow = app.is_very_narrow();
    let y_label_width: u16 = if is_very_narrow { 5 } else { 7 };

    let chart_width = area.width.saturating_sub(y_label_width) as usize;
    let chart_height = area.height.saturating_sub(3) as usize;
    if chart_width == 0 || chart_height == 0 {
        return;
    }

    let max = data.iter().map(|d| d.value).max().unwrap_or(0);
    let max_value = (max as f64).max(1.0);
    let bar_count = data.len();
    let right = area.x + area.width;

    let buf = frame.buffer_mut();

    let column_span = |index: usize| -> (usize, usize) {
        let start = (index * chart_width) / bar_count;
        let end = ((index + 1) * chart_width) / bar_count;
        (start, (end - start).max(1))
    };

    let put = |buf: &mut Buffer, x: u16, y: u16, ch: char, style: Style| {
        if x < right && y < area.y + area.height {
            buf[(x, y)].set_char(ch).set_style(style);
        }
    };

    let title_style = Style::default()
        .fg(app.theme.foreground)
        .add_modifier(Modifier::BOLD);
    for (i, ch) in title.chars().enumerate() {
        put(buf, area.x + y_label_width + i as u16, area.y, ch, title_style);
    }

    let muted = Style::default().fg(app.theme.muted);

    for row_from_bottom in (0..chart_height).rev() {
        let y = area.y + 1 + (chart_height - 1 - row_from_bottom) as u16;

        let y_label = if row_from_bottom == chart_height - 1 {
            format_compact(max)
        } else {
            String::new()
        };
        let padded = format!("{:>width$}│", y_label, width = (y_label_width - 1) as usize);
        for (i, ch) in padded.chars().enumerate().take(y_label_width as usize) {
            put(buf, area.x + i as u16, y, ch, muted);
        }

        let row_top = ((row_from_bottom + 1) as f64 / chart_height as f64) * max_value;
        let row_bottom = (row_from_bottom as f64 / chart_height as f64) * max_value;

        for (index, bar) in data.iter().enumerate() {
            let value = bar.value as f64;
            if value <= row_bottom {
                continue;
            }

            let ch = if value >= row_top {
                BLOCKS[8]
            } else {
                let ratio = (value - row_bottom) / (row_top - row_bottom);
                BLOCKS[(ratio * 8.0).floor().clamp(1.0, 8.0) as usize]
            };
            let color = if bar.highlighted {
                app.theme.highlight
            } else {
                app.theme.colors[intensity(bar.value, max).max(1)]
            };

            let (start, width) = column_span(index);
            let x0 = area.x + y_label_width + start as u16;
            // Leave a gap between wide bars
            let drawn = if width > 2 { width - 1 } else { width };
            for dx in 0..drawn {
                put(buf, x0 + dx as u16, y, ch, Style::default().fg(color));
            }
        }
    }

    let axis_y = area.y + 1 + chart_height as u16;
    let zero = format!("{:>width$}│", "0", width = (y_label_width - 1) as usize);
    for (i, ch) in zero.chars().enumerate().take(y_label_width as usize) {
        put(buf, area.x + i as u16, axis_y, ch, muted);
    }
    for x in (area.x + y_label_width)..right {
        put(buf, x, axis_y, '─', muted);
    }

    // First, middle and last labels, skipping any that would overlap
    let label_y = axis_y + 1;
    let mut picks = vec![0, bar_count / 2, bar_count - 1];
    picks.dedup();
    let mut next_free = area.x + y_label_width;
    for index in picks {
        let label = &data[index].label;
        let (start, width) = column_span(index);
        let centered = (start + width / 2).saturating_sub(label.chars().count() / 2);
        let x = (area.x + y_label_width + centered as u16).max(next_free);
        if x + label.chars().count() as u16 > right {
            continue;
        }
        for (j, ch) in label.chars().enumerate() {
            put(buf, x + j as u16, label_y, ch, muted);
        }
        next_free = x + label.chars().count() as u16 + 1;
    }
}
