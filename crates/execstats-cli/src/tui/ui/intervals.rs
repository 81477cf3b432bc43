use execstats_core::{format_count, format_day};
use ratatui::prelude::*;
use ratatui::widgets::{
    Block, Borders, Cell, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
};

use super::widgets::delta_span;
use crate::tui::app::{App, ClickAction};

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let options = &app.report.options;
    let title = format!(" Intervals · {} · {} ", options.span, options.direction);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(app.theme.accent)
                .add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(app.theme.background));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible_height = inner.height.saturating_sub(1) as usize;
    app.set_visible_rows(visible_height);

    let total_rows = app.report.intervals.len();
    let start = app.scroll_offset.min(total_rows);
    let end = (start + visible_height).min(total_rows);
    if start >= end {
        return;
    }

    let is_narrow = app.is_narrow();
    let selected_index = app.selected_index;
    let theme_accent = app.theme.accent;
    let theme_selection = app.theme.selection;
    let theme_muted = app.theme.muted;

    let header_cells = if is_narrow {
        vec!["Interval", "Execs"]
    } else {
        vec!["Interval", "Dates", "Days", "Executions", "Change"]
    };
    let header = Row::new(header_cells)
        .style(
            Style::default()
                .fg(theme_accent)
                .add_modifier(Modifier::BOLD),
        )
        .height(1);

    let rows: Vec<Row> = app.report.summaries[start..end]
        .iter()
        .enumerate()
        .map(|(i, summary)| {
            let idx = i + start;
            let marker = if idx == selected_index { "▶ " } else { "  " };
            let label = Cell::from(format!("{}{}", marker, summary.label))
                .style(Style::default().add_modifier(Modifier::BOLD));
            let count = Cell::from(format_count(summary.total));

            let cells = if is_narrow {
                vec![label, count]
            } else {
                vec![
                    label,
                    Cell::from(format!(
                        "{} - {}",
                        format_day(summary.start),
                        format_day(summary.end)
                    ))
                    .style(Style::default().fg(theme_muted)),
                    Cell::from(summary.date_count.to_string()),
                    count,
                    Cell::from(delta_span(summary.metrics.delta_percent, theme_muted)),
                ]
            };

            let row_style = if idx == selected_index {
                Style::default().bg(theme_selection)
            } else if idx % 2 == 1 {
                Style::default().bg(Color::Rgb(20, 24, 30))
            } else {
                Style::default()
            };

            Row::new(cells).style(row_style).height(1)
        })
        .collect();

    for i in start..end {
        let y = inner.y + 1 + (i - start) as u16;
        app.add_click_area(
            Rect::new(inner.x, y, inner.width, 1),
            ClickAction::Interval(i),
        );
    }

    let widths = if is_narrow {
        vec![Constraint::Percentage(60), Constraint::Percentage(40)]
    } else {
        vec![
            Constraint::Length(14),
            Constraint::Length(15),
            Constraint::Length(5),
            Constraint::Length(11),
            Constraint::Min(10),
        ]
    };

    let table = Table::new(rows, widths).header(header);
    frame.render_widget(table, inner);

    if total_rows > visible_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));

        let mut scrollbar_state = ScrollbarState::new(total_rows).position(app.scroll_offset);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                horizontal: 0,
                vertical: 1,
            }),
            &mut scrollbar_state,
        );
    }
}
