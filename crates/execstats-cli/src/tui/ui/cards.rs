use execstats_core::{format_count, format_currency, format_day, format_hours};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::widgets::delta_span;
use crate::tui::app::App;

struct Card<'a> {
    title: String,
    value: String,
    value_color: Color,
    detail: Line<'a>,
}

fn render_card(frame: &mut Frame, app: &App, area: Rect, card: Card) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .title(Span::styled(
            format!(" {} ", card.title),
            Style::default().fg(app.theme.muted),
        ))
        .style(Style::default().bg(app.theme.background));

    let lines = vec![
        Line::from(Span::styled(
            card.value,
            Style::default()
                .fg(card.value_color)
                .add_modifier(Modifier::BOLD),
        )),
        card.detail,
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Totals for the selected interval next to the whole view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(focus) = app.focus.as_ref() else {
        return;
    };
    let summary = &focus.summary;
    let metrics = &summary.metrics;
    let overall = &app.report.overall;
    let muted = app.theme.muted;

    let range = format!("{} - {}", format_day(summary.start), format_day(summary.end));

    let mut cards = vec![
        Card {
            title: format!("{} · {}", summary.label, range),
            value: format!("{} executions", format_count(metrics.total_count)),
            value_color: app.theme.highlight,
            detail: Line::from(delta_span(metrics.delta_percent, muted)),
        },
        Card {
            title: "Hours saved".to_string(),
            value: format!("{} h", format_hours(metrics.derived_hours)),
            value_color: Color::Cyan,
            detail: Line::from(Span::styled(
                format!("{} active days", summary.date_count),
                Style::default().fg(muted),
            )),
        },
        Card {
            title: "Cost avoided".to_string(),
            value: format_currency(metrics.derived_currency),
            value_color: Color::Green,
            detail: Line::from(Span::styled(
                format!("{} up to here", format_count(summary.cumulative_total)),
                Style::default().fg(muted),
            )),
        },
        Card {
            title: app.report.options.view.title().to_string(),
            value: format!("{} executions", format_count(overall.total_count)),
            value_color: app.theme.foreground,
            detail: Line::from(Span::styled(
                format!(
                    "{} h · {}",
                    format_hours(overall.derived_hours),
                    format_currency(overall.derived_currency)
                ),
                Style::default().fg(muted),
            )),
        },
    ];

    if app.is_narrow() {
        // Interval and whole view only
        cards.remove(2);
        cards.remove(1);
    }

    let constraints: Vec<Constraint> = cards
        .iter()
        .map(|_| Constraint::Ratio(1, cards.len() as u32))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (card, column) in cards.into_iter().zip(columns.iter()) {
        render_card(frame, app, *column, card);
    }
}
