use execstats_core::{format_count, format_currency};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::spinner::{get_scanner_spans, phase_message, LoadPhase};
use crate::tui::app::{App, ClickAction};

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .style(Style::default().bg(app.theme.background));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // filters + totals, help text, status
    let row_constraints = match inner.height {
        0 => return,
        1 => vec![Constraint::Length(1)],
        2 => vec![Constraint::Length(1), Constraint::Length(1)],
        _ => vec![
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ],
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(inner);

    render_main_row(frame, app, rows[0]);

    if rows.len() >= 2 {
        render_help_row(frame, app, rows[1]);
    }

    if rows.len() >= 3 {
        render_status_row(frame, app, rows[2]);
    }
}

fn render_main_row(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_filter_badges(frame, app, chunks[0]);

    let is_very_narrow = app.is_very_narrow();
    let overall = &app.report.overall;

    let mut right_spans = vec![Span::styled(
        format_count(overall.total_count),
        Style::default().fg(Color::Cyan),
    )];
    if !is_very_narrow {
        right_spans.push(Span::styled(
            " executions",
            Style::default().fg(app.theme.muted),
        ));
    }
    right_spans.push(Span::styled(" | ", Style::default().fg(app.theme.muted)));
    right_spans.push(Span::styled(
        format_currency(overall.derived_currency),
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    ));
    if !is_very_narrow {
        right_spans.push(Span::styled(
            format!(" ({} intervals)", app.report.intervals.len()),
            Style::default().fg(app.theme.muted),
        ));
    }

    let right_para = Paragraph::new(Line::from(right_spans)).alignment(Alignment::Right);
    frame.render_widget(right_para, chunks[1]);
}

fn render_filter_badges(frame: &mut Frame, app: &mut App, area: Rect) {
    let options = &app.report.options;
    let badges = [
        ("s", options.category.to_string(), ClickAction::NextState),
        ("i", options.span.to_string(), ClickAction::NextSpan),
        ("d", options.direction.to_string(), ClickAction::ToggleDirection),
    ];

    let mut spans: Vec<Span> = Vec::new();
    let mut x_offset = area.x;
    let mut areas = Vec::with_capacity(badges.len());

    for (key, value, action) in badges {
        let badge_text = format!("[{}:{}]", key, value);
        let badge_width = badge_text.chars().count() as u16;

        spans.push(Span::styled(
            badge_text,
            Style::default().fg(app.theme.highlight),
        ));
        spans.push(Span::raw(" "));

        areas.push((Rect::new(x_offset, area.y, badge_width, 1), action));
        x_offset += badge_width + 1;
    }

    for (rect, action) in areas {
        app.add_click_area(rect, action);
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help_row(frame: &mut Frame, app: &App, area: Rect) {
    let muted = Style::default().fg(app.theme.muted);

    let spans = if app.is_very_narrow() {
        vec![
            Span::styled("↑↓·tab·s·i·d·", muted),
            Span::styled("[p]", Style::default().fg(Color::Magenta)),
            Span::styled("·", muted),
            Span::styled("[r]", Style::default().fg(Color::Yellow)),
            Span::styled("·q", muted),
        ]
    } else {
        vec![
            Span::styled("↑↓ interval • ←→/tab view • esc latest • ", muted),
            Span::styled(
                format!("[p:{}]", app.theme.name.as_str()),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw(" "),
            Span::styled(
                if app.auto_refresh {
                    format!("[R:auto {}s]", app.auto_refresh_interval.as_secs())
                } else {
                    "[R:auto off]".to_string()
                },
                Style::default().fg(if app.auto_refresh {
                    Color::Green
                } else {
                    app.theme.muted
                }),
            ),
            Span::styled(" [-/+ interval] • ", muted),
            Span::styled("[r:refresh]", Style::default().fg(Color::Yellow)),
            Span::styled(" • q quit", muted),
        ]
    };

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans: Vec<Span> = Vec::new();

    if app.loading {
        spans.extend(get_scanner_spans(app.spinner_frame));
        spans.push(Span::raw(" "));
        let phase = if app.has_data {
            LoadPhase::Refreshing
        } else {
            LoadPhase::Fetching
        };
        spans.push(Span::styled(
            phase_message(phase),
            Style::default().fg(app.theme.muted),
        ));
    } else if let Some(ref msg) = app.status_message {
        let color = if msg.starts_with("Error") {
            Color::Red
        } else {
            Color::Green
        };
        spans.push(Span::styled(
            msg.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    } else if let Some(ref error) = app.error {
        spans.push(Span::styled(
            format!("Last refresh failed: {}", error),
            Style::default().fg(Color::Red),
        ));
    } else {
        let ago = match app.last_fetch {
            Some(fetched_at) => {
                let secs = (chrono::Utc::now() - fetched_at).num_seconds().max(0);
                if secs < 60 {
                    format!("{}s ago", secs)
                } else if secs < 3600 {
                    format!("{}m ago", secs / 60)
                } else {
                    format!("{}h ago", secs / 3600)
                }
            }
            None => "never".to_string(),
        };
        spans.push(Span::styled(
            format!(
                "Data fetched {} • {} records, {} skipped",
                ago, app.report.received, app.report.dropped
            ),
            Style::default().fg(app.theme.muted),
        ));

        if app.auto_refresh {
            spans.push(Span::styled(
                format!(" • Auto: {}s", app.auto_refresh_interval.as_secs()),
                Style::default().fg(app.theme.muted),
            ));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
