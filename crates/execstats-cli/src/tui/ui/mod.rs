mod bar_chart;
mod cards;
mod footer;
mod header;
mod intervals;
mod overview;
pub mod spinner;
mod widgets;

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::app::App;

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    if area.width == 0 || area.height == 0 {
        return;
    }

    app.clear_click_areas();
    app.handle_resize(area.width, area.height);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(5),
        ])
        .split(area);

    header::render(frame, app, chunks[0]);

    if !app.has_data {
        match app.error.clone() {
            Some(error) if !app.loading => render_error(frame, app, chunks[1], &error),
            _ => render_loading(frame, app, chunks[1]),
        }
    } else if app.report.is_empty() {
        render_empty(frame, app, chunks[1]);
    } else {
        overview::render(frame, app, chunks[1]);
    }

    footer::render(frame, app, chunks[2]);
}

fn centered_panel(frame: &mut Frame, app: &App, area: Rect) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .style(Style::default().bg(app.theme.background));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(3),
            Constraint::Percentage(40),
        ])
        .split(inner)[1]
}

fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
    let center = centered_panel(frame, app, area);

    let mut spans = spinner::get_scanner_spans(app.spinner_frame);
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        spinner::phase_message(spinner::LoadPhase::Fetching),
        Style::default().fg(app.theme.muted),
    ));

    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    frame.render_widget(paragraph, center);
}

fn render_error(frame: &mut Frame, app: &App, area: Rect, error: &str) {
    let center = centered_panel(frame, app, area);

    let lines = vec![
        Line::from(Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )),
        Line::from(Span::styled(
            "Press 'r' to try again.",
            Style::default().fg(app.theme.muted),
        )),
    ];
    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, center);
}

fn render_empty(frame: &mut Frame, app: &App, area: Rect) {
    let center = centered_panel(frame, app, area);

    let options = &app.report.options;
    let lines = vec![
        Line::from(Span::styled(
            "No executions for this selection.",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} · {}", options.view.title(), options.category),
            Style::default().fg(app.theme.muted),
        )),
    ];
    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, center);
}
