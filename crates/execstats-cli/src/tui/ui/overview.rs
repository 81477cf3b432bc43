use execstats_core::{format_count, format_day, format_weekday, IntervalFocus};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::bar_chart::{render_bar_chart, BarData};
use super::widgets::truncate;
use super::{cards, intervals};
use crate::tui::app::App;

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    cards::render(frame, app, rows[0]);

    if app.is_narrow() {
        let body = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[1]);
        intervals::render(frame, app, body[0]);
        render_days(frame, app, body[1]);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(60), Constraint::Min(30)])
        .split(rows[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(states_height(app))])
        .split(columns[0]);
    intervals::render(frame, app, left[0]);
    if app.report.options.view.shows_states() {
        render_states(frame, app, left[1]);
    }

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[1]);
    render_days(frame, app, right[0]);
    render_hours(frame, app, right[1]);
}

fn panel<'a>(app: &App, title: String) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(app.theme.accent)
                .add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(app.theme.background))
}

fn render_days(frame: &mut Frame, app: &App, area: Rect) {
    let Some(focus) = app.focus.as_ref() else {
        return;
    };

    let block = panel(app, format!(" {} by day ", focus.summary.label));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let busiest = focus.days.iter().map(|d| d.count).max().unwrap_or(0);
    let data: Vec<BarData> = focus
        .days
        .iter()
        .map(|day| BarData {
            label: if app.is_very_narrow() {
                format_day(day.date)
            } else {
                format!("{} {}", format_weekday(day.weekday), format_day(day.date))
            },
            value: day.count,
            highlighted: day.count == busiest,
        })
        .collect();

    let title = format!("Executions per active day (peak {})", format_count(busiest));
    render_bar_chart(frame, app, inner, &title, &data);
}

fn render_hours(frame: &mut Frame, app: &App, area: Rect) {
    let Some(focus) = app.focus.as_ref() else {
        return;
    };

    let block = panel(app, format!(" {} by hour ", focus.summary.label));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let data = hourly_bars(focus);
    render_bar_chart(frame, app, inner, "Executions per hour of day", &data);
}

fn hourly_bars(focus: &IntervalFocus) -> Vec<BarData> {
    focus
        .hourly
        .iter()
        .enumerate()
        .map(|(hour, count)| BarData {
            label: format!("{:02}h", hour),
            value: *count,
            highlighted: false,
        })
        .collect()
}

fn states_height(app: &App) -> u16 {
    if !app.report.options.view.shows_states() {
        return 0;
    }
    let states = app
        .focus
        .as_ref()
        .map_or(0, |focus| focus.categories.len());
    (states.min(8) as u16) + 2
}

fn render_states(frame: &mut Frame, app: &App, area: Rect) {
    let Some(focus) = app.focus.as_ref() else {
        return;
    };

    let block = panel(app, format!(" {} by state ", focus.summary.label));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let total = focus.summary.total.max(1);
    let bar_width = inner.width.saturating_sub(30) as u64;

    let lines: Vec<Line> = focus
        .categories
        .iter()
        .take(inner.height as usize)
        .map(|state| {
            let filled = (state.count * bar_width / total) as usize;
            Line::from(vec![
                Span::styled(
                    format!("{:<16}", truncate(&state.category, 15)),
                    Style::default().fg(app.theme.foreground),
                ),
                Span::styled(
                    format!("{:>8} ", format_count(state.count)),
                    Style::default().fg(app.theme.muted),
                ),
                Span::styled("■".repeat(filled), Style::default().fg(app.theme.highlight)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}
