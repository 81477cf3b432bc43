use execstats_core::DataView;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Tabs};

use crate::tui::app::{App, ClickAction};

const TITLE: &str = " execstats ";
const DIVIDER_WIDTH: u16 = 3;

fn tab_name(view: DataView, short: bool) -> &'static str {
    if short {
        match view {
            DataView::Public => "Public",
            DataView::Total => "All",
            DataView::Token => "Token",
        }
    } else {
        view.title()
    }
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let is_very_narrow = app.is_very_narrow();
    let current = app.report.options.view;

    let titles: Vec<Line> = DataView::all()
        .iter()
        .map(|view| {
            let style = if *view == current {
                Style::default()
                    .fg(app.theme.highlight)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(app.theme.muted)
            };
            Line::from(Span::styled(tab_name(*view, is_very_narrow), style))
        })
        .collect();

    let selected = DataView::all()
        .iter()
        .position(|view| *view == current)
        .unwrap_or(0);

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border))
        .title(Span::styled(
            TITLE,
            Style::default()
                .fg(app.theme.highlight)
                .add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Left)
        .style(Style::default().bg(app.theme.background));

    if !app.is_narrow() {
        block = block.title_top(
            Line::from(Span::styled(
                format!(" {} ", app.report.options.timezone.name()),
                Style::default().fg(app.theme.muted),
            ))
            .right_aligned(),
        );
    }

    let tabs = Tabs::new(titles)
        .block(block)
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(app.theme.highlight)
                .add_modifier(Modifier::BOLD),
        )
        .divider(Span::styled(" │ ", Style::default().fg(app.theme.border)));

    frame.render_widget(tabs, area);

    register_view_click_areas(app, area);
}

fn register_view_click_areas(app: &mut App, area: Rect) {
    let is_very_narrow = app.is_very_narrow();
    // Tabs pads each title with one space on both sides
    let mut x = area.x + 1;
    let y = area.y + 1;

    for view in DataView::all() {
        let width = tab_name(*view, is_very_narrow).chars().count() as u16 + 2;
        app.add_click_area(Rect::new(x, y, width, 1), ClickAction::View(*view));
        x += width + DIVIDER_WIDTH;
    }
}
