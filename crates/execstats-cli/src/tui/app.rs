use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use execstats_core::{
    build_report, CategoryFilter, DataView, Direction, FetchCache, IntervalFocus,
    IntervalSelector, RawRecord, Report, ReportOptions, Span,
};
use ratatui::layout::Rect;
use tokio::runtime::Runtime;

use super::settings::{clamp_refresh, Settings};
use super::themes::Theme;
use crate::loader::DataLoader;

const DEFAULT_REFRESH_SECS: u64 = 60;
const REFRESH_STEP_SECS: u64 = 10;
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for TUI initialization
pub struct TuiConfig {
    pub theme: Option<String>,
    pub refresh: Option<u64>,
    /// Flags that override the remembered dashboard settings.
    pub view: Option<DataView>,
    pub span: Option<Span>,
    pub direction: Option<Direction>,
    pub options: ReportOptions,
    pub loader: DataLoader,
}

pub struct ClickArea {
    pub rect: Rect,
    pub action: ClickAction,
}

#[derive(Debug, Clone)]
pub enum ClickAction {
    View(DataView),
    NextState,
    NextSpan,
    ToggleDirection,
    Interval(usize),
}

pub struct App {
    pub should_quit: bool,
    pub theme: Theme,
    pub settings: Settings,
    pub settings_path: Option<PathBuf>,

    runtime: Runtime,
    loader: DataLoader,
    fetch_cache: FetchCache<Vec<RawRecord>>,
    records: Vec<RawRecord>,

    pub report: Report,
    pub focus: Option<IntervalFocus>,
    pub has_data: bool,
    pub loading: bool,
    pending_refresh: Option<bool>,
    pub error: Option<String>,
    pub last_fetch: Option<DateTime<Utc>>,

    pub scroll_offset: usize,
    pub selected_index: usize,
    pub max_visible_items: usize,

    pub auto_refresh: bool,
    pub auto_refresh_interval: Duration,
    pub last_refresh: Instant,

    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    pub terminal_width: u16,
    pub terminal_height: u16,

    pub click_areas: Vec<ClickArea>,

    pub spinner_frame: usize,
}

impl App {
    pub fn new(config: TuiConfig) -> Result<Self> {
        let settings = Settings::load();
        let theme_name = config
            .theme
            .as_deref()
            .and_then(|name| name.parse().ok())
            .unwrap_or_else(|| settings.theme_name());

        let mut options = config.options;
        options.view = config.view.unwrap_or_else(|| settings.view());
        options.span = config.span.unwrap_or_else(|| settings.span());
        options.direction = config.direction.unwrap_or_else(|| settings.direction());

        let refresh_secs = match config.refresh {
            Some(0) => 0,
            Some(secs) => clamp_refresh(secs),
            None => settings.refresh_secs(),
        };
        let auto_refresh_interval = Duration::from_secs(if refresh_secs > 0 {
            refresh_secs
        } else {
            DEFAULT_REFRESH_SECS
        });

        let mut app = Self {
            should_quit: false,
            theme: Theme::from_name(theme_name),
            settings,
            settings_path: Settings::path(),
            runtime: Runtime::new()?,
            loader: config.loader,
            fetch_cache: FetchCache::new(),
            records: Vec::new(),
            report: build_report(&[], options),
            focus: None,
            has_data: false,
            loading: true,
            pending_refresh: Some(false),
            error: None,
            last_fetch: None,
            scroll_offset: 0,
            selected_index: 0,
            max_visible_items: 20,
            auto_refresh: refresh_secs > 0,
            auto_refresh_interval,
            last_refresh: Instant::now(),
            status_message: None,
            status_message_time: None,
            terminal_width: 80,
            terminal_height: 24,
            click_areas: Vec::new(),
            spinner_frame: 0,
        };

        // Paint the previous run's data while the first refresh runs
        if let Some((payload, fresh)) = app.loader.cached() {
            if fresh {
                app.fetch_cache =
                    FetchCache::with_payload(payload.records.clone(), payload.fetched_at);
            }
            app.last_fetch = Some(payload.fetched_at);
            app.apply_records(payload.records);
        }

        Ok(app)
    }

    /// Whether a refresh was requested since the last frame.
    pub fn has_pending_refresh(&self) -> bool {
        self.pending_refresh.is_some()
    }

    /// Run a requested refresh. Blocks until the fetch finishes.
    pub fn run_pending_refresh(&mut self) {
        if let Some(force) = self.pending_refresh.take() {
            self.refresh(force);
        }
    }

    fn request_refresh(&mut self, force: bool) {
        self.loading = true;
        self.pending_refresh = Some(self.pending_refresh.unwrap_or(false) || force);
    }

    /// Reload records, reusing the in-memory copy while it is younger than
    /// the TTL unless `force` is set. A failed load keeps the current report.
    pub fn refresh(&mut self, force: bool) {
        let ttl = if force {
            chrono::Duration::zero()
        } else {
            self.loader.ttl()
        };

        let loader = &mut self.loader;
        let result = self
            .runtime
            .block_on(
                self.fetch_cache
                    .get_or_refresh(Utc::now(), ttl, move || loader.fetch()),
            )
            .cloned();

        self.loading = false;
        self.last_refresh = Instant::now();

        match result {
            Ok(records) => {
                self.last_fetch = self.fetch_cache.entry().map(|entry| entry.fetched_at);
                self.error = None;
                let count = records.len();
                self.apply_records(records);
                self.set_status(&format!("Loaded {} records", count));
            }
            Err(e) => {
                tracing::warn!("refresh from {} failed: {}", self.loader.source().describe(), e);
                self.error = Some(e.to_string());
                self.set_status(&format!("Error: {}", e));
            }
        }
    }

    fn apply_records(&mut self, records: Vec<RawRecord>) {
        self.records = records;
        self.has_data = true;
        let options = self.report.options.clone();
        self.rebuild_with(options);
    }

    fn rebuild_with(&mut self, mut options: ReportOptions) {
        let anchor = self.focus.as_ref().map(|f| f.summary.start);

        let mut report = build_report(&self.records, options.clone());
        let missing = match &report.options.category {
            CategoryFilter::Only(state) if self.has_data && !report.categories.contains(state) => {
                Some(state.clone())
            }
            _ => None,
        };
        if let Some(state) = missing {
            options.category = CategoryFilter::All;
            report = build_report(&self.records, options);
            self.set_status(&format!("No executions for {} in this view", state));
        }

        self.report = report;
        self.select_near(anchor);
    }

    /// Keep the selection on the interval covering `anchor`, or fall back to
    /// the latest interval.
    fn select_near(&mut self, anchor: Option<NaiveDate>) {
        let index = anchor
            .and_then(|date| {
                self.report
                    .intervals
                    .iter()
                    .position(|i| i.start() <= date && date <= i.end())
            })
            .or_else(|| self.report.select(&IntervalSelector::Latest))
            .unwrap_or(0);
        self.select_interval(index);
    }

    pub fn select_interval(&mut self, index: usize) {
        let len = self.report.intervals.len();
        if len == 0 {
            self.selected_index = 0;
            self.scroll_offset = 0;
            self.focus = None;
            return;
        }

        self.selected_index = index.min(len - 1);
        self.focus = self.report.focus(self.selected_index);
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        let visible = self.max_visible_items.max(1);
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible {
            self.scroll_offset = self.selected_index + 1 - visible;
        }
        let max_scroll = self.report.intervals.len().saturating_sub(visible);
        self.scroll_offset = self.scroll_offset.min(max_scroll);
    }

    pub fn set_visible_rows(&mut self, rows: usize) {
        self.max_visible_items = rows.max(1);
        self.clamp_scroll();
    }

    pub fn on_tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % 64;

        if let Some(status_time) = self.status_message_time {
            if status_time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        if self.auto_refresh
            && !self.loading
            && self.last_refresh.elapsed() >= self.auto_refresh_interval
        {
            self.request_refresh(true);
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return true;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return true;
            }
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('v') => {
                self.set_view(self.report.options.view.next());
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.set_view(previous_view(self.report.options.view));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected_index > 0 {
                    self.select_interval(self.selected_index - 1);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_interval(self.selected_index + 1);
            }
            KeyCode::Home => self.select_interval(0),
            KeyCode::End => self.select_interval(usize::MAX),
            KeyCode::Esc => {
                let latest = self.report.select(&IntervalSelector::Latest).unwrap_or(0);
                self.select_interval(latest);
            }
            KeyCode::Char('s') => self.cycle_state(),
            KeyCode::Char('i') => self.cycle_span(),
            KeyCode::Char('d') => self.toggle_direction(),
            KeyCode::Char('p') => self.cycle_theme(),
            KeyCode::Char('r') => self.request_refresh(true),
            KeyCode::Char('R') => self.toggle_auto_refresh(),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let secs = self.auto_refresh_interval.as_secs() + REFRESH_STEP_SECS;
                self.set_refresh_interval(secs);
            }
            KeyCode::Char('-') => {
                let secs = self
                    .auto_refresh_interval
                    .as_secs()
                    .saturating_sub(REFRESH_STEP_SECS);
                self.set_refresh_interval(secs);
            }
            _ => {}
        }
        false
    }

    pub fn handle_mouse_event(&mut self, event: MouseEvent) {
        if let MouseEventKind::Down(MouseButton::Left) = event.kind {
            let x = event.column;
            let y = event.row;

            let action = self
                .click_areas
                .iter()
                .find(|area| {
                    x >= area.rect.x
                        && x < area.rect.x + area.rect.width
                        && y >= area.rect.y
                        && y < area.rect.y + area.rect.height
                })
                .map(|area| area.action.clone());

            match action {
                Some(ClickAction::View(view)) => self.set_view(view),
                Some(ClickAction::NextState) => self.cycle_state(),
                Some(ClickAction::NextSpan) => self.cycle_span(),
                Some(ClickAction::ToggleDirection) => self.toggle_direction(),
                Some(ClickAction::Interval(index)) => self.select_interval(index),
                None => {}
            }
        }
    }

    pub fn handle_resize(&mut self, width: u16, height: u16) {
        self.terminal_width = width;
        self.terminal_height = height;
    }

    pub fn clear_click_areas(&mut self) {
        self.click_areas.clear();
    }

    pub fn add_click_area(&mut self, rect: Rect, action: ClickAction) {
        self.click_areas.push(ClickArea { rect, action });
    }

    fn set_view(&mut self, view: DataView) {
        if self.report.options.view == view {
            return;
        }
        let options = ReportOptions {
            view,
            ..self.report.options.clone()
        };
        self.rebuild_with(options);
        self.remember_filters();
        self.set_status(&format!("View: {}", view.title()));
    }

    /// State filter choices: every state first, then each state in the view.
    pub fn state_choices(&self) -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(
                self.report
                    .categories
                    .iter()
                    .map(|state| CategoryFilter::Only(state.clone())),
            )
            .collect()
    }

    fn cycle_state(&mut self) {
        let choices = self.state_choices();
        let current = &self.report.options.category;
        let next = choices
            .iter()
            .position(|choice| choice == current)
            .map(|idx| choices[(idx + 1) % choices.len()].clone())
            .unwrap_or(CategoryFilter::All);

        let options = ReportOptions {
            category: next,
            ..self.report.options.clone()
        };
        self.rebuild_with(options);
        self.set_status(&format!("State: {}", self.report.options.category));
    }

    fn cycle_span(&mut self) {
        let options = ReportOptions {
            span: self.report.options.span.next(),
            ..self.report.options.clone()
        };
        self.rebuild_with(options);
        self.remember_filters();
        self.set_status(&format!("Interval: {}", self.report.options.span));
    }

    fn toggle_direction(&mut self) {
        let options = ReportOptions {
            direction: self.report.options.direction.toggle(),
            ..self.report.options.clone()
        };
        self.rebuild_with(options);
        self.remember_filters();
        let message = match self.report.options.direction {
            Direction::Descending => "Numbering from the latest date",
            Direction::Ascending => "Numbering from the earliest date",
        };
        self.set_status(message);
    }

    fn remember_filters(&mut self) {
        let options = &self.report.options;
        self.settings
            .remember(options.view, options.span, options.direction);
        self.save_settings();
    }

    fn save_settings(&mut self) -> bool {
        let Some(path) = self.settings_path.clone() else {
            return false;
        };
        match self.settings.save_to(&path) {
            Ok(()) => true,
            Err(e) => {
                self.set_status(&format!("Settings save failed: {}", e));
                false
            }
        }
    }

    fn cycle_theme(&mut self) {
        let new_theme = self.theme.name.next();
        self.theme = Theme::from_name(new_theme);
        self.settings.set_theme(new_theme);
        if self.save_settings() {
            self.set_status(&format!("Theme: {}", new_theme.as_str()));
        }
    }

    fn toggle_auto_refresh(&mut self) {
        self.auto_refresh = !self.auto_refresh;
        if self.auto_refresh {
            self.last_refresh = Instant::now();
            self.set_status(&format!(
                "Auto-refresh ON ({}s)",
                self.auto_refresh_interval.as_secs()
            ));
        } else {
            self.set_status("Auto-refresh OFF");
        }
    }

    fn set_refresh_interval(&mut self, secs: u64) {
        self.auto_refresh_interval = Duration::from_secs(clamp_refresh(secs));
        self.settings.auto_refresh_interval = self.auto_refresh_interval.as_secs();
        if self.save_settings() {
            self.set_status(&format!(
                "Refresh interval: {}s",
                self.auto_refresh_interval.as_secs()
            ));
        }
    }

    pub fn set_status(&mut self, message: &str) {
        self.status_message = Some(message.to_string());
        self.status_message_time = Some(Instant::now());
    }

    pub fn is_narrow(&self) -> bool {
        self.terminal_width < 80
    }

    pub fn is_very_narrow(&self) -> bool {
        self.terminal_width < 60
    }
}

fn previous_view(view: DataView) -> DataView {
    let views = DataView::all();
    let idx = views.iter().position(|&v| v == view).unwrap_or(0);
    views[(idx + views.len() - 1) % views.len()]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::loader::RecordSource;
    use std::fs;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// 2024-08-20..=2024-09-08, one record per day, AL and PE alternating.
    pub(crate) fn write_payload(dir: &TempDir) -> PathBuf {
        let start = NaiveDate::from_ymd_opt(2024, 8, 20).unwrap();
        let records: Vec<RawRecord> = (0..20)
            .map(|i| {
                let day = start + chrono::Duration::days(i);
                let state = if i % 2 == 0 { "AL" } else { "PE" };
                RawRecord::new(&format!("{}T15:00:00Z", day), state)
            })
            .collect();
        let path = dir.path().join("records.json");
        fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();
        path
    }

    pub(crate) fn app_for(dir: &TempDir, input: PathBuf) -> App {
        let mut app = App::new(TuiConfig {
            theme: Some("green".to_string()),
            refresh: Some(0),
            view: Some(DataView::Total),
            span: Some(Span::Week),
            direction: Some(Direction::Descending),
            options: ReportOptions {
                timezone: chrono_tz::UTC,
                ..ReportOptions::default()
            },
            loader: DataLoader::new(RecordSource::File(input), chrono::Duration::minutes(5)),
        })
        .unwrap();
        app.settings_path = Some(dir.path().join("settings.json"));
        app
    }

    #[test]
    fn test_first_refresh_selects_latest_interval() {
        let tmp = TempDir::new().unwrap();
        let input = write_payload(&tmp);
        let mut app = app_for(&tmp, input);

        assert!(app.loading);
        assert!(app.has_pending_refresh());
        app.run_pending_refresh();

        assert!(!app.loading);
        assert!(app.has_data);
        assert_eq!(app.report.intervals.len(), 3);
        let focus = app.focus.as_ref().unwrap();
        assert_eq!(focus.summary.label, "Week 1");
        assert_eq!(focus.summary.end, NaiveDate::from_ymd_opt(2024, 9, 8).unwrap());
    }

    #[test]
    fn test_arrow_keys_move_selection() {
        let tmp = TempDir::new().unwrap();
        let input = write_payload(&tmp);
        let mut app = app_for(&tmp, input);
        app.run_pending_refresh();

        app.handle_key_event(key(KeyCode::Down));
        assert_eq!(app.focus.as_ref().unwrap().summary.label, "Week 2");
        app.handle_key_event(key(KeyCode::End));
        assert_eq!(app.focus.as_ref().unwrap().summary.label, "Week 3");
        app.handle_key_event(key(KeyCode::Down));
        assert_eq!(app.selected_index, 2);
        app.handle_key_event(key(KeyCode::Esc));
        assert_eq!(app.focus.as_ref().unwrap().summary.label, "Week 1");
    }

    #[test]
    fn test_filter_keys_rebuild_and_persist() {
        let tmp = TempDir::new().unwrap();
        let input = write_payload(&tmp);
        let mut app = app_for(&tmp, input);
        app.run_pending_refresh();

        app.handle_key_event(key(KeyCode::Char('i')));
        assert_eq!(app.report.options.span, Span::Month);
        assert_eq!(app.report.intervals.len(), 1);

        app.handle_key_event(key(KeyCode::Char('d')));
        assert_eq!(app.report.options.direction, Direction::Ascending);

        app.handle_key_event(key(KeyCode::Tab));
        assert_eq!(app.report.options.view, DataView::Token);

        let saved = Settings::load_from(&tmp.path().join("settings.json"));
        assert_eq!(saved.span(), Span::Month);
        assert_eq!(saved.direction(), Direction::Ascending);
        assert_eq!(saved.view(), DataView::Token);
    }

    #[test]
    fn test_state_cycle_wraps_to_all() {
        let tmp = TempDir::new().unwrap();
        let input = write_payload(&tmp);
        let mut app = app_for(&tmp, input);
        app.run_pending_refresh();
        let all_total = app.report.overall.total_count;

        app.handle_key_event(key(KeyCode::Char('s')));
        assert_eq!(app.report.options.category, CategoryFilter::Only("AL".to_string()));
        assert_eq!(app.report.overall.total_count, 10);
        assert_eq!(app.report.categories, vec!["AL", "PE"]);

        app.handle_key_event(key(KeyCode::Char('s')));
        app.handle_key_event(key(KeyCode::Char('s')));
        assert_eq!(app.report.options.category, CategoryFilter::All);
        assert_eq!(app.report.overall.total_count, all_total);
    }

    #[test]
    fn test_failed_refresh_keeps_report() {
        let tmp = TempDir::new().unwrap();
        let input = write_payload(&tmp);
        let mut app = app_for(&tmp, input.clone());
        app.run_pending_refresh();
        let before = app.report.overall.total_count;

        fs::remove_file(&input).unwrap();
        app.handle_key_event(key(KeyCode::Char('r')));
        app.run_pending_refresh();

        assert!(app.error.is_some());
        assert_eq!(app.report.overall.total_count, before);
        assert!(app.status_message.as_deref().unwrap().starts_with("Error"));
    }

    #[test]
    fn test_quit_keys() {
        let tmp = TempDir::new().unwrap();
        let input = write_payload(&tmp);
        let mut app = app_for(&tmp, input);
        assert!(app.handle_key_event(key(KeyCode::Char('q'))));
        assert!(app.should_quit);
    }

    #[test]
    fn test_previous_view_wraps() {
        assert_eq!(previous_view(DataView::Public), DataView::Token);
        assert_eq!(previous_view(DataView::Token), DataView::Total);
    }
}
