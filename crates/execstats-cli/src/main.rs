mod cache;
mod config;
mod loader;
mod tui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use execstats_core::{
    build_report, format_count, format_currency, format_day, format_decimal, format_delta,
    format_hours, format_weekday, round_for_display, AggregateMetrics, CategoryFilter,
    CategoryTotal, DataView, Direction, IntervalFocus, IntervalSelector, NumberOrder, RawRecord,
    Report, ReportOptions, Span, ALL_CATEGORIES,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::runtime::Runtime;

use config::ExecstatsConfig;
use loader::{DataLoader, RecordSource};

#[derive(Parser)]
#[command(name = "execstats")]
#[command(author, version, about = "Execution analytics for the administrative residence calculator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    filters: FilterArgs,

    #[arg(long, global = true, help = "Log debug output to stderr")]
    debug: bool,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    #[arg(long, global = true, help = "Data view: public, total or token")]
    view: Option<DataView>,

    #[arg(long, global = true, help = "State to show, or Geral for every state")]
    state: Option<CategoryFilter>,

    #[arg(long, global = true, help = "Interval size: week, month or quarter")]
    interval: Option<Span>,

    #[arg(
        long,
        global = true,
        help = "Number intervals from the latest (desc) or earliest (asc) date"
    )]
    direction: Option<Direction>,

    #[arg(
        long,
        global = true,
        help = "Interval to detail: label, number, latest or earliest"
    )]
    select: Option<IntervalSelector>,

    #[arg(long, global = true, value_name = "FILE", help = "Read records from a saved JSON payload")]
    input: Option<PathBuf>,

    #[arg(long, global = true, help = "Endpoint to fetch records from")]
    url: Option<String>,

    #[arg(
        long,
        global = true,
        value_parser = parse_hourly_rate,
        help = "Cost of one staff hour, in BRL"
    )]
    hourly_rate: Option<Decimal>,

    #[arg(long, global = true, help = "Always fetch, ignoring the disk cache")]
    no_cache: bool,

    #[arg(long, global = true, help = "Disable spinner")]
    no_spinner: bool,

    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,
}

fn parse_hourly_rate(value: &str) -> Result<Decimal, String> {
    let rate: Decimal = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a decimal number", value))?;
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(format!("hourly rate must not be negative (got {})", value));
    }
    Ok(rate)
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show the execution report for one interval and the whole view")]
    Report,
    #[command(about = "List the intervals available for selection")]
    Intervals,
    #[command(about = "List the states present in the current view")]
    States,
    #[command(about = "Launch the interactive dashboard")]
    Tui {
        #[arg(short, long, help = "Color theme")]
        theme: Option<String>,

        #[arg(short, long, help = "Auto-refresh interval in seconds (0 = off)")]
        refresh: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        None | Some(Commands::Report) => run_report(&cli.filters),
        Some(Commands::Intervals) => run_intervals(&cli.filters),
        Some(Commands::States) => run_states(&cli.filters),
        Some(Commands::Tui { theme, refresh }) => {
            let (options, loader) = resolve(&cli.filters)?;
            tui::run(tui::TuiConfig {
                theme,
                refresh,
                view: cli.filters.view,
                span: cli.filters.interval,
                direction: cli.filters.direction,
                options,
                loader,
            })
        }
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => return,
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Merge flags with `~/.execstats` and the built-in defaults.
fn resolve(filters: &FilterArgs) -> Result<(ReportOptions, DataLoader)> {
    let config = ExecstatsConfig::load();
    let timezone = config
        .timezone()
        .context("invalid timezone in ~/.execstats")?;

    let options = ReportOptions {
        view: filters.view.unwrap_or_default(),
        category: filters.state.clone().unwrap_or_default(),
        span: filters.interval.unwrap_or_default(),
        direction: filters.direction.unwrap_or_default(),
        timezone,
        hourly_rate: filters.hourly_rate.unwrap_or_else(|| config.hourly_rate()),
    };

    let source = match &filters.input {
        Some(path) => RecordSource::File(path.clone()),
        None => RecordSource::Endpoint {
            url: filters.url.clone().unwrap_or_else(|| config.endpoint()),
            use_cache: !filters.no_cache,
        },
    };

    Ok((options, DataLoader::new(source, config.cache_ttl())))
}

fn load_records(loader: &mut DataLoader, no_spinner: bool) -> Result<Vec<RawRecord>> {
    use indicatif::{ProgressBar, ProgressStyle};

    let spinner = if no_spinner || matches!(loader.source(), RecordSource::File(_)) {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner());
        pb.set_message("Fetching executions...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    };

    let rt = Runtime::new()?;
    let result = loader.load(&rt);

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    result.with_context(|| {
        format!(
            "could not load execution records from {}",
            loader.source().describe()
        )
    })
}

fn select_focus(report: &Report, selector: &IntervalSelector) -> Result<Option<IntervalFocus>> {
    if report.intervals.is_empty() {
        return Ok(None);
    }
    let index = report.select(selector).ok_or_else(|| {
        anyhow::anyhow!(
            "no interval matches '{}' (available: {})",
            selector,
            report.selector_labels().join(", ")
        )
    })?;
    Ok(report.focus(index))
}

// ── report ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsJson {
    executions: u64,
    hours: Decimal,
    cost: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    delta_percent: Option<Decimal>,
}

impl From<&AggregateMetrics> for MetricsJson {
    fn from(m: &AggregateMetrics) -> Self {
        Self {
            executions: m.total_count,
            hours: m.derived_hours,
            cost: m.derived_currency,
            delta_percent: m.delta_percent,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IntervalJson {
    number: u32,
    label: String,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    active_days: usize,
    cumulative: u64,
    metrics: MetricsJson,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DayJson {
    date: chrono::NaiveDate,
    weekday: &'static str,
    executions: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateJson {
    state: String,
    executions: u64,
}

impl From<&CategoryTotal> for StateJson {
    fn from(c: &CategoryTotal) -> Self {
        Self {
            state: c.category.clone(),
            executions: c.count,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FocusJson {
    interval: IntervalJson,
    days: Vec<DayJson>,
    hourly: [u64; 24],
    #[serde(skip_serializing_if = "Option::is_none")]
    states: Option<Vec<StateJson>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BusiestDayJson {
    date: chrono::NaiveDate,
    executions: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportJson {
    view: DataView,
    state: String,
    interval: Span,
    direction: Direction,
    received: usize,
    dropped: usize,
    overall: MetricsJson,
    active_days: usize,
    first_date: Option<chrono::NaiveDate>,
    last_date: Option<chrono::NaiveDate>,
    average_per_active_day: Decimal,
    busiest_day: Option<BusiestDayJson>,
    available_states: Vec<String>,
    intervals: Vec<IntervalJson>,
    selected: Option<FocusJson>,
    hourly: [u64; 24],
    #[serde(skip_serializing_if = "Option::is_none")]
    states: Option<Vec<StateJson>>,
}

fn interval_json(summary: &execstats_core::IntervalSummary) -> IntervalJson {
    IntervalJson {
        number: summary.number,
        label: summary.label.clone(),
        start: summary.start,
        end: summary.end,
        active_days: summary.date_count,
        cumulative: summary.cumulative_total,
        metrics: (&summary.metrics).into(),
    }
}

fn report_json(report: &Report, focus: Option<&IntervalFocus>) -> ReportJson {
    let shows_states = report.options.view.shows_states();
    ReportJson {
        view: report.options.view,
        state: report.options.category.label().to_string(),
        interval: report.options.span,
        direction: report.options.direction,
        received: report.received,
        dropped: report.dropped,
        overall: (&report.overall).into(),
        active_days: report.activity.active_days,
        first_date: report.activity.first_date,
        last_date: report.activity.last_date,
        average_per_active_day: round_for_display(report.activity.average_per_active_day),
        busiest_day: report
            .activity
            .busiest_day
            .map(|(date, executions)| BusiestDayJson { date, executions }),
        available_states: report.categories.clone(),
        intervals: report.summaries.iter().map(interval_json).collect(),
        selected: focus.map(|f| FocusJson {
            interval: interval_json(&f.summary),
            days: f
                .days
                .iter()
                .map(|d| DayJson {
                    date: d.date,
                    weekday: format_weekday(d.weekday),
                    executions: d.count,
                })
                .collect(),
            hourly: f.hourly,
            states: shows_states.then(|| f.categories.iter().map(StateJson::from).collect()),
        }),
        hourly: report.hourly,
        states: shows_states
            .then(|| report.category_totals().iter().map(StateJson::from).collect()),
    }
}

fn run_report(filters: &FilterArgs) -> Result<()> {
    let (options, mut loader) = resolve(filters)?;
    let selector = filters.select.clone().unwrap_or_default();

    let records = load_records(&mut loader, filters.no_spinner)?;
    let report = build_report(&records, options);
    let focus = select_focus(&report, &selector)?;

    if filters.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report, focus.as_ref()))?);
    } else {
        print_report(&report, focus.as_ref());
    }

    Ok(())
}

fn print_header(report: &Report) {
    println!();
    println!(
        "  {}",
        format!("Executions: {}", report.options.view.title()).bold()
    );
    println!(
        "  {}",
        format!(
            "State: {} | Interval: {} | Numbering: {}",
            report.options.category,
            report.options.span,
            report.options.direction
        )
        .bright_black()
    );
    if report.dropped > 0 {
        println!(
            "  {}",
            format!(
                "{} of {} records skipped (unusable timestamp)",
                report.dropped, report.received
            )
            .yellow()
        );
    }
}

fn print_metrics(title: &str, metrics: &AggregateMetrics, cumulative: Option<u64>) {
    println!("\n  {}", title.cyan().bold());

    let delta = match metrics.delta_percent {
        Some(delta) if delta.is_sign_negative() && !delta.is_zero() => {
            format!("  ▼ {}", format_delta(delta)).red().to_string()
        }
        Some(delta) => format!("  ▲ {}", format_delta(delta)).green().to_string(),
        None => String::new(),
    };

    println!(
        "    {:<16}{}{}",
        "Executions",
        format_count(metrics.total_count).bold(),
        delta
    );
    println!(
        "    {:<16}{} horas",
        "Hours saved",
        format_hours(metrics.derived_hours)
    );
    println!(
        "    {:<16}{}",
        "Cost avoided",
        format_currency(metrics.derived_currency).green()
    );
    if let Some(cumulative) = cumulative {
        println!("    {:<16}{}", "Cumulative", format_count(cumulative));
    }
}

fn print_activity(report: &Report) {
    let activity = &report.activity;
    println!(
        "    {:<16}{}",
        "Active days",
        format_count(activity.active_days as u64)
    );
    println!(
        "    {:<16}{}",
        "Daily average",
        format_decimal(activity.average_per_active_day)
    );
    if let Some((date, count)) = activity.busiest_day {
        println!(
            "    {:<16}{} ({} {})",
            "Busiest day",
            format_count(count),
            format_weekday(date.weekday()),
            date.format("%d/%m/%Y")
        );
    }
}

fn print_report(report: &Report, focus: Option<&IntervalFocus>) {
    print_header(report);

    if report.is_empty() {
        println!("\n  {}\n", "No executions for this selection.".yellow());
        return;
    }

    if let Some(focus) = focus {
        let summary = &focus.summary;
        let title = format!(
            "{} [{} - {}]",
            summary.label,
            format_day(summary.start),
            format_day(summary.end)
        );
        print_metrics(&title, &summary.metrics, Some(summary.cumulative_total));
    }
    print_metrics("Whole view", &report.overall, None);
    print_activity(report);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Interval",
        "Dates",
        "Days",
        "Executions",
        "Change",
        "Hours",
        "Cost",
        "Cumulative",
    ]);
    for summary in report.chronological_summaries() {
        let selected = focus.is_some_and(|f| f.summary.number == summary.number);
        let label = if selected {
            format!("▶ {}", summary.label)
        } else {
            summary.label.clone()
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format!(
                "{} - {}",
                format_day(summary.start),
                format_day(summary.end)
            )),
            Cell::new(summary.date_count).set_alignment(CellAlignment::Right),
            Cell::new(format_count(summary.total)).set_alignment(CellAlignment::Right),
            Cell::new(
                summary
                    .metrics
                    .delta_percent
                    .map(format_delta)
                    .unwrap_or_else(|| "-".to_string()),
            )
            .set_alignment(CellAlignment::Right),
            Cell::new(format_hours(summary.metrics.derived_hours))
                .set_alignment(CellAlignment::Right),
            Cell::new(format_currency(summary.metrics.derived_currency))
                .set_alignment(CellAlignment::Right),
            Cell::new(format_count(summary.cumulative_total)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("\n{table}");

    if let Some(focus) = focus {
        let mut days = Table::new();
        days.set_content_arrangement(ContentArrangement::Dynamic);
        days.set_header(vec!["Date", "Day", "Executions"]);
        for day in &focus.days {
            days.add_row(vec![
                Cell::new(format_day(day.date)),
                Cell::new(format_weekday(day.weekday)),
                Cell::new(format_count(day.count)).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("\n  {}", format!("{} by day", focus.summary.label).bold());
        println!("{days}");

        print_hourly(&format!("{} by hour", focus.summary.label), &focus.hourly);
        if report.options.view.shows_states() {
            print_states(&format!("{} by state", focus.summary.label), &focus.categories);
        }
    }

    print_hourly("Whole view by hour", &report.hourly);
    println!();
}

fn print_hourly(title: &str, hourly: &[u64; 24]) {
    const BAR_WIDTH: u64 = 30;

    let max = hourly.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return;
    }

    println!("\n  {}", title.bold());
    for (hour, count) in hourly.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let width = ((count * BAR_WIDTH) / max).max(1) as usize;
        println!(
            "    {:02}:00  {} {}",
            hour,
            "█".repeat(width).cyan(),
            format_count(*count)
        );
    }
}

fn print_states(title: &str, totals: &[CategoryTotal]) {
    if totals.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["State", "Executions"]);
    for total in totals {
        table.add_row(vec![
            Cell::new(&total.category),
            Cell::new(format_count(total.count)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("\n  {}", title.bold());
    println!("{table}");
}

// ── intervals ─────────────────────────────────────────────────────────────

fn run_intervals(filters: &FilterArgs) -> Result<()> {
    let (options, mut loader) = resolve(filters)?;
    let records = load_records(&mut loader, filters.no_spinner)?;
    let report = build_report(&records, options);

    let summaries = report.summaries_by_number(NumberOrder::Ascending);

    if filters.json {
        let output: Vec<IntervalJson> = summaries.iter().map(|s| interval_json(s)).collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_header(&report);
    if summaries.is_empty() {
        println!("\n  {}\n", "No executions for this selection.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Interval", "From", "To", "Days", "Executions"]);
    for summary in summaries {
        table.add_row(vec![
            Cell::new(summary.number).set_alignment(CellAlignment::Right),
            Cell::new(&summary.label),
            Cell::new(summary.start.format("%d/%m/%Y")),
            Cell::new(summary.end.format("%d/%m/%Y")),
            Cell::new(summary.date_count).set_alignment(CellAlignment::Right),
            Cell::new(format_count(summary.total)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("\n{table}\n");
    Ok(())
}

// ── states ────────────────────────────────────────────────────────────────

fn run_states(filters: &FilterArgs) -> Result<()> {
    let (mut options, mut loader) = resolve(filters)?;
    // Every state of the view, whatever --state says
    options.category = CategoryFilter::All;

    let records = load_records(&mut loader, filters.no_spinner)?;
    let report = build_report(&records, options);
    let totals = report.category_totals();

    if filters.json {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct StatesJson {
            view: DataView,
            total: u64,
            states: Vec<StateJson>,
        }

        let output = StatesJson {
            view: report.options.view,
            total: report.overall.total_count,
            states: totals.iter().map(StateJson::from).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!(
        "  {}",
        format!("States: {}", report.options.view.title()).bold()
    );

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["State", "Executions"]);
    table.add_row(vec![
        Cell::new(ALL_CATEGORIES),
        Cell::new(format_count(report.overall.total_count)).set_alignment(CellAlignment::Right),
    ]);
    for total in &totals {
        table.add_row(vec![
            Cell::new(&total.category),
            Cell::new(format_count(total.count)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_filters_parse_into_core_types() {
        let cli = Cli::try_parse_from([
            "execstats",
            "report",
            "--view",
            "token",
            "--state",
            "AL",
            "--interval",
            "month",
            "--direction",
            "asc",
            "--select",
            "Month 2",
            "--hourly-rate",
            "120.5",
        ])
        .unwrap();

        assert_eq!(cli.filters.view, Some(DataView::Token));
        assert_eq!(cli.filters.state, Some(CategoryFilter::Only("AL".to_string())));
        assert_eq!(cli.filters.interval, Some(Span::Month));
        assert_eq!(cli.filters.direction, Some(Direction::Ascending));
        assert_eq!(
            cli.filters.select,
            Some(IntervalSelector::Label("Month 2".to_string()))
        );
        assert_eq!(cli.filters.hourly_rate, Some(Decimal::new(1205, 1)));
    }

    #[test]
    fn test_unknown_view_is_rejected() {
        assert!(Cli::try_parse_from(["execstats", "--view", "everything"]).is_err());
        assert!(Cli::try_parse_from(["execstats", "--interval", "fortnight"]).is_err());
        assert!(Cli::try_parse_from(["execstats", "--select", "0"]).is_err());
    }

    #[test]
    fn test_negative_hourly_rate_is_rejected() {
        assert_eq!(parse_hourly_rate("0"), Ok(Decimal::ZERO));
        assert_eq!(parse_hourly_rate(" 99.91 "), Ok(Decimal::new(9991, 2)));
        assert!(parse_hourly_rate("-10").is_err());
        assert!(parse_hourly_rate("ten").is_err());
        assert!(Cli::try_parse_from(["execstats", "--hourly-rate", "-10"]).is_err());
    }

    #[test]
    fn test_select_focus_unknown_label() {
        let records = vec![RawRecord::new("2024-09-02T12:00:00Z", "AL")];
        let report = build_report(
            &records,
            ReportOptions {
                timezone: chrono_tz::UTC,
                ..ReportOptions::default()
            },
        );
        assert!(select_focus(&report, &IntervalSelector::Latest).unwrap().is_some());
        let err = select_focus(&report, &IntervalSelector::Number(4)).unwrap_err();
        assert!(err.to_string().contains("Week 1"));

        let empty = build_report(&[], ReportOptions::default());
        assert!(select_focus(&empty, &IntervalSelector::Number(4)).unwrap().is_none());
    }
}
