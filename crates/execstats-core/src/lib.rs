#![deny(clippy::all)]

mod aggregator;
mod bucketer;
mod filter;
mod metrics;
mod normalizer;
pub mod source;

pub use aggregator::*;
pub use bucketer::*;
pub use filter::*;
pub use metrics::*;
pub use normalizer::*;
pub use source::{FetchCache, FetchError, DEFAULT_CACHE_TTL_SECS, DEFAULT_ENDPOINT};

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;

/// A user-supplied option value that does not name a known mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown view '{0}' (expected public, total or token)")]
    View(String),
    #[error("invalid state '{0}'")]
    Category(String),
    #[error("unknown interval '{0}' (expected week, month or quarter)")]
    Span(String),
    #[error("unknown direction '{0}' (expected asc or desc)")]
    Direction(String),
    #[error("invalid interval selection '{0}'")]
    Selection(String),
    #[error("unknown timezone '{0}'")]
    Timezone(String),
}

pub fn parse_timezone(name: &str) -> Result<Tz, ParseError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ParseError::Timezone(name.to_string()))
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub view: DataView,
    pub category: CategoryFilter,
    pub span: Span,
    pub direction: Direction,
    pub timezone: Tz,
    pub hourly_rate: Decimal,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            view: DataView::default(),
            category: CategoryFilter::default(),
            span: Span::default(),
            direction: Direction::default(),
            timezone: DEFAULT_TIMEZONE,
            hourly_rate: DEFAULT_HOURLY_RATE,
        }
    }
}

/// Which interval a report should focus on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IntervalSelector {
    /// Chronologically latest interval.
    #[default]
    Latest,
    Earliest,
    Number(u32),
    /// Full label such as `"Week 3"`, compared case-insensitively.
    Label(String),
}

impl FromStr for IntervalSelector {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Err(ParseError::Selection(s.to_string())),
            "latest" | "last" => Ok(IntervalSelector::Latest),
            "earliest" | "first" => Ok(IntervalSelector::Earliest),
            other => match other.parse::<u32>() {
                Ok(0) => Err(ParseError::Selection(s.to_string())),
                Ok(number) => Ok(IntervalSelector::Number(number)),
                Err(_) => Ok(IntervalSelector::Label(trimmed.to_string())),
            },
        }
    }
}

impl fmt::Display for IntervalSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalSelector::Latest => f.write_str("latest"),
            IntervalSelector::Earliest => f.write_str("earliest"),
            IntervalSelector::Number(number) => write!(f, "{}", number),
            IntervalSelector::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub count: u64,
}

/// Detail for one selected interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalFocus {
    pub summary: IntervalSummary,
    pub days: Vec<DayCount>,
    pub hourly: [u64; 24],
    pub categories: Vec<CategoryTotal>,
}

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct Report {
    pub options: ReportOptions,
    /// Records in the payload before normalization.
    pub received: usize,
    /// Records dropped for an unusable timestamp.
    pub dropped: usize,
    /// Events left after the view and state filters.
    pub events: Vec<Event>,
    /// States present in the current view, for the state selector.
    pub categories: Vec<String>,
    pub date_counts: DateCountMap,
    /// Traversal order, number 1 first.
    pub intervals: Vec<Interval>,
    /// Same order as `intervals`.
    pub summaries: Vec<IntervalSummary>,
    pub overall: AggregateMetrics,
    pub activity: ActivitySummary,
    pub hourly: [u64; 24],
}

/// Normalize, filter, bucket and aggregate one payload.
pub fn build_report(records: &[RawRecord], options: ReportOptions) -> Report {
    let Normalized { events, dropped } = normalize_records(records, options.timezone);

    let in_view = filter_by_cutoff(events, options.view.cutoff());
    let categories = available_categories(&in_view);
    let events = filter_by_category(in_view, &options.category);

    let date_counts = DateCountMap::from_events(&events);
    let intervals = split_by_interval(&date_counts, options.span, options.direction);
    let summaries = summarize_intervals(&intervals, options.hourly_rate);
    let overall = AggregateMetrics::from_count(date_counts.total(), options.hourly_rate);
    let activity = calculate_summary(&date_counts);
    let hourly = hourly_distribution(&events);

    tracing::debug!(
        received = records.len(),
        dropped,
        events = events.len(),
        dates = date_counts.len(),
        intervals = intervals.len(),
        view = %options.view,
        state = %options.category,
        "built report"
    );

    Report {
        options,
        received: records.len(),
        dropped,
        events,
        categories,
        date_counts,
        intervals,
        summaries,
        overall,
        activity,
        hourly,
    }
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index into `intervals` of the selected interval, if any.
    pub fn select(&self, selector: &IntervalSelector) -> Option<usize> {
        let by_start = self.intervals.iter().enumerate();
        match selector {
            IntervalSelector::Latest => by_start.max_by_key(|(_, i)| i.start()).map(|(idx, _)| idx),
            IntervalSelector::Earliest => by_start.min_by_key(|(_, i)| i.start()).map(|(idx, _)| idx),
            IntervalSelector::Number(number) => self.intervals.iter().position(|i| i.number == *number),
            IntervalSelector::Label(label) => self
                .intervals
                .iter()
                .position(|i| i.label.eq_ignore_ascii_case(label.trim())),
        }
    }

    pub fn focus(&self, index: usize) -> Option<IntervalFocus> {
        let interval = self.intervals.get(index)?;
        let summary = self.summaries.get(index)?.clone();

        let events: Vec<Event> = self
            .events
            .iter()
            .filter(|event| interval.contains(event.date()))
            .cloned()
            .collect();

        let days = interval
            .days()
            .iter()
            .map(|(date, count)| DayCount {
                date: *date,
                weekday: date.weekday(),
                count: *count,
            })
            .collect();

        Some(IntervalFocus {
            summary,
            days,
            hourly: hourly_distribution(&events),
            categories: category_totals(&events),
        })
    }

    /// Interval labels for a selector list, numerically ordered.
    pub fn selector_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.intervals.iter().map(|i| i.label.clone()).collect();
        sort_labels(&mut labels, NumberOrder::Ascending);
        labels
    }

    /// Summaries ordered by the number in their label.
    pub fn summaries_by_number(&self, order: NumberOrder) -> Vec<&IntervalSummary> {
        let mut intervals = self.intervals.clone();
        sort_by_label_number(&mut intervals, order);
        intervals
            .iter()
            .filter_map(|interval| self.summaries.iter().find(|s| s.number == interval.number))
            .collect()
    }

    /// Summaries from earliest to latest.
    pub fn chronological_summaries(&self) -> Vec<&IntervalSummary> {
        self.summaries_by_number(self.options.direction.chronological())
    }

    pub fn category_totals(&self) -> Vec<CategoryTotal> {
        category_totals(&self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn utc_options() -> ReportOptions {
        ReportOptions {
            view: DataView::Total,
            timezone: chrono_tz::UTC,
            ..ReportOptions::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn repeat(ts: &str, state: &str, n: usize) -> Vec<RawRecord> {
        (0..n).map(|_| RawRecord::new(ts, state)).collect()
    }

    /// 2024-08-20..=2024-09-08, one record per day, two states alternating.
    fn around_launch() -> Vec<RawRecord> {
        let start = date("2024-08-20");
        (0..20)
            .map(|i| {
                let day = start + chrono::Duration::days(i);
                let state = if i % 2 == 0 { "AL" } else { "PE" };
                RawRecord::new(&format!("{}T15:00:00Z", day), state)
            })
            .collect()
    }

    #[test]
    fn test_sparse_payload_single_interval() {
        let mut records = repeat("2024-01-01T10:00:00Z", "AL", 3);
        records.extend(repeat("2024-01-10T10:00:00Z", "AL", 2));

        let report = build_report(&records, utc_options());
        assert_eq!(report.intervals.len(), 1);
        assert_eq!(report.intervals[0].label, "Week 1");
        assert_eq!(report.intervals[0].date_count(), 2);
        assert_eq!(report.summaries[0].total, 5);
        assert_eq!(report.overall.total_count, 5);
        assert_eq!(report.overall.derived_hours, dec!(12.5));
    }

    #[test]
    fn test_empty_payload() {
        let report = build_report(&[], ReportOptions::default());
        assert!(report.is_empty());
        assert!(report.date_counts.is_empty());
        assert!(report.intervals.is_empty());
        assert_eq!(report.overall.total_count, 0);
        assert_eq!(report.overall.delta_percent, None);
        assert_eq!(report.select(&IntervalSelector::Latest), None);
        assert!(report.focus(0).is_none());
    }

    #[test]
    fn test_views_partition_at_launch() {
        let records = around_launch();
        let public = build_report(&records, ReportOptions { view: DataView::Public, ..utc_options() });
        let token = build_report(&records, ReportOptions { view: DataView::Token, ..utc_options() });
        let total = build_report(&records, utc_options());

        assert_eq!(public.date_counts.first_date(), Some(PUBLIC_LAUNCH_DATE));
        assert!(token.date_counts.last_date().unwrap() < PUBLIC_LAUNCH_DATE);
        assert_eq!(
            public.overall.total_count + token.overall.total_count,
            total.overall.total_count
        );
        assert_eq!(total.overall.total_count, 20);
    }

    #[test]
    fn test_view_uses_display_timezone_dates() {
        // 02:00 UTC on launch day is still 25 August in São Paulo
        let records = vec![RawRecord::new("2024-08-26T02:00:00Z", "AL")];
        let sao_paulo = build_report(
            &records,
            ReportOptions { view: DataView::Public, ..ReportOptions::default() },
        );
        assert!(sao_paulo.is_empty());

        let utc = build_report(&records, ReportOptions { view: DataView::Public, ..utc_options() });
        assert_eq!(utc.overall.total_count, 1);
    }

    #[test]
    fn test_all_states_keeps_unset_events() {
        let mut records = around_launch();
        records.push(RawRecord {
            time_stamp: Some("2024-08-30T12:00:00Z".to_string()),
            ..RawRecord::default()
        });

        let report = build_report(&records, utc_options());
        assert_eq!(report.events.len(), records.len());
        assert_eq!(report.events.iter().filter(|e| e.is_unset()).count(), 1);
        assert_eq!(report.categories, vec!["AL", "PE"]);
    }

    #[test]
    fn test_state_filter_keeps_category_list() {
        let options = ReportOptions {
            category: CategoryFilter::Only("PE".to_string()),
            ..utc_options()
        };
        let report = build_report(&around_launch(), options);
        assert_eq!(report.overall.total_count, 10);
        assert!(report.events.iter().all(|e| e.category == "PE"));
        // the selector still offers every state of the view
        assert_eq!(report.categories, vec!["AL", "PE"]);
    }

    #[test]
    fn test_dropped_records_are_counted() {
        let mut records = around_launch();
        records.push(RawRecord::new("not a timestamp", "AL"));
        records.push(RawRecord::default());

        let report = build_report(&records, utc_options());
        assert_eq!(report.received, 22);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.overall.total_count, 20);
    }

    #[test]
    fn test_select_and_focus() {
        let report = build_report(&around_launch(), utc_options());
        // descending: Week 1 holds the latest 7 dates, Week 3 the oldest 6
        assert_eq!(report.intervals.len(), 3);

        let latest = report.select(&IntervalSelector::Latest).unwrap();
        assert_eq!(report.intervals[latest].label, "Week 1");
        let earliest = report.select(&IntervalSelector::Earliest).unwrap();
        assert_eq!(report.intervals[earliest].label, "Week 3");
        assert_eq!(report.select(&IntervalSelector::Number(2)), Some(1));
        assert_eq!(report.select(&"week 3".parse().unwrap()), Some(earliest));
        assert_eq!(report.select(&IntervalSelector::Number(9)), None);

        let focus = report.focus(earliest).unwrap();
        assert_eq!(focus.days.len(), 6);
        assert_eq!(focus.days[0].date, date("2024-08-20"));
        assert_eq!(focus.days[0].weekday, Weekday::Tue);
        assert_eq!(focus.summary.total, 6);
        assert_eq!(focus.hourly[15], 6);
        let states: Vec<(&str, u64)> = focus
            .categories
            .iter()
            .map(|c| (c.category.as_str(), c.count))
            .collect();
        assert_eq!(states, vec![("AL", 3), ("PE", 3)]);
    }

    #[test]
    fn test_selector_labels_numeric() {
        let start = date("2024-01-01");
        let records: Vec<RawRecord> = (0..80)
            .map(|i| RawRecord::new(&format!("{}T12:00:00Z", start + chrono::Duration::days(i)), "AL"))
            .collect();
        let report = build_report(&records, utc_options());
        let labels = report.selector_labels();
        assert_eq!(labels.len(), 12);
        assert_eq!(labels[1], "Week 2");
        assert_eq!(labels[9], "Week 10");

        let chronological = report.chronological_summaries();
        assert!(chronological.windows(2).all(|w| w[0].end < w[1].start));

        let numbers: Vec<u32> = report
            .summaries_by_number(NumberOrder::Ascending)
            .iter()
            .map(|s| s.number)
            .collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<u32>>());

        let ascending = build_report(
            &records,
            ReportOptions {
                direction: Direction::Ascending,
                ..utc_options()
            },
        );
        let first = ascending.chronological_summaries()[0];
        assert_eq!((first.label.as_str(), first.start), ("Week 1", start));
    }

    #[test]
    fn test_interval_selector_parse() {
        assert_eq!("latest".parse::<IntervalSelector>().unwrap(), IntervalSelector::Latest);
        assert_eq!("First".parse::<IntervalSelector>().unwrap(), IntervalSelector::Earliest);
        assert_eq!("3".parse::<IntervalSelector>().unwrap(), IntervalSelector::Number(3));
        assert_eq!(
            " Month 2 ".parse::<IntervalSelector>().unwrap(),
            IntervalSelector::Label("Month 2".to_string())
        );
        assert!("0".parse::<IntervalSelector>().is_err());
        assert!("  ".parse::<IntervalSelector>().is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("America/Sao_Paulo").unwrap(), DEFAULT_TIMEZONE);
        assert!(matches!(parse_timezone("Mars/Olympus"), Err(ParseError::Timezone(_))));
    }
}
