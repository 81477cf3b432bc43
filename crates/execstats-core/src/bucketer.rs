//! Date grouping and interval bucketing
//!
//! Events are first counted per calendar date, then the distinct dates are cut
//! into runs of at most `span` dates. Only dates that have executions count
//! toward a run; calendar gaps are skipped rather than padded, so a "Week" is
//! seven active days, not seven calendar days.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::normalizer::Event;
use crate::ParseError;

/// Executions per calendar date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DateCountMap {
    counts: BTreeMap<NaiveDate, u64>,
}

impl DateCountMap {
    /// Group events by their calendar date.
    pub fn from_events(events: &[Event]) -> Self {
        let counts = events
            .par_iter()
            .fold(BTreeMap::new, |mut acc: BTreeMap<NaiveDate, u64>, event| {
                *acc.entry(event.date()).or_default() += 1;
                acc
            })
            .reduce(BTreeMap::new, |mut a, b| {
                for (date, count) in b {
                    *a.entry(date).or_default() += count;
                }
                a
            });

        Self { counts }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, independent of any interval split.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// `(date, count)` pairs in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.counts.iter().map(|(date, count)| (*date, *count))
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.counts.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.counts.keys().next_back().copied()
    }
}

impl FromIterator<(NaiveDate, u64)> for DateCountMap {
    /// Repeated dates are summed; zero counts are not stored.
    fn from_iter<I: IntoIterator<Item = (NaiveDate, u64)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (date, count) in iter {
            if count > 0 {
                *counts.entry(date).or_default() += count;
            }
        }
        Self { counts }
    }
}

/// Nominal interval size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Span {
    #[default]
    Week,
    Month,
    Quarter,
}

impl Span {
    pub fn all() -> &'static [Span] {
        &[Span::Week, Span::Month, Span::Quarter]
    }

    /// Number of active dates per interval.
    pub fn days(self) -> usize {
        match self {
            Span::Week => 7,
            Span::Month => 30,
            Span::Quarter => 90,
        }
    }

    /// Label prefix for intervals of this span.
    pub fn unit(self) -> &'static str {
        match self {
            Span::Week => "Week",
            Span::Month => "Month",
            Span::Quarter => "Quarter",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Span::Week => "week",
            Span::Month => "month",
            Span::Quarter => "quarter",
        }
    }

    pub fn next(self) -> Span {
        match self {
            Span::Week => Span::Month,
            Span::Month => Span::Quarter,
            Span::Quarter => Span::Week,
        }
    }
}

impl FromStr for Span {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" | "weekly" | "7" => Ok(Span::Week),
            "month" | "monthly" | "30" => Ok(Span::Month),
            "quarter" | "quarterly" | "90" => Ok(Span::Quarter),
            _ => Err(ParseError::Span(s.to_string())),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End of the date range that interval numbering starts from.
///
/// - `Ascending`: the earliest dates form "Week 1"; only the latest interval
///   can be short.
/// - `Descending`: the latest dates form "Week 1"; only the earliest interval
///   can be short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    #[default]
    Descending,
}

impl Direction {
    /// Number order that lists intervals from earliest to latest.
    pub fn chronological(self) -> NumberOrder {
        match self {
            Direction::Ascending => NumberOrder::Ascending,
            Direction::Descending => NumberOrder::Descending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }

    pub fn toggle(self) -> Direction {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" | "earliest" => Ok(Direction::Ascending),
            "desc" | "descending" | "latest" => Ok(Direction::Descending),
            _ => Err(ParseError::Direction(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOrder {
    Ascending,
    Descending,
}

/// A labeled run of consecutive active dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub number: u32,
    pub label: String,
    pub span: Span,
    days: Vec<(NaiveDate, u64)>,
}

impl Interval {
    /// `days` must be in ascending date order.
    pub fn new(span: Span, number: u32, days: Vec<(NaiveDate, u64)>) -> Self {
        Self {
            number,
            label: format!("{} {}", span.unit(), number),
            span,
            days,
        }
    }

    /// Member `(date, count)` pairs, earliest first.
    pub fn days(&self) -> &[(NaiveDate, u64)] {
        &self.days
    }

    pub fn start(&self) -> NaiveDate {
        self.days.first().map(|(date, _)| *date).unwrap_or_default()
    }

    pub fn end(&self) -> NaiveDate {
        self.days.last().map(|(date, _)| *date).unwrap_or_default()
    }

    pub fn date_count(&self) -> usize {
        self.days.len()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.binary_search_by_key(&date, |(d, _)| *d).is_ok()
    }

    pub fn total(&self) -> u64 {
        self.days.iter().map(|(_, count)| count).sum()
    }
}

/// Partition the active dates of `counts` into intervals of `span`.
///
/// The result is in traversal order, i.e. number 1 first.
pub fn split_by_interval(counts: &DateCountMap, span: Span, direction: Direction) -> Vec<Interval> {
    let days: Vec<(NaiveDate, u64)> = counts.iter().collect();
    if days.is_empty() {
        return Vec::new();
    }

    let size = span.days();
    let groups: Vec<&[(NaiveDate, u64)]> = match direction {
        Direction::Ascending => days.chunks(size).collect(),
        Direction::Descending => days.rchunks(size).collect(),
    };

    groups
        .into_iter()
        .zip(1u32..)
        .map(|(group, number)| Interval::new(span, number, group.to_vec()))
        .collect()
}

/// Number embedded at the end of an interval label (`"Week 10"` → 10).
pub fn label_number(label: &str) -> Option<u32> {
    label.split_whitespace().next_back()?.parse().ok()
}

fn compare_labels(a: &str, b: &str, order: NumberOrder) -> Ordering {
    let ordering = label_number(a)
        .cmp(&label_number(b))
        .then_with(|| a.cmp(b));
    match order {
        NumberOrder::Ascending => ordering,
        NumberOrder::Descending => ordering.reverse(),
    }
}

/// Sort by the numeric label suffix; `"Week 10"` sorts after `"Week 2"`.
pub fn sort_by_label_number(intervals: &mut [Interval], order: NumberOrder) {
    intervals.sort_by(|a, b| compare_labels(&a.label, &b.label, order));
}

/// Numeric-aware ordering for a list of bare labels (selector lists).
pub fn sort_labels(labels: &mut [String], order: NumberOrder) {
    labels.sort_by(|a, b| compare_labels(a, b, order));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// `n` consecutive active dates starting 2024-01-01, date i has i+1 executions.
    fn consecutive_map(n: usize) -> DateCountMap {
        let start = date("2024-01-01");
        (0..n)
            .map(|i| (start + Duration::days(i as i64), i as u64 + 1))
            .collect()
    }

    fn assert_partition(counts: &DateCountMap, intervals: &[Interval]) {
        let mut seen: Vec<NaiveDate> = intervals
            .iter()
            .flat_map(|i| i.days().iter().map(|(d, _)| *d))
            .collect();
        seen.sort();
        let expected: Vec<NaiveDate> = counts.iter().map(|(date, _)| date).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_from_events_counts_per_date() {
        let tz = chrono_tz::UTC;
        let events = vec![
            Event::new(tz.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(), "AL"),
            Event::new(tz.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap(), "PE"),
            Event::new(tz.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(), "AL"),
        ];
        let counts = DateCountMap::from_events(&events);
        assert_eq!(counts.len(), 2);
        assert_eq!(
            counts.iter().collect::<Vec<_>>(),
            vec![(date("2024-01-01"), 2), (date("2024-01-03"), 1)]
        );
        assert_eq!(counts.total(), events.len() as u64);
    }

    #[test]
    fn test_from_events_large_matches_sequential_count() {
        let tz = chrono_tz::UTC;
        let events: Vec<Event> = (0..5_000)
            .map(|i| {
                let ts = tz.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + Duration::hours(i % 400);
                Event::new(ts, "AL")
            })
            .collect();
        let counts = DateCountMap::from_events(&events);
        assert_eq!(counts.total(), 5_000);
        assert_eq!(counts.len(), 17); // 400 hours span 17 calendar days
    }

    #[test]
    fn test_split_empty_map() {
        let counts = DateCountMap::default();
        for span in Span::all() {
            assert!(split_by_interval(&counts, *span, Direction::Ascending).is_empty());
            assert!(split_by_interval(&counts, *span, Direction::Descending).is_empty());
        }
    }

    #[test]
    fn test_sparse_dates_share_one_interval() {
        let counts: DateCountMap = vec![(date("2024-01-01"), 3), (date("2024-01-10"), 2)]
            .into_iter()
            .collect();
        for direction in [Direction::Ascending, Direction::Descending] {
            let intervals = split_by_interval(&counts, Span::Week, direction);
            assert_eq!(intervals.len(), 1);
            assert_eq!(intervals[0].label, "Week 1");
            assert_eq!(intervals[0].date_count(), 2);
            assert_eq!(intervals[0].total(), 5);
            assert_eq!(intervals[0].start(), date("2024-01-01"));
            assert_eq!(intervals[0].end(), date("2024-01-10"));
        }
    }

    #[test]
    fn test_ascending_short_group_is_latest() {
        let counts = consecutive_map(16);
        let intervals = split_by_interval(&counts, Span::Week, Direction::Ascending);
        let sizes: Vec<usize> = intervals.iter().map(Interval::date_count).collect();
        assert_eq!(sizes, vec![7, 7, 2]);
        assert_eq!(intervals[0].label, "Week 1");
        assert_eq!(intervals[0].start(), date("2024-01-01"));
        assert_eq!(intervals[2].label, "Week 3");
        assert_eq!(intervals[2].end(), date("2024-01-16"));
        assert_partition(&counts, &intervals);
    }

    #[test]
    fn test_descending_short_group_is_earliest() {
        let counts = consecutive_map(16);
        let intervals = split_by_interval(&counts, Span::Week, Direction::Descending);
        let sizes: Vec<usize> = intervals.iter().map(Interval::date_count).collect();
        assert_eq!(sizes, vec![7, 7, 2]);
        assert_eq!(intervals[0].label, "Week 1");
        assert_eq!(intervals[0].end(), date("2024-01-16"));
        assert_eq!(intervals[0].start(), date("2024-01-10"));
        assert_eq!(intervals[2].label, "Week 3");
        assert_eq!(intervals[2].start(), date("2024-01-01"));
        assert_eq!(intervals[2].end(), date("2024-01-02"));
        assert_partition(&counts, &intervals);
    }

    #[test]
    fn test_members_are_ascending_within_interval() {
        let counts = consecutive_map(10);
        for direction in [Direction::Ascending, Direction::Descending] {
            for interval in split_by_interval(&counts, Span::Week, direction) {
                assert!(interval.days().windows(2).all(|w| w[0].0 < w[1].0));
            }
        }
    }

    #[test]
    fn test_gaps_do_not_count_toward_span() {
        // Every third calendar day has data: 7 active dates span 19 calendar days
        let start = date("2024-03-01");
        let counts: DateCountMap = (0..14)
            .map(|i| (start + Duration::days(i * 3), 1))
            .collect();
        let intervals = split_by_interval(&counts, Span::Week, Direction::Ascending);
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].date_count(), 7);
        assert_eq!((intervals[0].end() - intervals[0].start()).num_days(), 18);
    }

    #[test]
    fn test_partition_span_bound_and_conservation() {
        for n in [1, 6, 7, 8, 29, 30, 31, 89, 90, 91, 200] {
            let counts = consecutive_map(n);
            for span in Span::all() {
                for direction in [Direction::Ascending, Direction::Descending] {
                    let intervals = split_by_interval(&counts, *span, direction);
                    assert_partition(&counts, &intervals);

                    let total: u64 = intervals.iter().map(Interval::total).sum();
                    assert_eq!(total, counts.total());

                    let last = intervals.len() - 1;
                    for (i, interval) in intervals.iter().enumerate() {
                        assert!(interval.date_count() <= span.days());
                        if i != last {
                            assert_eq!(interval.date_count(), span.days());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_labels_follow_span_unit() {
        let counts = consecutive_map(100);
        let months = split_by_interval(&counts, Span::Month, Direction::Ascending);
        assert_eq!(months.len(), 4);
        assert_eq!(months[3].label, "Month 4");
        let quarters = split_by_interval(&counts, Span::Quarter, Direction::Descending);
        assert_eq!(quarters.len(), 2);
        assert_eq!(quarters[1].label, "Quarter 2");
        assert_eq!(quarters[1].date_count(), 10);
    }

    #[test]
    fn test_sort_by_label_number_is_numeric() {
        let counts = consecutive_map(7 * 11);
        let mut intervals = split_by_interval(&counts, Span::Week, Direction::Ascending);
        intervals.reverse();

        sort_by_label_number(&mut intervals, NumberOrder::Ascending);
        let labels: Vec<&str> = intervals.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels[0], "Week 1");
        assert_eq!(labels[1], "Week 2");
        assert_eq!(labels[9], "Week 10");
        assert_eq!(labels[10], "Week 11");
        assert!(intervals.windows(2).all(|w| w[0].number < w[1].number));

        sort_by_label_number(&mut intervals, NumberOrder::Descending);
        assert_eq!(intervals[0].label, "Week 11");
        assert!(intervals.windows(2).all(|w| w[0].number > w[1].number));
    }

    #[test]
    fn test_sort_labels_numeric() {
        let mut labels: Vec<String> = ["Week 10", "Week 2", "Week 1", "Week 21"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_labels(&mut labels, NumberOrder::Ascending);
        assert_eq!(labels, vec!["Week 1", "Week 2", "Week 10", "Week 21"]);
    }

    #[test]
    fn test_label_number() {
        assert_eq!(label_number("Week 10"), Some(10));
        assert_eq!(label_number("Quarter 3 "), Some(3));
        assert_eq!(label_number("Week"), None);
        assert_eq!(label_number(""), None);
    }

    #[test]
    fn test_chronological_for_both_directions() {
        let counts = consecutive_map(20);
        for direction in [Direction::Ascending, Direction::Descending] {
            let mut ordered = split_by_interval(&counts, Span::Week, direction);
            sort_by_label_number(&mut ordered, direction.chronological());
            assert!(ordered.windows(2).all(|w| w[0].end() < w[1].start()));
        }
    }

    #[test]
    fn test_span_and_direction_parse() {
        assert_eq!("Month".parse::<Span>().unwrap(), Span::Month);
        assert_eq!("90".parse::<Span>().unwrap(), Span::Quarter);
        assert!("fortnight".parse::<Span>().is_err());
        assert_eq!("asc".parse::<Direction>().unwrap(), Direction::Ascending);
        assert_eq!("Descending".parse::<Direction>().unwrap(), Direction::Descending);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
