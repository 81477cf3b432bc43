//! Event filters
//!
//! Each filter consumes an event set and returns the subset it keeps. Filter
//! selection is a closed set of variants; string inputs are parsed up front so
//! an unknown mode is rejected by the caller instead of being misapplied.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::normalizer::Event;
use crate::ParseError;

/// Day the calculator was opened to the public. Earlier executions came from
/// token holders only.
pub const PUBLIC_LAUNCH_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2024, 8, 26) {
    Some(date) => date,
    None => panic!("invalid launch date"),
};

/// Selector value meaning "every state".
pub const ALL_CATEGORIES: &str = "Geral";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => event.category == *category,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Only(category) => category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Category(s.to_string()));
        }
        if trimmed.eq_ignore_ascii_case(ALL_CATEGORIES) || trimmed.eq_ignore_ascii_case("all") {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(trimmed.to_string()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Date-based cut of the event set around a fixed cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutoffFilter {
    #[default]
    All,
    /// Keeps events strictly before the date.
    Before(NaiveDate),
    /// Keeps events on or after the date.
    After(NaiveDate),
}

impl CutoffFilter {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            CutoffFilter::All => true,
            CutoffFilter::Before(cutoff) => event.date() < *cutoff,
            CutoffFilter::After(cutoff) => event.date() >= *cutoff,
        }
    }
}

/// The three views the dashboard offers over the execution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataView {
    /// Executions since the public launch.
    #[default]
    Public,
    /// Every execution.
    Total,
    /// Executions from the token-only period before launch.
    Token,
}

impl DataView {
    pub fn all() -> &'static [DataView] {
        &[DataView::Public, DataView::Total, DataView::Token]
    }

    pub fn cutoff(self) -> CutoffFilter {
        match self {
            DataView::Public => CutoffFilter::After(PUBLIC_LAUNCH_DATE),
            DataView::Total => CutoffFilter::All,
            DataView::Token => CutoffFilter::Before(PUBLIC_LAUNCH_DATE),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataView::Public => "public",
            DataView::Total => "total",
            DataView::Token => "token",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DataView::Public => "Open to the public",
            DataView::Total => "All data",
            DataView::Token => "With token",
        }
    }

    /// Per-state breakdowns are not shown for token requests.
    pub fn shows_states(self) -> bool {
        self != DataView::Token
    }

    pub fn next(self) -> DataView {
        match self {
            DataView::Public => DataView::Total,
            DataView::Total => DataView::Token,
            DataView::Token => DataView::Public,
        }
    }
}

impl FromStr for DataView {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" | "aberto" => Ok(DataView::Public),
            "total" | "all" => Ok(DataView::Total),
            "token" => Ok(DataView::Token),
            _ => Err(ParseError::View(s.to_string())),
        }
    }
}

impl fmt::Display for DataView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn filter_by_category(mut events: Vec<Event>, filter: &CategoryFilter) -> Vec<Event> {
    if let CategoryFilter::Only(_) = filter {
        events.retain(|event| filter.matches(event));
    }
    events
}

pub fn filter_by_cutoff(mut events: Vec<Event>, filter: CutoffFilter) -> Vec<Event> {
    if filter != CutoffFilter::All {
        events.retain(|event| filter.matches(event));
    }
    events
}

/// Distinct informed categories, sorted. Feeds the state selector.
pub fn available_categories(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter(|event| !event.is_unset())
        .map(|event| event.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::UNSET_CATEGORY;
    use chrono::TimeZone;

    fn event(date: &str, category: &str) -> Event {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let ts = chrono_tz::UTC
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .unwrap();
        Event::new(ts, category)
    }

    fn straddling_events() -> Vec<Event> {
        vec![
            event("2024-08-20", "AL"),
            event("2024-08-25", "PE"),
            event("2024-08-25", "AL"),
            event("2024-08-26", "AL"),
            event("2024-08-26", UNSET_CATEGORY),
            event("2024-09-02", "SE"),
        ]
    }

    #[test]
    fn test_category_all_is_identity() {
        let events = straddling_events();
        let filtered = filter_by_category(events.clone(), &CategoryFilter::All);
        assert_eq!(filtered, events);
    }

    #[test]
    fn test_category_exact_match() {
        let filtered = filter_by_category(
            straddling_events(),
            &CategoryFilter::Only("AL".to_string()),
        );
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|e| e.category == "AL"));

        let none = filter_by_category(straddling_events(), &CategoryFilter::Only("al".into()));
        assert!(none.is_empty());
    }

    #[test]
    fn test_category_filter_parse() {
        assert_eq!("Geral".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            " AL ".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only("AL".to_string())
        );
        assert!("".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_cutoff_after_is_inclusive() {
        let after = filter_by_cutoff(straddling_events(), CutoffFilter::After(PUBLIC_LAUNCH_DATE));
        assert_eq!(after.len(), 3);
        assert!(after.iter().all(|e| e.date() >= PUBLIC_LAUNCH_DATE));
    }

    #[test]
    fn test_cutoff_before_and_after_partition_the_input() {
        let events = straddling_events();
        let before = filter_by_cutoff(events.clone(), CutoffFilter::Before(PUBLIC_LAUNCH_DATE));
        let after = filter_by_cutoff(events.clone(), CutoffFilter::After(PUBLIC_LAUNCH_DATE));

        assert_eq!(before.len(), 3);
        assert!(before.iter().all(|e| e.date() < PUBLIC_LAUNCH_DATE));
        assert!(before.iter().all(|b| !after.contains(b)));
        assert_eq!(before.len() + after.len(), events.len());

        let mut union: Vec<Event> = before.into_iter().chain(after).collect();
        union.sort_by_key(|e| (e.timestamp, e.category.clone()));
        let mut expected = events;
        expected.sort_by_key(|e| (e.timestamp, e.category.clone()));
        assert_eq!(union, expected);
    }

    #[test]
    fn test_cutoff_all_is_identity() {
        let events = straddling_events();
        assert_eq!(filter_by_cutoff(events.clone(), CutoffFilter::All), events);
    }

    #[test]
    fn test_data_view_mapping() {
        assert_eq!(DataView::Public.cutoff(), CutoffFilter::After(PUBLIC_LAUNCH_DATE));
        assert_eq!(DataView::Total.cutoff(), CutoffFilter::All);
        assert_eq!(DataView::Token.cutoff(), CutoffFilter::Before(PUBLIC_LAUNCH_DATE));
        assert_eq!("TOKEN".parse::<DataView>().unwrap(), DataView::Token);
        assert!("everything".parse::<DataView>().is_err());
        assert_eq!(DataView::Token.next(), DataView::Public);
    }

    #[test]
    fn test_token_view_hides_states() {
        assert!(DataView::Public.shows_states());
        assert!(DataView::Total.shows_states());
        assert!(!DataView::Token.shows_states());
    }

    #[test]
    fn test_available_categories_sorted_without_sentinel() {
        let categories = available_categories(&straddling_events());
        assert_eq!(categories, vec!["AL", "PE", "SE"]);
        assert!(available_categories(&[]).is_empty());
    }
}
