//! Aggregation over dates and intervals
//!
//! Totals, running totals and period-over-period deltas per interval, plus the
//! hour-of-day and per-state breakdowns shown next to them.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::bucketer::{DateCountMap, Interval};
use crate::metrics::{delta_percent, AggregateMetrics};
use crate::normalizer::Event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalSummary {
    pub number: u32,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub date_count: usize,
    pub total: u64,
    /// Executions from the earliest interval up to and including this one.
    pub cumulative_total: u64,
    pub metrics: AggregateMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySummary {
    pub total: u64,
    pub active_days: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub average_per_active_day: Decimal,
    pub busiest_day: Option<(NaiveDate, u64)>,
}

/// Summaries in the same order as `intervals`.
///
/// Deltas and running totals follow chronological order, so the result does
/// not depend on how the intervals were numbered or sorted.
pub fn summarize_intervals(intervals: &[Interval], hourly_rate: Decimal) -> Vec<IntervalSummary> {
    let mut chronological: Vec<usize> = (0..intervals.len()).collect();
    chronological.sort_by_key(|&i| intervals[i].start());

    let mut slots: Vec<Option<IntervalSummary>> = vec![None; intervals.len()];
    let mut running = 0u64;
    let mut previous: Option<u64> = None;

    for index in chronological {
        let interval = &intervals[index];
        let total = interval.total();
        running = running.saturating_add(total);

        slots[index] = Some(IntervalSummary {
            number: interval.number,
            label: interval.label.clone(),
            start: interval.start(),
            end: interval.end(),
            date_count: interval.date_count(),
            total,
            cumulative_total: running,
            metrics: AggregateMetrics::from_count(total, hourly_rate)
                .with_delta(delta_percent(total, previous)),
        });
        previous = Some(total);
    }

    slots.into_iter().flatten().collect()
}

/// Executions per hour of the day (0-23) in the events' timezone.
pub fn hourly_distribution(events: &[Event]) -> [u64; 24] {
    let mut hours = [0u64; 24];
    for event in events {
        // hour() is always < 24
        if let Some(slot) = hours.get_mut(event.hour() as usize) {
            *slot += 1;
        }
    }
    hours
}

/// Executions per informed state, largest first.
pub fn category_totals(events: &[Event]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, u64> = HashMap::with_capacity(32);
    for event in events {
        if !event.is_unset() {
            *totals.entry(event.category.as_str()).or_default() += 1;
        }
    }

    let mut result: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, count)| CategoryTotal {
            category: category.to_string(),
            count,
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    result
}

pub fn calculate_summary(counts: &DateCountMap) -> ActivitySummary {
    let total = counts.total();
    let active_days = counts.len();

    let busiest_day = counts
        .iter()
        .fold(None, |best: Option<(NaiveDate, u64)>, (date, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((date, count)),
        });

    ActivitySummary {
        total,
        active_days,
        first_date: counts.first_date(),
        last_date: counts.last_date(),
        average_per_active_day: if active_days > 0 {
            Decimal::from(total) / Decimal::from(active_days as u64)
        } else {
            Decimal::ZERO
        },
        busiest_day,
    }
}
