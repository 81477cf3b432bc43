//! Derived metrics and their display formatting
//!
//! Every execution stands for a fixed amount of manual work saved. Derivation
//! works on exact decimals; rounding only happens in the `format_*` helpers.

use chrono::{NaiveDate, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;

/// Hours of manual calculation replaced by one execution.
pub const HOURS_PER_EXECUTION: Decimal = dec!(2.5);

/// Default cost of one hour of staff time, in BRL.
pub const DEFAULT_HOURLY_RATE: Decimal = dec!(99.91);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateMetrics {
    pub total_count: u64,
    pub derived_hours: Decimal,
    pub derived_currency: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_percent: Option<Decimal>,
}

impl AggregateMetrics {
    pub fn from_count(count: u64, hourly_rate: Decimal) -> Self {
        Self {
            total_count: count,
            derived_hours: hours(count),
            derived_currency: currency(count, hourly_rate),
            delta_percent: None,
        }
    }

    pub fn with_delta(mut self, delta_percent: Option<Decimal>) -> Self {
        self.delta_percent = delta_percent;
        self
    }
}

pub fn hours(count: u64) -> Decimal {
    Decimal::from(count) * HOURS_PER_EXECUTION
}

pub fn currency(count: u64, hourly_rate: Decimal) -> Decimal {
    hours(count) * hourly_rate
}

/// Percentage change from `previous` to `current`.
///
/// `None` when there is no previous period or it had no executions.
pub fn delta_percent(current: u64, previous: Option<u64>) -> Option<Decimal> {
    let previous = previous.filter(|total| *total > 0)?;
    let ratio = Decimal::from(current).checked_div(Decimal::from(previous))?;
    Some((ratio - Decimal::ONE) * Decimal::ONE_HUNDRED)
}

pub fn round_for_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Insert `.` between groups of three digits.
pub fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push('.');
        }
        result.push(c);
    }
    result
}

fn format_with_decimals(value: Decimal, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut result = String::with_capacity(text.len() + whole.len() / 3 + 1);
    if value.is_sign_negative() && !value.is_zero() {
        result.push('-');
    }
    result.push_str(&group_thousands(whole));
    if let Some(fraction) = fraction {
        result.push(',');
        result.push_str(fraction);
    }
    result
}

/// `1234.5` → `"1.234,50"`, `2500` → `"2.500"`.
///
/// Integral values (after rounding to cents) drop the decimals entirely.
pub fn format_decimal(value: Decimal) -> String {
    let rounded = round_for_display(value);
    if rounded.fract().is_zero() {
        format_with_decimals(rounded, 0)
    } else {
        format_with_decimals(rounded, 2)
    }
}

pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}

pub fn format_hours(hours: Decimal) -> String {
    format_decimal(hours)
}

pub fn format_currency(amount: Decimal) -> String {
    format!("R$ {}", format_decimal(amount))
}

/// Deltas always carry two decimals: `"-12,50 %"`.
pub fn format_delta(delta: Decimal) -> String {
    format!("{} %", format_with_decimals(round_for_display(delta), 2))
}

/// `dd/mm`, as the day axis of the per-day chart.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}

/// Three-letter Portuguese weekday (`seg`, `ter`, ...).
pub fn format_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "seg",
        Weekday::Tue => "ter",
        Weekday::Wed => "qua",
        Weekday::Thu => "qui",
        Weekday::Fri => "sex",
        Weekday::Sat => "sáb",
        Weekday::Sun => "dom",
    }
}
