//! Raw execution record normalization
//!
//! Converts the loosely-typed records returned by the execution endpoint into
//! [`Event`]s. Ingestion is best-effort: records without a usable timestamp are
//! dropped and only counted, never reported individually.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Category the service reports when the requester did not inform a state.
pub const UNSET_CATEGORY: &str = "Não informado";

/// Timezone the dashboard has always displayed dates in.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Sao_Paulo;

/// Naive layouts accepted when a timestamp carries no offset (read as UTC).
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset layouts that RFC 3339 parsing rejects (e.g. `+0000` without colon).
const OFFSET_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// One record as delivered by the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "timeStamp", default, skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl RawRecord {
    pub fn new(time_stamp: &str, state: &str) -> Self {
        Self {
            time_stamp: Some(time_stamp.to_string()),
            state: Some(state.to_string()),
            duration: None,
        }
    }

    /// Lenient extraction from an arbitrary JSON value.
    ///
    /// Returns `None` only when the value is not an object. Fields of the wrong
    /// type are treated as absent so one bad field never rejects the batch.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;

        let duration = object.get("duration").and_then(|d| match d {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        });

        Some(Self {
            time_stamp: object
                .get("timeStamp")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
            state: object
                .get("state")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
            duration,
        })
    }
}

/// A normalized execution: when it happened (in the display timezone) and
/// which state requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub timestamp: DateTime<Tz>,
    pub category: String,
}

impl Event {
    pub fn new(timestamp: DateTime<Tz>, category: impl Into<String>) -> Self {
        Self {
            timestamp,
            category: category.into(),
        }
    }

    /// Calendar date in the timezone the event was normalized to.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    pub fn is_unset(&self) -> bool {
        self.category == UNSET_CATEGORY
    }
}

/// Result of one normalization pass.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub events: Vec<Event>,
    pub dropped: usize,
}

/// Parse an ISO-8601 timestamp into a UTC instant.
///
/// Strings without an offset are taken as UTC; a bare date is midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(raw, layout) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Normalize a single record, or `None` when its timestamp is unusable.
pub fn normalize_record(record: &RawRecord, tz: Tz) -> Option<Event> {
    let instant = parse_timestamp(record.time_stamp.as_deref()?)?;

    let category = match record.state.as_deref().map(str::trim) {
        Some(state) if !state.is_empty() => state.to_string(),
        _ => UNSET_CATEGORY.to_string(),
    };

    Some(Event::new(instant.with_timezone(&tz), category))
}

pub fn normalize_records(records: &[RawRecord], tz: Tz) -> Normalized {
    let events: Vec<Event> = records
        .iter()
        .filter_map(|record| normalize_record(record, tz))
        .collect();
    let dropped = records.len() - events.len();

    if dropped > 0 {
        tracing::debug!(dropped, kept = events.len(), "dropped records with unusable timestamps");
    }

    Normalized { events, dropped }
}
