//! Execution record source
//!
//! Fetches the raw execution log over HTTP (or reads a saved copy) and keeps
//! the last payload in a time-bounded [`FetchCache`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::normalizer::RawRecord;

pub const DEFAULT_ENDPOINT: &str =
    "https://apiresidenciaadministrativa.jfal.jus.br/api/v1/execution";

/// Payloads younger than this are reused instead of refetched.
pub const DEFAULT_CACHE_TTL_SECS: i64 = 5 * 60;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("payload is not a JSON array of records: {0}")]
    Payload(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn build_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(format!("execstats/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(FetchError::Client)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Parse a raw payload. Only a non-array payload is an error; elements that
/// are not objects are skipped.
pub fn parse_payload(bytes: &mut [u8]) -> Result<Vec<RawRecord>, FetchError> {
    let value: serde_json::Value =
        simd_json::from_slice(bytes).map_err(|e| FetchError::Payload(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(FetchError::Payload(format!(
                "expected an array, found {}",
                json_kind(&other)
            )))
        }
    };

    let records: Vec<RawRecord> = items.iter().filter_map(RawRecord::from_value).collect();
    let skipped = items.len() - records.len();
    if skipped > 0 {
        tracing::debug!(skipped, "skipped payload elements that are not objects");
    }

    Ok(records)
}

/// One GET against the endpoint. No retries.
pub async fn fetch_records(client: &reqwest::Client, url: &str) -> Result<Vec<RawRecord>, FetchError> {
    tracing::debug!(url, "fetching execution records");

    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })?;

    let mut bytes = body.to_vec();
    let records = parse_payload(&mut bytes)?;
    tracing::debug!(records = records.len(), "fetched execution records");
    Ok(records)
}

/// Read a payload previously saved from the endpoint.
pub fn load_records_file(path: &Path) -> Result<Vec<RawRecord>, FetchError> {
    let mut bytes = std::fs::read(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_payload(&mut bytes)
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

/// Last fetched payload and when it was fetched.
#[derive(Debug, Clone)]
pub struct FetchCache<T> {
    entry: Option<CacheEntry<T>>,
}

impl<T> Default for FetchCache<T> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<T> FetchCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(payload: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            entry: Some(CacheEntry {
                payload,
                fetched_at,
            }),
        }
    }

    pub fn entry(&self) -> Option<&CacheEntry<T>> {
        self.entry.as_ref()
    }

    /// Return the cached payload if younger than `ttl`, otherwise run
    /// `refresh` and store its result.
    ///
    /// A failed refresh leaves the previous entry in place.
    pub async fn get_or_refresh<F, Fut, E>(
        &mut self,
        now: DateTime<Utc>,
        ttl: Duration,
        refresh: F,
    ) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let entry = match self.entry.take() {
            Some(entry) if entry.is_fresh(now, ttl) => entry,
            stale => match refresh().await {
                Ok(payload) => CacheEntry {
                    payload,
                    fetched_at: now,
                },
                Err(err) => {
                    self.entry = stale;
                    return Err(err);
                }
            },
        };

        Ok(&self.entry.insert(entry).payload)
    }
}
