//! Disk cache of the last fetched payload.
//!
//! Lets consecutive invocations reuse one fetch and lets the dashboard paint
//! the previous data immediately while a fresh copy loads.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use execstats_core::RawRecord;
use serde::{Deserialize, Serialize};

fn cache_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".cache").join("execstats"))
}

fn cache_file() -> Option<PathBuf> {
    cache_dir().map(|d| d.join("records-cache.json"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedRecords {
    /// Milliseconds since the Unix epoch.
    timestamp: i64,
    endpoint: String,
    records: Vec<RawRecord>,
}

#[derive(Debug, Clone)]
pub struct CachedPayload {
    pub records: Vec<RawRecord>,
    pub fetched_at: DateTime<Utc>,
}

pub enum CacheResult {
    /// Same endpoint and younger than the TTL
    Fresh(CachedPayload),
    /// Same endpoint but older than the TTL
    Stale(CachedPayload),
    /// Missing, unreadable, or saved for another endpoint
    Miss,
}

pub fn load_cache(endpoint: &str, ttl: Duration) -> CacheResult {
    match cache_file() {
        Some(path) => load_cache_from(&path, endpoint, ttl, Utc::now()),
        None => CacheResult::Miss,
    }
}

pub fn save_cache(endpoint: &str, records: &[RawRecord]) {
    if let Some(path) = cache_file() {
        save_cache_to(&path, endpoint, records, Utc::now());
    }
}

fn load_cache_from(path: &Path, endpoint: &str, ttl: Duration, now: DateTime<Utc>) -> CacheResult {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return CacheResult::Miss,
    };
    let cached: CachedRecords = match serde_json::from_reader(BufReader::new(file)) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!("discarding unreadable cache {}: {}", path.display(), e);
            return CacheResult::Miss;
        }
    };

    if cached.endpoint != endpoint {
        return CacheResult::Miss;
    }

    let Some(fetched_at) = DateTime::from_timestamp_millis(cached.timestamp) else {
        return CacheResult::Miss;
    };

    let payload = CachedPayload {
        records: cached.records,
        fetched_at,
    };

    if now - fetched_at < ttl {
        CacheResult::Fresh(payload)
    } else {
        CacheResult::Stale(payload)
    }
}

fn save_cache_to(path: &Path, endpoint: &str, records: &[RawRecord], now: DateTime<Utc>) {
    if let Some(dir) = path.parent() {
        if fs::create_dir_all(dir).is_err() {
            return;
        }
    }

    let cached = CachedRecords {
        timestamp: now.timestamp_millis(),
        endpoint: endpoint.to_string(),
        records: records.to_vec(),
    };

    // Write to temp file first, then rename (atomic)
    let temp_path = path.with_extension("json.tmp");
    let file = match File::create(&temp_path) {
        Ok(f) => f,
        Err(_) => return,
    };

    if serde_json::to_writer(BufWriter::new(file), &cached).is_ok() {
        if fs::rename(&temp_path, path).is_err() {
            let _ = fs::copy(&temp_path, path);
            let _ = fs::remove_file(&temp_path);
        }
    } else {
        let _ = fs::remove_file(&temp_path);
    }
}
