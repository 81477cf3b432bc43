use std::path::PathBuf;

use anyhow::Result;
use execstats_core::source::{build_client, fetch_records, load_records_file};
use execstats_core::{FetchError, RawRecord};
use tokio::runtime::Runtime;

use crate::cache::{self, CacheResult, CachedPayload};

/// Where execution records come from.
#[derive(Debug, Clone)]
pub enum RecordSource {
    /// A payload saved to disk (`--input`).
    File(PathBuf),
    Endpoint { url: String, use_cache: bool },
}

impl RecordSource {
    pub fn describe(&self) -> String {
        match self {
            RecordSource::File(path) => path.display().to_string(),
            RecordSource::Endpoint { url, .. } => url.clone(),
        }
    }
}

pub struct DataLoader {
    source: RecordSource,
    ttl: chrono::Duration,
    client: Option<reqwest::Client>,
}

impl DataLoader {
    pub fn new(source: RecordSource, ttl: chrono::Duration) -> Self {
        Self {
            source,
            ttl,
            client: None,
        }
    }

    pub fn source(&self) -> &RecordSource {
        &self.source
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Payload left on disk by an earlier run, regardless of age.
    pub fn cached(&self) -> Option<(CachedPayload, bool)> {
        match &self.source {
            RecordSource::Endpoint {
                url,
                use_cache: true,
            } => match cache::load_cache(url, self.ttl) {
                CacheResult::Fresh(payload) => Some((payload, true)),
                CacheResult::Stale(payload) => Some((payload, false)),
                CacheResult::Miss => None,
            },
            _ => None,
        }
    }

    /// One-shot load for the non-interactive commands.
    pub fn load(&mut self, rt: &Runtime) -> Result<Vec<RawRecord>> {
        if let Some((payload, true)) = self.cached() {
            tracing::debug!(
                records = payload.records.len(),
                fetched_at = %payload.fetched_at,
                "using cached payload"
            );
            return Ok(payload.records);
        }

        Ok(rt.block_on(self.fetch())?)
    }

    /// Read the source, bypassing any cache. Successful endpoint fetches are
    /// written back to the disk cache.
    pub async fn fetch(&mut self) -> Result<Vec<RawRecord>, FetchError> {
        match &self.source {
            RecordSource::File(path) => load_records_file(path),
            RecordSource::Endpoint { url, use_cache } => {
                let client = match &self.client {
                    Some(client) => client.clone(),
                    None => {
                        let client = build_client()?;
                        self.client = Some(client.clone());
                        client
                    }
                };
                let records = fetch_records(&client, url).await?;
                if *use_cache {
                    cache::save_cache(url, &records);
                }
                Ok(records)
            }
        }
    }
}
