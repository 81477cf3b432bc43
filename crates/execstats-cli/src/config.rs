use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono_tz::Tz;
use execstats_core::{
    parse_timezone, ParseError, DEFAULT_CACHE_TTL_SECS, DEFAULT_ENDPOINT, DEFAULT_HOURLY_RATE,
    DEFAULT_TIMEZONE,
};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const ENDPOINT_ENV: &str = "EXECSTATS_ENDPOINT";

static CONFIG: OnceLock<ExecstatsConfig> = OnceLock::new();

/// `~/.execstats`
///
/// ```toml
/// endpoint = "https://example.org/api/v1/execution"
/// timezone = "America/Maceio"
/// hourly_rate = "120.00"
/// cache_ttl_secs = 600
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecstatsConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    pub cache_ttl_secs: Option<i64>,
}

impl ExecstatsConfig {
    fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".execstats"))
    }

    pub fn load() -> &'static ExecstatsConfig {
        CONFIG.get_or_init(|| {
            let Some(content) = Self::config_path().and_then(|path| fs::read_to_string(path).ok())
            else {
                return Self::default();
            };
            match Self::from_toml(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("ignoring malformed ~/.execstats: {}", e);
                    Self::default()
                }
            }
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Priority: EXECSTATS_ENDPOINT > ~/.execstats > built-in default.
    pub fn endpoint(&self) -> String {
        std::env::var(ENDPOINT_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    pub fn timezone(&self) -> Result<Tz, ParseError> {
        match &self.timezone {
            Some(name) => parse_timezone(name),
            None => Ok(DEFAULT_TIMEZONE),
        }
    }

    pub fn hourly_rate(&self) -> Decimal {
        self.hourly_rate
            .filter(|rate| rate.is_sign_positive())
            .unwrap_or(DEFAULT_HOURLY_RATE)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        let secs = self
            .cache_ttl_secs
            .filter(|secs| *secs >= 0)
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);
        chrono::Duration::seconds(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serial_test::serial;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ExecstatsConfig::from_toml("").unwrap();
        assert_eq!(config.timezone().unwrap(), DEFAULT_TIMEZONE);
        assert_eq!(config.hourly_rate(), DEFAULT_HOURLY_RATE);
        assert_eq!(config.cache_ttl(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_config_values() {
        let config = ExecstatsConfig::from_toml(
            r#"
            endpoint = "http://localhost:8080/api/v1/execution"
            timezone = "UTC"
            hourly_rate = "120.50"
            cache_ttl_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.timezone().unwrap(), chrono_tz::UTC);
        assert_eq!(config.hourly_rate(), dec!(120.50));
        assert_eq!(config.cache_ttl(), chrono::Duration::seconds(30));
    }

    #[test]
    fn test_invalid_values_fall_back_or_error() {
        let config = ExecstatsConfig::from_toml(
            r#"
            timezone = "Nowhere/Special"
            hourly_rate = "-1"
            cache_ttl_secs = -5
            "#,
        )
        .unwrap();
        assert!(config.timezone().is_err());
        assert_eq!(config.hourly_rate(), DEFAULT_HOURLY_RATE);
        assert_eq!(config.cache_ttl(), chrono::Duration::minutes(5));

        assert!(ExecstatsConfig::from_toml("endpoint = [").is_err());
    }

    #[test]
    #[serial]
    fn test_endpoint_priority() {
        std::env::remove_var(ENDPOINT_ENV);
        let config = ExecstatsConfig::from_toml(r#"endpoint = "http://from-config""#).unwrap();
        assert_eq!(config.endpoint(), "http://from-config");
        assert_eq!(ExecstatsConfig::default().endpoint(), DEFAULT_ENDPOINT);

        std::env::set_var(ENDPOINT_ENV, "http://from-env");
        assert_eq!(config.endpoint(), "http://from-env");

        std::env::set_var(ENDPOINT_ENV, "  ");
        assert_eq!(config.endpoint(), "http://from-config");
        std::env::remove_var(ENDPOINT_ENV);
    }
}
