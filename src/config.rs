//! Run configuration.
//!
//! A [`ScrapeConfig`] is an explicit value handed to every producer and
//! scraper constructor; nothing in this crate reads process-wide mutable
//! state. Defaults match the original operator settings (3 pages, 2 s
//! inter-page delay, 30 s request timeout, 3 retries, 5 concurrent detail
//! fetches). A YAML file can override the defaults, and CLI flags override
//! the file.

use crate::errors::ScrapeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Settings for one production run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Number of listing pages to request.
    pub pages: u32,
    /// Seconds to wait between page fetches (skipped before the first page).
    pub delay_secs: f64,
    /// Listing pages grouped into one combined batch by the batch producer.
    pub batch_size: usize,
    /// Concurrency limit for detail sub-fetches within one page.
    pub max_concurrent: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Retry attempts per fetch before a page is recorded as failed.
    pub max_retries: usize,
    pub user_agent: String,
    /// Fetch date/author/body from each article's detail page.
    pub fetch_details: bool,
    /// Country slug for the indicators site.
    pub country: String,
    /// Symbols for the fundamentals site.
    pub symbols: Vec<String>,
    /// Symbols fetched per page of the fundamentals site.
    pub symbols_per_page: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            pages: 3,
            delay_secs: 2.0,
            batch_size: 10,
            max_concurrent: 5,
            request_timeout_secs: 30,
            max_retries: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_details: true,
            country: "india".to_string(),
            symbols: Vec::new(),
            symbols_per_page: 10,
        }
    }
}

impl ScrapeConfig {
    /// Load settings from a YAML file, leaving unlisted fields at defaults.
    pub fn load(path: &str) -> Result<Self, ScrapeError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScrapeError::Config(format!("cannot read {path}: {e}")))?;
        let config: ScrapeConfig = serde_yaml::from_str(&raw)
            .map_err(|e| ScrapeError::Config(format!("cannot parse {path}: {e}")))?;
        info!(path, "Loaded configuration file");
        config.validated()
    }

    /// Reject settings a run cannot honor.
    pub fn validated(self) -> Result<Self, ScrapeError> {
        if self.pages == 0 {
            return Err(ScrapeError::Config("pages must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ScrapeError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(ScrapeError::Config(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.delay_secs < 0.0 {
            return Err(ScrapeError::Config(
                "delay_secs must not be negative".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScrapeConfig::default().validated().unwrap();
        assert_eq!(config.pages, 3);
        assert_eq!(config.delay(), Duration::from_secs(2));
        assert_eq!(config.max_retries, 3);
        assert!(config.fetch_details);
    }

    #[test]
    fn test_zero_pages_rejected() {
        let config = ScrapeConfig {
            pages: 0,
            ..Default::default()
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = ScrapeConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = "pages: 12\ndelay_secs: 0.5\n";
        let config: ScrapeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pages, 12);
        assert_eq!(config.delay_secs, 0.5);
        // untouched fields keep their defaults
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.country, "india");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = ScrapeConfig::load("/nonexistent/market_harvest.yaml").unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }
}
