//! HTTP fetching with exponential backoff retry logic.
//!
//! Every page and detail request in this crate goes through this module.
//! It uses a trait-based design so retry behavior composes with any
//! fetcher:
//! - [`TextFetch`]: core trait for fetching a URL's body as text
//! - [`WebClient`]: reqwest-backed implementation with the run's
//!   user agent and timeout applied
//! - [`RetryFetch`]: decorator that adds retry logic to any `TextFetch`
//!
//! # Retry Strategy
//!
//! - Configurable retry attempts (3 by default, matching the run config)
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::config::ScrapeConfig;
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Trait for fetching a URL body as text.
pub trait TextFetch {
    async fn get_text(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// Shared HTTP client carrying the run's user agent and request timeout.
///
/// Cloning is cheap; the inner reqwest client is reference-counted.
#[derive(Debug, Clone)]
pub struct WebClient {
    client: reqwest::Client,
}

impl WebClient {
    /// Build a client from the run configuration.
    pub fn new(config: &ScrapeConfig) -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client })
    }
}

impl TextFetch for WebClient {
    #[instrument(level = "debug", skip(self))]
    async fn get_text(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, elapsed_ms = t0.elapsed().as_millis() as u128, "Non-success response");
            return Err(format!("HTTP {status} for {url}").into());
        }
        let body = response.text().await?;
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`TextFetch`]
/// implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: TextFetch,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> TextFetch for RetryFetch<T>
where
    T: TextFetch,
{
    #[instrument(level = "debug", skip(self))]
    async fn get_text(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.get_text(url).await {
                Ok(body) => {
                    return Ok(body);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            %url,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "get_text() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        %url,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "get_text() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Fetch a URL with the run's retry policy applied.
///
/// This is the entry point the scrapers use for listing and detail pages.
pub async fn get_with_backoff(
    client: &WebClient,
    url: &str,
    max_retries: usize,
) -> Result<String, Box<dyn Error>> {
    let api = RetryFetch::new(client.clone(), max_retries, StdDuration::from_secs(1));
    api.get_text(url).await
}
