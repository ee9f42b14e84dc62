//! Lazy page production.
//!
//! The scrapers in this crate can pull hundreds of listing pages; holding
//! every record in memory for the whole run is the naive baseline, not the
//! default. This module provides the pull-based producers the sinks consume:
//!
//! - [`PageProducer`]: one [`PageBatch`] per listing page, fetched strictly
//!   in page order with a polite inter-page delay. Holds one page of
//!   records at a time.
//! - [`BatchProducer`]: groups a fixed number of consecutive page batches
//!   into one [`CombinedBatch`] before handing it over. Holds at most
//!   `batch_size` pages at a time.
//! - [`collect_all`]: the eager baseline that drains a producer into one
//!   `Vec`. Memory cost is linear in the total record count; fine for small
//!   jobs, the producers exist for everything else.
//!
//! Both producers expose the same pull contract through [`BatchStream`], so
//! a sink does not care which granularity it is fed.
//!
//! A page that fails after the source's retries are exhausted is logged,
//! counted, and replaced by an empty batch; the run continues. Only
//! malformed-request errors abort the sequence.

use crate::errors::{FetchError, ScrapeError};
use crate::models::Record;
use crate::summary::JobSummary;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// One page's worth of fetched records plus the source's pagination signal.
#[derive(Debug)]
pub struct PageFetch<R> {
    pub records: Vec<R>,
    /// Whether the source believes further pages exist. `false` ends the
    /// run early even if fewer than the requested pages were produced.
    pub has_more: bool,
}

/// A paged record source: the actual network fetch and field extraction.
///
/// Implementations retry transient failures internally and surface
/// [`FetchError::PageFailed`] only once retries are exhausted.
pub trait PageSource {
    type Item: Record;

    async fn fetch_page(&self, page: u32) -> Result<PageFetch<Self::Item>, FetchError>;
}

/// All records from one source page, tagged with its page index.
#[derive(Debug)]
pub struct PageBatch<R> {
    pub page: u32,
    pub records: Vec<R>,
}

/// Concatenation of consecutive page batches, tagged with the page span.
#[derive(Debug)]
pub struct CombinedBatch<R> {
    pub first_page: u32,
    pub last_page: u32,
    pub records: Vec<R>,
}

/// The pull contract sinks consume: either producer, one batch at a time.
pub trait BatchStream {
    type Item: Record;

    /// Produce the next batch of records, or `None` once the run is over.
    async fn next_batch(&mut self) -> Result<Option<Vec<Self::Item>>, ScrapeError>;
}

/// Pulls pages `1..=pages` from a [`PageSource`], one at a time.
///
/// Cursor state is owned by this value; a new run means a new producer.
/// Once exhausted (or after a fatal error) every further pull returns
/// `None`. Dropping the producer mid-run simply means the remaining pages
/// are never fetched.
pub struct PageProducer<S: PageSource> {
    source: S,
    pages: u32,
    delay: Duration,
    next_page: u32,
    done: bool,
    summary: JobSummary,
}

impl<S: PageSource> PageProducer<S> {
    pub fn new(source: S, pages: u32, delay: Duration) -> Self {
        Self {
            source,
            pages,
            delay,
            next_page: 1,
            done: false,
            summary: JobSummary::new(pages),
        }
    }

    pub fn summary(&self) -> &JobSummary {
        &self.summary
    }

    /// Fetch the next page batch, or `None` once the range is exhausted or
    /// the source reported the end of its pagination.
    pub async fn try_next(&mut self) -> Result<Option<PageBatch<S::Item>>, ScrapeError> {
        if self.done || self.next_page > self.pages {
            self.done = true;
            return Ok(None);
        }

        let page = self.next_page;
        // Be polite - wait between requests, but never before the first one.
        if page > 1 && !self.delay.is_zero() {
            debug!(?self.delay, page, "Waiting before next page");
            sleep(self.delay).await;
        }
        self.next_page += 1;

        match self.source.fetch_page(page).await {
            Ok(PageFetch { records, has_more }) => {
                self.summary.record_success(records.len());
                if records.is_empty() {
                    warn!(page, "Page yielded zero records; site layout may have changed");
                } else {
                    debug!(page, count = records.len(), "Fetched page");
                }
                if !has_more {
                    info!(page, "Source reports no more pages; ending run early");
                    self.done = true;
                }
                Ok(Some(PageBatch { page, records }))
            }
            Err(e) if e.is_recoverable() => {
                warn!(page, error = %e, "Page failed after retries; recording empty batch");
                self.summary.record_failure();
                Ok(Some(PageBatch {
                    page,
                    records: Vec::new(),
                }))
            }
            Err(e) => {
                self.done = true;
                Err(e.into())
            }
        }
    }
}

impl<S: PageSource> BatchStream for PageProducer<S> {
    type Item = S::Item;

    async fn next_batch(&mut self) -> Result<Option<Vec<S::Item>>, ScrapeError> {
        Ok(self.try_next().await?.map(|batch| batch.records))
    }
}

/// Groups `batch_size` consecutive page batches into one combined batch.
///
/// Empty page batches (failed or layout-anomaly pages) count toward the
/// group, so batch boundaries depend only on the page range and
/// `batch_size`. A short tail group is yielded as a final short batch,
/// never dropped.
pub struct BatchProducer<S: PageSource> {
    inner: PageProducer<S>,
    batch_size: usize,
}

impl<S: PageSource> BatchProducer<S> {
    pub fn new(source: S, pages: u32, delay: Duration, batch_size: usize) -> Self {
        // A zero batch_size would stall the group loop
        Self {
            inner: PageProducer::new(source, pages, delay),
            batch_size: batch_size.max(1),
        }
    }

    pub fn summary(&self) -> &JobSummary {
        self.inner.summary()
    }

    /// Accumulate up to `batch_size` page batches and yield them combined.
    pub async fn try_next(&mut self) -> Result<Option<CombinedBatch<S::Item>>, ScrapeError> {
        let mut records = Vec::new();
        let mut first_page = None;
        let mut last_page = 0;
        let mut grouped = 0usize;

        while grouped < self.batch_size {
            match self.inner.try_next().await? {
                Some(batch) => {
                    first_page.get_or_insert(batch.page);
                    last_page = batch.page;
                    records.extend(batch.records);
                    grouped += 1;
                }
                None => break,
            }
        }

        match first_page {
            None => Ok(None),
            Some(first_page) => {
                debug!(
                    first_page,
                    last_page,
                    count = records.len(),
                    "Yielding combined batch"
                );
                Ok(Some(CombinedBatch {
                    first_page,
                    last_page,
                    records,
                }))
            }
        }
    }
}

impl<S: PageSource> BatchStream for BatchProducer<S> {
    type Item = S::Item;

    async fn next_batch(&mut self) -> Result<Option<Vec<S::Item>>, ScrapeError> {
        Ok(self.try_next().await?.map(|batch| batch.records))
    }
}

/// Drain a page producer into one in-memory collection.
///
/// Nothing is observable until the last page has been fetched. Use the
/// streaming sinks for anything beyond a handful of pages.
pub async fn collect_all<S: PageSource>(
    mut producer: PageProducer<S>,
) -> Result<(Vec<S::Item>, JobSummary), ScrapeError> {
    let mut all = Vec::new();
    while let Some(batch) = producer.try_next().await? {
        all.extend(batch.records);
    }
    Ok((all, producer.summary().clone()))
}
