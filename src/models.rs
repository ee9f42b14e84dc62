//! Data models for scraped records.
//!
//! This module defines the record types produced by the site scrapers:
//! - [`Article`]: one news story from the Moneycontrol markets section
//! - [`Indicator`]: one economic-indicator row from TradingEconomics
//! - [`Stock`]: one company's fundamentals snapshot from Screener
//!
//! All three implement [`Record`], which is what the producers and sinks
//! are written against: a serializable value with a stable identifier used
//! for deduplication and upserts.

use crate::utils::content_hash;
use serde::{Deserialize, Serialize};

/// A scraped entity with a stable identifier.
///
/// The identifier is a content hash over the record's natural key, so the
/// same story or indicator scraped twice maps to the same id. Sinks rely on
/// this for idempotent upserts; it is also the uniqueness key in the store.
pub trait Record: Serialize {
    /// The stable identifier for deduplication and upserts.
    fn id(&self) -> &str;
}

/// A news article scraped from a Moneycontrol listing page.
///
/// Listing pages yield title, url, summary, and image. When detail fetching
/// is enabled, `date`, `author`, and `full_content` come from the article
/// page itself; a failed detail fetch leaves them empty rather than failing
/// the page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub image_url: String,
    pub date: String,
    pub author: String,
    pub full_content: String,
    /// ISO-8601 timestamp of when this record was scraped.
    pub scraped_at: String,
    /// SHA-256/base64 over `title|date`.
    pub hash: String,
}

impl Article {
    /// Finalize the record id from the title and (possibly empty) date.
    pub fn seal(mut self) -> Self {
        self.hash = content_hash(&[&self.title, &self.date]);
        self
    }
}

impl Record for Article {
    fn id(&self) -> &str {
        &self.hash
    }
}

/// One row of a TradingEconomics indicators table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Indicator {
    pub country: String,
    /// Tab the row came from, e.g. "gdp" or "labour".
    pub tab: String,
    pub indicator: String,
    pub last: Option<f64>,
    pub previous: Option<f64>,
    pub highest: Option<f64>,
    pub lowest: Option<f64>,
    pub unit: String,
    /// Reference date column as displayed by the site.
    pub date: String,
    pub scraped_at: String,
    /// SHA-256/base64 over `country|tab|indicator`.
    pub hash: String,
}

impl Indicator {
    pub fn seal(mut self) -> Self {
        self.hash = content_hash(&[&self.country, &self.tab, &self.indicator]);
        self
    }
}

impl Record for Indicator {
    fn id(&self) -> &str {
        &self.hash
    }
}

/// A fundamentals snapshot for one listed company.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Stock {
    pub symbol: String,
    pub name: String,
    pub market_cap: Option<f64>,
    pub current_price: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub book_value: Option<f64>,
    pub roce: Option<f64>,
    pub roe: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub scraped_at: String,
    /// SHA-256/base64 over `symbol|scrape date`, so each day is one snapshot.
    pub hash: String,
}

impl Stock {
    pub fn seal(mut self, snapshot_date: &str) -> Self {
        self.hash = content_hash(&[&self.symbol, snapshot_date]);
        self
    }
}

impl Record for Stock {
    fn id(&self) -> &str {
        &self.hash
    }
}
