//! Site scrapers: the record sources the producers pull from.
//!
//! Each scraper implements [`crate::producer::PageSource`], turning one
//! "page index" into one batch of records plus a has-more signal:
//!
//! | Site | Module | Page unit | Record |
//! |------|--------|-----------|--------|
//! | Moneycontrol markets news | [`moneycontrol`] | listing page `page-{n}/` | [`crate::models::Article`] |
//! | TradingEconomics indicators | [`tradingeconomics`] | one indicators tab | [`crate::models::Indicator`] |
//! | Screener fundamentals | [`screener`] | chunk of the symbol list | [`crate::models::Stock`] |
//!
//! Common patterns:
//! - All HTTP goes through [`crate::http`] with retry and backoff; a page
//!   that still fails surfaces as `FetchError::PageFailed` for the producer
//!   to absorb.
//! - HTML parsing happens in synchronous helpers that drop the parsed
//!   document before the next await point.
//! - Per-item detail fetches fan out with a fixed concurrency bound and
//!   keep listing order; an item whose detail fetch fails keeps its empty
//!   fields rather than failing the page.

pub mod moneycontrol;
pub mod screener;
pub mod tradingeconomics;
