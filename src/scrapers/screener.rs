//! Screener.in stock-fundamentals scraper.
//!
//! Screener has no listing pagination; the unit of work is a company page
//! at `/company/{symbol}/consolidated/`. To fit the paged production
//! model, the configured symbol list is chunked and page index `n` maps to
//! chunk `n`. Symbols within a chunk are fetched with the same bounded
//! ordered concurrency the news detail fetches use.
//!
//! A symbol whose page is missing or unparsable is skipped with a warning;
//! only a fully failed chunk counts as a failed page.

use crate::config::ScrapeConfig;
use crate::errors::FetchError;
use crate::http::{WebClient, get_with_backoff};
use crate::models::Stock;
use crate::producer::{PageFetch, PageSource};
use crate::utils::{clean_number, now_iso};
use chrono::Local;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{info, instrument, warn};

pub const BASE_URL: &str = "https://www.screener.in";

/// Fallback watchlist when no symbols are configured.
pub const DEFAULT_SYMBOLS: [&str; 10] = [
    "RELIANCE", "TCS", "HDFCBANK", "INFY", "ICICIBANK", "HINDUNILVR", "SBIN", "BHARTIARTL",
    "ITC", "LT",
];

static NAME: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static RATIO_ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li.flex").unwrap());
static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());

/// Fundamentals source over a fixed symbol list.
pub struct ScreenerSource {
    client: WebClient,
    symbols: Vec<String>,
    per_page: usize,
    max_concurrent: usize,
    max_retries: usize,
}

impl ScreenerSource {
    pub fn new(client: WebClient, config: &ScrapeConfig) -> Self {
        let symbols = if config.symbols.is_empty() {
            DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
        } else {
            config.symbols.clone()
        };
        Self {
            client,
            symbols,
            per_page: config.symbols_per_page.max(1),
            max_concurrent: config.max_concurrent,
            max_retries: config.max_retries,
        }
    }

    /// Pages needed to cover the symbol list at the configured chunk size.
    pub fn page_count(&self) -> u32 {
        self.symbols.len().div_ceil(self.per_page) as u32
    }

    fn chunk(&self, page: u32) -> &[String] {
        let start = (page as usize - 1) * self.per_page;
        if start >= self.symbols.len() {
            return &[];
        }
        let end = (start + self.per_page).min(self.symbols.len());
        &self.symbols[start..end]
    }
}

impl PageSource for ScreenerSource {
    type Item = Stock;

    #[instrument(level = "info", skip(self))]
    async fn fetch_page(&self, page: u32) -> Result<PageFetch<Stock>, FetchError> {
        let chunk = self.chunk(page);
        if chunk.is_empty() {
            return Ok(PageFetch {
                records: Vec::new(),
                has_more: false,
            });
        }

        info!(page, symbols = chunk.len(), "Fetching symbol chunk");
        let snapshot_date = Local::now().date_naive().to_string();

        let fetched: Vec<Option<Stock>> = stream::iter(chunk.iter().cloned())
            .map(|symbol| {
                let client = self.client.clone();
                let snapshot_date = snapshot_date.clone();
                let max_retries = self.max_retries;
                async move {
                    let url = format!("{BASE_URL}/company/{symbol}/consolidated/");
                    match get_with_backoff(&client, &url, max_retries).await {
                        Ok(body) => match parse_stock(&body, &symbol) {
                            Some(stock) => Some(stock.seal(&snapshot_date)),
                            None => {
                                warn!(%symbol, "Stock page not found or unparsable; skipping");
                                None
                            }
                        },
                        Err(e) => {
                            warn!(%symbol, error = %e, "Stock fetch failed; skipping");
                            None
                        }
                    }
                }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let attempted = fetched.len();
        let records: Vec<Stock> = fetched.into_iter().flatten().collect();
        if records.is_empty() && attempted > 0 {
            return Err(FetchError::PageFailed {
                page,
                reason: format!("all {attempted} symbols in chunk failed"),
            });
        }

        info!(page, count = records.len(), "Extracted stock snapshots");
        Ok(PageFetch {
            records,
            has_more: page < self.page_count(),
        })
    }
}

/// Extract name and top ratios from a company page. `None` when the page
/// does not look like a company page at all.
fn parse_stock(body: &str, symbol: &str) -> Option<Stock> {
    let document = Html::parse_document(body);
    let name = document
        .select(&NAME)
        .next()
        .map(|h1| h1.text().collect::<String>().trim().to_string())?;
    if name.is_empty() || body.contains("Page not found") {
        return None;
    }

    let mut stock = Stock {
        symbol: symbol.to_string(),
        name,
        market_cap: None,
        current_price: None,
        pe_ratio: None,
        book_value: None,
        roce: None,
        roe: None,
        dividend_yield: None,
        scraped_at: now_iso(),
        hash: String::new(),
    };

    for item in document.select(&RATIO_ITEM) {
        let spans: Vec<String> = item
            .select(&SPAN)
            .map(|span| span.text().collect::<String>().trim().to_string())
            .collect();
        if spans.len() < 2 {
            continue;
        }
        let label = spans[0].to_lowercase();
        let value = clean_number(&spans[1]);

        if label.contains("market cap") {
            stock.market_cap = value;
        } else if label.contains("current price") {
            stock.current_price = value;
        } else if label.contains("stock p/e") || label == "p/e" {
            stock.pe_ratio = value;
        } else if label.contains("book value") {
            stock.book_value = value;
        } else if label.contains("dividend yield") {
            stock.dividend_yield = value;
        } else if label.contains("roce") {
            stock.roce = value;
        } else if label.contains("roe") {
            stock.roe = value;
        }
    }

    Some(stock)
}
