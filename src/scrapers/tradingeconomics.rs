//! TradingEconomics indicators scraper.
//!
//! The country indicators page carries one tab panel per category
//! (`overview`, `gdp`, `labour`, …), each holding a seven-column table:
//! indicator, last, previous, highest, lowest, unit, date. Page index `n`
//! maps to tab `n`, so the producers can drive the tabs exactly like
//! listing pages.

use crate::config::ScrapeConfig;
use crate::errors::FetchError;
use crate::http::{WebClient, get_with_backoff};
use crate::models::Indicator;
use crate::producer::{PageFetch, PageSource};
use crate::utils::{clean_number, now_iso};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{info, instrument, warn};
use url::Url;

/// Tabs on the indicators page, in display order.
pub const TABS: [&str; 11] = [
    "overview",
    "gdp",
    "labour",
    "prices",
    "money",
    "trade",
    "government",
    "business",
    "consumer",
    "housing",
    "health",
];

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table.table-hover").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Indicator source for one country.
pub struct TradingEconomicsSource {
    client: WebClient,
    url: Url,
    country: String,
    max_retries: usize,
}

impl TradingEconomicsSource {
    pub fn new(client: WebClient, config: &ScrapeConfig) -> Result<Self, FetchError> {
        let country = config.country.to_lowercase();
        let url = Url::parse(&format!("https://tradingeconomics.com/{country}/indicators"))?;
        Ok(Self {
            client,
            url,
            country,
            max_retries: config.max_retries,
        })
    }

    /// One page per tab.
    pub fn page_count() -> u32 {
        TABS.len() as u32
    }
}

impl PageSource for TradingEconomicsSource {
    type Item = Indicator;

    #[instrument(level = "info", skip(self), fields(country = %self.country))]
    async fn fetch_page(&self, page: u32) -> Result<PageFetch<Indicator>, FetchError> {
        let Some(tab) = TABS.get(page as usize - 1) else {
            return Ok(PageFetch {
                records: Vec::new(),
                has_more: false,
            });
        };

        let body = get_with_backoff(&self.client, self.url.as_str(), self.max_retries)
            .await
            .map_err(|e| FetchError::PageFailed {
                page,
                reason: e.to_string(),
            })?;

        let records = parse_tab(&body, &self.country, tab);
        info!(tab, count = records.len(), "Extracted indicators");
        Ok(PageFetch {
            records,
            has_more: (page as usize) < TABS.len(),
        })
    }
}

/// Extract the indicator rows of one tab panel.
fn parse_tab(body: &str, country: &str, tab: &str) -> Vec<Indicator> {
    let document = Html::parse_document(body);
    // Tab names come from the fixed list above, so this always parses.
    let panel_selector = Selector::parse(&format!("div#{tab}[role=\"tabpanel\"]")).unwrap();

    let Some(panel) = document.select(&panel_selector).next() else {
        warn!(tab, "Tab panel not found; site layout may have changed");
        return Vec::new();
    };
    let Some(table) = panel.select(&TABLE).next() else {
        warn!(tab, "Table not found in tab panel");
        return Vec::new();
    };

    let mut indicators = Vec::new();
    for row in table.select(&ROW) {
        let cells: Vec<String> = row
            .select(&CELL)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() != 7 {
            continue;
        }

        let indicator = Indicator {
            country: country.to_string(),
            tab: tab.to_string(),
            indicator: cells[0].clone(),
            last: clean_number(&cells[1]),
            previous: clean_number(&cells[2]),
            highest: clean_number(&cells[3]),
            lowest: clean_number(&cells[4]),
            unit: cells[5].clone(),
            date: cells[6].clone(),
            scraped_at: now_iso(),
            hash: String::new(),
        }
        .seal();

        if !indicator.indicator.is_empty() {
            indicators.push(indicator);
        }
    }
    indicators
}
