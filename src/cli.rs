//! Command-line interface definitions for Market Harvest.
//!
//! All options can be provided via command-line flags; the scrape settings
//! can also come from a YAML config file, with flags taking precedence.

use clap::{Parser, ValueEnum};

/// Which site to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Site {
    /// Moneycontrol markets news articles.
    Moneycontrol,
    /// TradingEconomics country indicators.
    Tradingeconomics,
    /// Screener.in stock fundamentals.
    Screener,
}

/// File output format. Ignored when uploading to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

/// Command-line arguments for the Market Harvest scraper.
///
/// # Examples
///
/// ```sh
/// # Scrape 5 pages of market news into a JSON array
/// market_harvest --site moneycontrol --pages 5 -o news.json
///
/// # Batched upload into the local store
/// market_harvest --site moneycontrol --pages 50 --batch-size 10 --store harvest.db
///
/// # Indicators for another country, as CSV
/// market_harvest --site tradingeconomics --country germany --format csv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Site to scrape
    #[arg(short, long, value_enum, default_value = "moneycontrol")]
    pub site: Site,

    /// Number of listing pages to fetch (overrides the config file)
    #[arg(short, long)]
    pub pages: Option<u32>,

    /// Pages grouped into one write batch (overrides the config file)
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Seconds to wait between page fetches
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Maximum concurrent detail requests within one page
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Skip fetching article details (date, author, full content)
    #[arg(long)]
    pub no_details: bool,

    /// Country slug for the indicators site
    #[arg(long)]
    pub country: Option<String>,

    /// Comma-separated stock symbols for the fundamentals site
    #[arg(long)]
    pub symbols: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output file path (defaults to a per-site filename)
    #[arg(short, long)]
    pub output: Option<String>,

    /// File output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Upload to this store database instead of writing a file
    #[arg(long, env = "HARVEST_STORE")]
    pub store: Option<String>,

    /// Store collection name (defaults to a per-site name)
    #[arg(long)]
    pub collection: Option<String>,

    /// Collect everything in memory and write once at the end.
    /// Only sensible for small jobs.
    #[arg(long)]
    pub eager: bool,
}

impl Cli {
    /// Default output filename for the selected site and format.
    pub fn default_output(&self) -> String {
        let stem = match self.site {
            Site::Moneycontrol => "moneycontrol_news",
            Site::Tradingeconomics => "tradingeconomics_indicators",
            Site::Screener => "screener_stocks",
        };
        let ext = match self.format {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        format!("{stem}.{ext}")
    }

    /// Default store collection for the selected site.
    pub fn default_collection(&self) -> &'static str {
        match self.site {
            Site::Moneycontrol => "news_articles",
            Site::Tradingeconomics => "indicators",
            Site::Screener => "stocks",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["market_harvest"]);
        assert_eq!(cli.site, Site::Moneycontrol);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.pages.is_none());
        assert!(!cli.eager);
        assert_eq!(cli.default_output(), "moneycontrol_news.json");
        assert_eq!(cli.default_collection(), "news_articles");
    }

    #[test]
    fn test_cli_site_and_pages() {
        let cli = Cli::parse_from([
            "market_harvest",
            "--site",
            "tradingeconomics",
            "--pages",
            "4",
            "--format",
            "csv",
        ]);
        assert_eq!(cli.site, Site::Tradingeconomics);
        assert_eq!(cli.pages, Some(4));
        assert_eq!(cli.default_output(), "tradingeconomics_indicators.csv");
    }

    #[test]
    fn test_cli_store_flags() {
        let cli = Cli::parse_from([
            "market_harvest",
            "-s",
            "screener",
            "--store",
            "harvest.db",
            "--symbols",
            "TCS,INFY",
        ]);
        assert_eq!(cli.site, Site::Screener);
        assert_eq!(cli.store.as_deref(), Some("harvest.db"));
        assert_eq!(cli.symbols.as_deref(), Some("TCS,INFY"));
        assert_eq!(cli.default_collection(), "stocks");
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["market_harvest", "-p", "7", "-b", "2", "-o", "/tmp/x.json"]);
        assert_eq!(cli.pages, Some(7));
        assert_eq!(cli.batch_size, Some(2));
        assert_eq!(cli.output.as_deref(), Some("/tmp/x.json"));
    }
}
