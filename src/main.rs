//! # Market Harvest
//!
//! A scraping pipeline that pulls market news articles, economic
//! indicators, and stock fundamentals from their respective sites and
//! persists them to a JSON file, a CSV file, or a local keyed store.
//!
//! ## Features
//!
//! - Scrapes three sources: Moneycontrol markets news, TradingEconomics
//!   country indicators, and Screener.in stock fundamentals
//! - Lazy page-by-page production with a polite inter-page delay, so a
//!   long run never holds more than one write batch in memory
//! - Streaming sinks: incremental JSON array, streaming CSV, or upsert
//!   batches into a SQLite-backed store keyed by content hash
//! - Retry with exponential backoff around every fetch; failed pages are
//!   recorded and skipped rather than aborting the run
//!
//! ## Usage
//!
//! ```sh
//! market_harvest --site moneycontrol --pages 10 --batch-size 5 -o news.json
//! ```
//!
//! ## Architecture
//!
//! The pipeline is pull-driven, one page at a time:
//! 1. **Source**: fetch one listing page and extract its records
//! 2. **Producer**: page batches, optionally grouped into combined batches
//! 3. **Sink**: persist each batch before the next one is fetched
//! 4. **Summary**: report attempted/succeeded/failed pages at exit

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod errors;
mod http;
mod models;
mod outputs;
mod producer;
mod scrapers;
mod summary;
mod utils;

use cli::{Cli, OutputFormat, Site};
use config::ScrapeConfig;
use http::WebClient;
use outputs::csv_stream::{CsvStreamWriter, stream_to_csv};
use outputs::json_stream::{stream_to_json, write_all_json};
use outputs::store::{SqliteStore, stream_to_store};
use producer::{BatchProducer, PageProducer, PageSource, collect_all};
use scrapers::moneycontrol::MoneyControlSource;
use scrapers::screener::ScreenerSource;
use scrapers::tradingeconomics::TradingEconomicsSource;
use summary::JobSummary;
use utils::ensure_writable_dir;

/// Where one run's output goes, resolved from the CLI.
struct RunPlan {
    output: String,
    format: OutputFormat,
    store: Option<String>,
    collection: String,
    eager: bool,
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("market_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.site, ?args.pages, ?args.store, "Parsed CLI arguments");

    // --- Resolve configuration: defaults <- config file <- flags ---
    let mut config = match &args.config {
        Some(path) => ScrapeConfig::load(path)?,
        None => ScrapeConfig::default(),
    };
    if let Some(pages) = args.pages {
        config.pages = pages;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(delay) = args.delay {
        config.delay_secs = delay;
    }
    if let Some(max_concurrent) = args.max_concurrent {
        config.max_concurrent = max_concurrent;
    }
    if args.no_details {
        config.fetch_details = false;
    }
    if let Some(country) = &args.country {
        config.country = country.clone();
    }
    if let Some(symbols) = &args.symbols {
        config.symbols = symbols
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    let config = config.validated()?;
    info!(
        pages = config.pages,
        batch_size = config.batch_size,
        delay_secs = config.delay_secs,
        fetch_details = config.fetch_details,
        "Configuration resolved"
    );

    let plan = RunPlan {
        output: args.output.clone().unwrap_or_else(|| args.default_output()),
        format: args.format,
        store: args.store.clone(),
        collection: args
            .collection
            .clone()
            .unwrap_or_else(|| args.default_collection().to_string()),
        eager: args.eager,
    };

    // Early check: file destinations need a writable directory
    if plan.store.is_none() {
        let parent = Path::new(&plan.output)
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".");
        if let Err(e) = ensure_writable_dir(parent).await {
            tracing::error!(
                path = %parent,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let client = WebClient::new(&config)?;

    // ---- Run the selected site ----
    match args.site {
        Site::Moneycontrol => {
            let source = MoneyControlSource::new(client, &config)?;
            execute(source, config.pages, &config, &plan).await?;
        }
        Site::Tradingeconomics => {
            let source = TradingEconomicsSource::new(client, &config)?;
            let pages = cap_pages(TradingEconomicsSource::page_count(), args.pages);
            execute(source, pages, &config, &plan).await?;
        }
        Site::Screener => {
            let source = ScreenerSource::new(client, &config);
            let pages = cap_pages(source.page_count(), args.pages);
            execute(source, pages, &config, &plan).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Sites with a natural page count (tabs, symbol chunks) use it unless the
/// user asked for fewer pages.
fn cap_pages(natural: u32, requested: Option<u32>) -> u32 {
    match requested {
        Some(pages) => pages.min(natural),
        None => natural,
    }
}

/// Wire a source into the destination the plan asks for and run it.
async fn execute<S: PageSource>(
    source: S,
    pages: u32,
    config: &ScrapeConfig,
    plan: &RunPlan,
) -> Result<(), Box<dyn Error>> {
    let delay = config.delay();

    if let Some(store_path) = &plan.store {
        // Streaming upsert batches into the store
        let mut store = SqliteStore::open(store_path, &plan.collection)?;
        let mut producer = BatchProducer::new(source, pages, delay, config.batch_size);
        let outcome = stream_to_store(&mut producer, &mut store).await?;
        info!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            failed = outcome.failed,
            collection = %plan.collection,
            "Store upload finished"
        );
        report(producer.summary());
        println!("  store   : {outcome}");
    } else if plan.eager {
        // Baseline: everything in memory, one write at the end
        let producer = PageProducer::new(source, pages, delay);
        let (records, summary) = collect_all(producer).await?;
        match plan.format {
            OutputFormat::Json => write_all_json(&records, &plan.output).await?,
            OutputFormat::Csv => {
                let mut writer = CsvStreamWriter::create(&plan.output)?;
                writer.write_batch(&records)?;
                writer.finish()?;
            }
        }
        info!(count = records.len(), path = %plan.output, "Eager write finished");
        report(&summary);
    } else {
        // Streaming file write, one combined batch at a time
        let mut producer = BatchProducer::new(source, pages, delay, config.batch_size);
        let written = match plan.format {
            OutputFormat::Json => stream_to_json(&mut producer, &plan.output).await?,
            OutputFormat::Csv => stream_to_csv(&mut producer, &plan.output).await?,
        };
        info!(written, path = %plan.output, "Streaming write finished");
        report(producer.summary());
    }

    Ok(())
}

/// Log and print the job summary; anomalies get their own warning so a
/// partial run is never mistaken for a clean one.
fn report(summary: &JobSummary) {
    if summary.has_anomalies() {
        warn!(
            failed = summary.pages_failed,
            empty = summary.pages_empty,
            "Run completed with anomalies"
        );
    }
    info!(
        pages_requested = summary.pages_requested,
        pages_attempted = summary.pages_attempted,
        pages_succeeded = summary.pages_succeeded,
        pages_failed = summary.pages_failed,
        pages_empty = summary.pages_empty,
        records = summary.records_produced,
        "Job summary"
    );
    println!("{summary}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_pages_uses_natural_count_by_default() {
        assert_eq!(cap_pages(11, None), 11);
    }

    #[test]
    fn test_cap_pages_respects_explicit_request() {
        assert_eq!(cap_pages(11, Some(3)), 3);
        assert_eq!(cap_pages(11, Some(40)), 11);
    }
}
