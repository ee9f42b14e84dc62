//! Moneycontrol markets-news scraper.
//!
//! Listing pages live at `news/business/markets/page-{n}/` and carry one
//! `li.clearfix` container per story with the title, link, summary, and
//! thumbnail. The publication date, author, and body are only on the
//! article page itself, so when detail fetching is enabled each listing
//! page fans out a bounded number of concurrent detail requests.
//!
//! An empty listing page means the pagination ran out; that is the end
//! signal this source reports through `has_more`.

use crate::config::ScrapeConfig;
use crate::errors::FetchError;
use crate::http::{WebClient, get_with_backoff};
use crate::models::Article;
use crate::producer::{PageFetch, PageSource};
use crate::utils::{now_iso, truncate_for_log};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.moneycontrol.com/news/business/markets/";

/// Detail pages get fewer retries than listing pages; a lost detail only
/// costs fields, not the page.
const DETAIL_RETRIES: usize = 2;

static CONTAINER: Lazy<Selector> = Lazy::new(|| Selector::parse("li.clearfix").unwrap());
static UNIFIED_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.unified-link").unwrap());
static ANY_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h2").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static SUMMARY: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.article_author").unwrap());
static AUTHOR_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.article_author a").unwrap());
static SCHEDULE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.article_schedule span").unwrap());
static CONTENT: Lazy<Selector> = Lazy::new(|| Selector::parse("div#contentdata p").unwrap());
static VIDEO_DATE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.video_content p.last_updated").unwrap());
static VIDEO_TEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.video_content p.text_3").unwrap());

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// News source for the Moneycontrol markets section.
pub struct MoneyControlSource {
    client: WebClient,
    base_url: Url,
    fetch_details: bool,
    max_concurrent: usize,
    max_retries: usize,
}

impl MoneyControlSource {
    pub fn new(client: WebClient, config: &ScrapeConfig) -> Result<Self, FetchError> {
        Self::with_base_url(client, config, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        client: WebClient,
        config: &ScrapeConfig,
        base_url: &str,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            fetch_details: config.fetch_details,
            max_concurrent: config.max_concurrent,
            max_retries: config.max_retries,
        })
    }

    /// Fetch date, author, and body for each article, a bounded number at a
    /// time, preserving listing order. A failed detail fetch leaves the
    /// article's extra fields empty.
    async fn attach_details(&self, articles: Vec<Article>) -> Vec<Article> {
        info!(
            count = articles.len(),
            max_concurrent = self.max_concurrent,
            "Fetching article details"
        );
        stream::iter(articles)
            .map(|mut article| {
                let client = self.client.clone();
                async move {
                    match get_with_backoff(&client, &article.url, DETAIL_RETRIES).await {
                        Ok(body) => {
                            let detail = parse_detail(&body);
                            debug!(
                                url = %article.url,
                                date = %detail.date,
                                author = %detail.author,
                                content = %truncate_for_log(&detail.full_content, 80),
                                "Fetched article detail"
                            );
                            article.date = detail.date;
                            article.author = detail.author;
                            article.full_content = detail.full_content;
                        }
                        Err(e) => {
                            warn!(url = %article.url, error = %e, "Detail fetch failed; keeping partial fields");
                        }
                    }
                    article
                }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await
    }
}

impl PageSource for MoneyControlSource {
    type Item = Article;

    #[instrument(level = "info", skip(self))]
    async fn fetch_page(&self, page: u32) -> Result<PageFetch<Article>, FetchError> {
        let url = self.base_url.join(&format!("page-{page}/"))?;
        let body = get_with_backoff(&self.client, url.as_str(), self.max_retries)
            .await
            .map_err(|e| FetchError::PageFailed {
                page,
                reason: e.to_string(),
            })?;

        let articles = parse_listing(&body, &self.base_url);
        info!(page, count = articles.len(), "Extracted listing articles");

        // An empty listing page is past the end of the pagination.
        let has_more = !articles.is_empty();

        let articles = if self.fetch_details && !articles.is_empty() {
            self.attach_details(articles).await
        } else {
            articles
        };

        let records = articles.into_iter().map(Article::seal).collect();
        Ok(PageFetch { records, has_more })
    }
}

/// Extract article stubs from one listing page.
fn parse_listing(body: &str, base_url: &Url) -> Vec<Article> {
    let document = Html::parse_document(body);
    let mut articles = Vec::new();

    for container in document.select(&CONTAINER) {
        let link = container
            .select(&UNIFIED_LINK)
            .next()
            .or_else(|| container.select(&ANY_LINK).next());
        let Some(link) = link else { continue };

        let href = link.value().attr("href").unwrap_or("");
        let url = if href.starts_with("http") {
            href.to_string()
        } else {
            base_url
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_default()
        };
        let title = link.select(&TITLE).next().map(element_text).unwrap_or_default();
        // Only keep containers that look like stories
        if title.is_empty() || url.is_empty() {
            continue;
        }

        let image_url = link
            .select(&IMAGE)
            .next()
            .and_then(|img| {
                img.value()
                    .attr("src")
                    .or_else(|| img.value().attr("data-src"))
            })
            .unwrap_or("")
            .to_string();
        let summary = container
            .select(&SUMMARY)
            .next()
            .map(element_text)
            .unwrap_or_default();

        articles.push(Article {
            title,
            url,
            summary,
            image_url,
            date: String::new(),
            author: String::new(),
            full_content: String::new(),
            scraped_at: now_iso(),
            hash: String::new(),
        });
    }

    // Listing markup sometimes repeats a story in promo slots
    articles.into_iter().unique_by(|a| a.url.clone()).collect()
}

struct ArticleDetail {
    date: String,
    author: String,
    full_content: String,
}

/// Extract date, author, and body from an article page, with the
/// video-article layout as fallback.
fn parse_detail(body: &str) -> ArticleDetail {
    let document = Html::parse_document(body);

    let author = document
        .select(&AUTHOR_LINK)
        .next()
        .map(element_text)
        .or_else(|| document.select(&AUTHOR).next().map(element_text))
        .unwrap_or_default();

    let mut date = document
        .select(&SCHEDULE)
        .next()
        .map(|span| {
            let text = element_text(span);
            // "November 12, 2025 / 10:51 IST" -> date part only
            match text.split_once('/') {
                Some((date, _)) => date.trim().to_string(),
                None => text,
            }
        })
        .unwrap_or_default();

    let mut full_content = document
        .select(&CONTENT)
        .map(element_text)
        .filter(|p| !p.is_empty())
        .join("\n\n");

    // Video articles use a different layout
    if date.is_empty() {
        if let Some(updated) = document.select(&VIDEO_DATE).next() {
            let text = element_text(updated);
            date = match text.to_lowercase().find("first published:") {
                Some(_) => text
                    .split_once(':')
                    .map(|(_, rest)| rest.trim().to_string())
                    .unwrap_or(text),
                None => text,
            };
        }
    }
    if full_content.is_empty() {
        if let Some(text_3) = document.select(&VIDEO_TEXT).next() {
            full_content = element_text(text_3);
        }
    }

    ArticleDetail {
        date,
        author,
        full_content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body><ul>
          <li class="clearfix">
            <a href="/news/business/markets/sensex-rallies-1.html" class="unified-link">
              <img data-src="https://img.example.com/1.jpg">
              <h2>Sensex rallies 500 points</h2>
            </a>
            <p>Benchmarks closed higher led by banks.</p>
          </li>
          <li class="clearfix">
            <a href="https://www.moneycontrol.com/news/business/markets/nifty-2.html" class="unified-link">
              <img src="https://img.example.com/2.jpg">
              <h2>Nifty ends above 25,000</h2>
            </a>
            <p>Broader markets outperformed.</p>
          </li>
          <li class="clearfix"><a href="/ad-slot"><span>sponsored</span></a></li>
        </ul></body></html>"#;

    #[test]
    fn test_parse_listing_extracts_stories() {
        let base = Url::parse(DEFAULT_BASE_URL).unwrap();
        let articles = parse_listing(LISTING, &base);

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Sensex rallies 500 points");
        assert_eq!(
            articles[0].url,
            "https://www.moneycontrol.com/news/business/markets/sensex-rallies-1.html"
        );
        assert_eq!(articles[0].image_url, "https://img.example.com/1.jpg");
        assert_eq!(articles[0].summary, "Benchmarks closed higher led by banks.");
        assert_eq!(articles[1].title, "Nifty ends above 25,000");
    }

    #[test]
    fn test_parse_listing_dedupes_repeated_urls() {
        let base = Url::parse(DEFAULT_BASE_URL).unwrap();
        let doubled = format!("{LISTING}{LISTING}");
        let articles = parse_listing(&doubled, &base);
        assert_eq!(articles.len(), 2);
    }

    #[test]
    fn test_parse_listing_empty_page() {
        let base = Url::parse(DEFAULT_BASE_URL).unwrap();
        let articles = parse_listing("<html><body><p>No results</p></body></html>", &base);
        assert!(articles.is_empty());
    }

    const DETAIL: &str = r#"
        <html><body>
          <div class="article_author"><a>Reema Tendulkar</a></div>
          <div class="article_schedule"><span>November 12, 2025 / 10:51 IST</span></div>
          <div class="content_wrapper arti-flow" id="contentdata">
            <p>First paragraph of the story.</p>
            <p></p>
            <p>Second paragraph of the story.</p>
          </div>
        </body></html>"#;

    #[test]
    fn test_parse_detail_primary_layout() {
        let detail = parse_detail(DETAIL);
        assert_eq!(detail.author, "Reema Tendulkar");
        assert_eq!(detail.date, "November 12, 2025");
        assert_eq!(
            detail.full_content,
            "First paragraph of the story.\n\nSecond paragraph of the story."
        );
    }

    const VIDEO_DETAIL: &str = r#"
        <html><body>
          <div class="video_content">
            <p class="last_updated">First Published: Nov 12, 2025 10:51 IST</p>
            <p class="text_3">Transcript-style summary of the segment.</p>
          </div>
        </body></html>"#;

    #[test]
    fn test_parse_detail_video_fallback() {
        let detail = parse_detail(VIDEO_DETAIL);
        assert_eq!(detail.author, "");
        assert_eq!(detail.date, "Nov 12, 2025 10:51 IST");
        assert_eq!(
            detail.full_content,
            "Transcript-style summary of the segment."
        );
    }

    #[test]
    fn test_parse_detail_missing_everything() {
        let detail = parse_detail("<html><body></body></html>");
        assert!(detail.date.is_empty());
        assert!(detail.author.is_empty());
        assert!(detail.full_content.is_empty());
    }
}
