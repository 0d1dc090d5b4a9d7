//! Page scraping for submitted links.
//!
//! A link's title and excerpt come from a plain GET of the URL. Any failure
//! along the way (bad URL, network error, non-2xx status, timeout, unreadable
//! body) yields `None`; the caller decides how to report it.

use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Title used when the page has no `<title>` or it is blank.
pub const UNTITLED: &str = "Sin título";

/// Maximum number of words kept in an excerpt.
pub const EXCERPT_WORDS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub titulo: String,
    pub contenido: String,
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("linkscribe/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Shared HTTP client for scraping. Built once at startup.
#[derive(Debug, Clone)]
pub struct Extractor {
    client: Client,
}

impl Extractor {
    pub fn new(config: &ExtractorConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }

    pub async fn extract(&self, url: &str) -> Option<PageInfo> {
        match self.fetch(url).await {
            Ok(html) => Some(parse_page(&html)),
            Err(e) => {
                tracing::warn!(url, error = %e, "could not fetch page");
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// Pulls the title and a word-limited excerpt of paragraph text out of `html`.
pub fn parse_page(html: &str) -> PageInfo {
    let document = Html::parse_document(html);

    PageInfo {
        titulo: title(&document).unwrap_or_else(|| UNTITLED.to_string()),
        contenido: excerpt(&document, EXCERPT_WORDS),
    }
}

fn title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let text = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();
    let text = text.trim();

    (!text.is_empty()).then(|| text.to_string())
}

fn excerpt(document: &Html, max_words: usize) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };

    let paragraphs = document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ");

    truncate_words(&paragraphs, max_words)
}

/// First `max_words` whitespace-separated words, joined by single spaces.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}
