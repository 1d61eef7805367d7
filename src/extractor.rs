//! Best-effort full-text extraction for article pages.
//!
//! Extraction never fails the caller: every network, status or parse problem
//! produces [`Extraction::Degraded`], which reads as an empty body. The
//! ingestion run keeps the article with whatever title and description it has.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::error::FetchError;
use crate::scrapers::get_text;
use crate::utils::collapse_whitespace;

/// Containers tried in order; the first one holding text wins.
const CONTENT_ROOTS: &[&str] = &[
    "article",
    "[itemprop=\"articleBody\"]",
    "main",
    "[role=\"main\"]",
    "body",
];

/// Outcome of one extraction attempt.
#[derive(Debug)]
pub enum Extraction {
    /// Readable body text was found.
    Extracted(String),
    /// Nothing usable; the reason is kept for logs and tests.
    Degraded(FetchError),
}

impl Extraction {
    /// The body text, or an empty string when extraction degraded.
    pub fn text(&self) -> &str {
        match self {
            Extraction::Extracted(text) => text,
            Extraction::Degraded(_) => "",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Extraction::Degraded(_))
    }
}

/// Fetches article pages and pulls out their readable text.
#[derive(Debug, Clone)]
pub struct FullTextExtractor {
    client: Client,
}

impl FullTextExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch `url` and extract its body text.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn extract(&self, url: &str) -> Extraction {
        let t0 = Instant::now();
        match self.try_extract(url).await {
            Ok(text) => {
                debug!(
                    bytes = text.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Extracted article text"
                );
                Extraction::Extracted(text)
            }
            Err(e) => {
                warn!(error = %e, "Full-text extraction failed; continuing without body");
                Extraction::Degraded(e)
            }
        }
    }

    async fn try_extract(&self, url: &str) -> Result<String, FetchError> {
        let html = get_text(&self.client, url).await?;
        let text = readable_text(&html);
        if text.is_empty() {
            return Err(FetchError::Empty {
                url: url.to_string(),
            });
        }
        Ok(text)
    }
}

/// Extract the readable text of an HTML page.
///
/// Looks for the first content container from [`CONTENT_ROOTS`] and keeps its
/// paragraphs, one per line. Containers without `<p>` children contribute their
/// whole text instead.
pub fn readable_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let paragraph = Selector::parse("p").unwrap();

    for root in CONTENT_ROOTS {
        let Ok(selector) = Selector::parse(root) else {
            continue;
        };
        for container in document.select(&selector) {
            let text = container_text(container, &paragraph);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

fn container_text(container: ElementRef<'_>, paragraph: &Selector) -> String {
    let paragraphs: Vec<String> = container
        .select(paragraph)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        collapse_whitespace(&container.text().collect::<Vec<_>>().join(" "))
    } else {
        paragraphs.join("\n")
    }
}
