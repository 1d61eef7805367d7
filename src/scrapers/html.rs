//! Front-page scraper for sites without a usable feed.
//!
//! The configured `articleSelector` picks one element per article on the
//! page. The element is either the link itself or a container holding it; in
//! the latter case the first `a[href]` inside it is used. Scraped candidates
//! carry no publish date or description.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use crate::config::HtmlSource;
use crate::error::FetchError;
use crate::models::Candidate;
use crate::scrapers::get_text;
use crate::utils::collapse_whitespace;

/// Fetch the front page of `page` and return its first `max_items` candidates.
#[instrument(level = "info", skip_all, fields(source = %page.name, url = %page.url))]
pub async fn fetch(
    client: &Client,
    page: &HtmlSource,
    max_items: usize,
) -> Result<Vec<Candidate>, FetchError> {
    let html = get_text(client, &page.url).await?;
    parse_front_page(page, &html, max_items)
}

/// Select article links from a front page.
///
/// Elements without a link or whose link does not resolve against the base URL
/// are skipped. Titles are the element's text with whitespace collapsed.
pub fn parse_front_page(
    page: &HtmlSource,
    html: &str,
    max_items: usize,
) -> Result<Vec<Candidate>, FetchError> {
    let selector = Selector::parse(&page.article_selector).map_err(|e| FetchError::Selector {
        selector: page.article_selector.clone(),
        reason: e.to_string(),
    })?;
    let anchor = Selector::parse("a[href]").unwrap();
    let base = Url::parse(page.base()).map_err(|source| FetchError::Url {
        url: page.base().to_string(),
        source,
    })?;

    let document = Html::parse_document(html);
    let candidates = document
        .select(&selector)
        .filter_map(|element| to_candidate(&base, element, &anchor))
        .take(max_items)
        .collect::<Vec<_>>();

    debug!(count = candidates.len(), "Scraped front page");
    Ok(candidates)
}

fn to_candidate(base: &Url, element: ElementRef<'_>, anchor: &Selector) -> Option<Candidate> {
    let href = element
        .value()
        .attr("href")
        .or_else(|| {
            element
                .select(anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
        })
        .map(str::trim)
        .filter(|h| !h.is_empty())?;

    let link = match base.join(href) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!(href, error = %e, "Skipping element with unusable link");
            return None;
        }
    };

    Some(Candidate {
        title: collapse_whitespace(&element.text().collect::<Vec<_>>().join(" ")),
        link,
        pub_date: None,
        description: String::new(),
    })
}
