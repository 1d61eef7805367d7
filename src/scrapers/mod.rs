//! Per-source adapters yielding article candidates.
//!
//! Each configured source is read by one of two flavors:
//!
//! | Flavor | Module | Method |
//! |--------|--------|--------|
//! | RSS / Atom / RDF feed | [`rss`] | Feed parsing with `quick-xml` |
//! | Front page | [`html`] | CSS selector over the page with `scraper` |
//!
//! Both yield at most `max_items` candidates in source order, each with an
//! absolute link. A source that cannot be fetched or parsed yields nothing;
//! the failure is logged and other sources are unaffected.

pub mod html;
pub mod rss;

use reqwest::Client;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::config::Source;
use crate::error::FetchError;
use crate::models::Candidate;

/// Fetches candidates for one source at a time.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: Client,
    max_items: usize,
}

impl SourceFetcher {
    pub fn new(client: Client, max_items: usize) -> Self {
        Self { client, max_items }
    }

    /// Candidates for `source`; empty when the source fails.
    #[instrument(level = "info", skip_all, fields(source = %source.name(), kind = source.kind()))]
    pub async fn candidates(&self, source: Source<'_>) -> Vec<Candidate> {
        let t0 = Instant::now();
        match self.try_candidates(source).await {
            Ok(candidates) => {
                info!(
                    count = candidates.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Fetched source candidates"
                );
                candidates
            }
            Err(e) => {
                warn!(error = %e, url = %source.url(), "Source failed; skipping it for this run");
                Vec::new()
            }
        }
    }

    /// Candidates for `source`, surfacing the failure.
    pub async fn try_candidates(&self, source: Source<'_>) -> Result<Vec<Candidate>, FetchError> {
        match source {
            Source::Rss(feed) => rss::fetch(&self.client, feed, self.max_items).await,
            Source::Html(page) => html::fetch(&self.client, page, self.max_items).await,
        }
    }
}

/// GET `url` and return its body, treating non-success statuses as failures.
pub(crate) async fn get_text(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })
}
