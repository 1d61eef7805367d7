//! Ingestion of one source group into a deduplicated, newest-first article list.
//!
//! Sources are visited one after another, feeds first, and each candidate is
//! handled to completion (fingerprint, extraction, assembly) before the next.
//! Nothing here runs concurrently, so outbound requests to any third-party
//! site are strictly sequential.
//!
//! # Ordering
//!
//! - `index` is assigned when an article is appended and counts 0, 1, 2, … over
//!   the whole run, across sources. Dropped duplicates consume no index.
//! - The returned list is sorted newest first by parsed publish date. Articles
//!   without a usable date go last; ties keep discovery order.

use chrono::Utc;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::config::SourceList;
use crate::extractor::FullTextExtractor;
use crate::identity::compute_id;
use crate::models::Article;
use crate::scrapers::SourceFetcher;

/// Runs sources through fetching, extraction and deduplication.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    fetcher: SourceFetcher,
    extractor: FullTextExtractor,
}

impl IngestionPipeline {
    pub fn new(fetcher: SourceFetcher, extractor: FullTextExtractor) -> Self {
        Self { fetcher, extractor }
    }

    /// Ingest every source of `sources` into a deduplicated article list.
    ///
    /// A failing source contributes nothing and a failed extraction leaves the
    /// article without a body; neither aborts the run. An empty source list
    /// yields an empty result.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn ingest(&self, sources: &SourceList) -> Vec<Article> {
        let t0 = Instant::now();
        let mut seen: HashSet<String> = HashSet::new();
        let mut articles: Vec<Article> = Vec::new();
        let mut duplicates = 0usize;
        let mut degraded = 0usize;

        for source in sources.iter() {
            let name = source.name();
            for candidate in self.fetcher.candidates(source).await {
                let id = compute_id(name, &candidate);
                if !seen.insert(id.clone()) {
                    duplicates += 1;
                    debug!(source = name, link = %candidate.link, "Dropping duplicate article");
                    continue;
                }

                let extraction = self.extractor.extract(&candidate.link).await;
                if extraction.is_degraded() {
                    degraded += 1;
                }
                articles.push(Article::assemble(
                    articles.len(),
                    name,
                    candidate,
                    extraction.text(),
                    id,
                    Utc::now(),
                ));
            }
        }

        articles.sort_by_key(|a| Reverse(a.sort_date()));

        info!(
            articles = articles.len(),
            duplicates,
            degraded,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Ingestion finished"
        );
        articles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HtmlSource, RssSource};
    use crate::identity::fingerprint;
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline(max_items: usize) -> IngestionPipeline {
        let client = Client::new();
        IngestionPipeline::new(
            SourceFetcher::new(client.clone(), max_items),
            FullTextExtractor::new(client),
        )
    }

    fn feed(server: &MockServer, name: &str, route: &str) -> RssSource {
        RssSource {
            name: name.to_string(),
            url: format!("{}{route}", server.uri()),
        }
    }

    fn rss(items: &[(&str, &str, Option<&str>, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, date, desc)| {
                let date = date
                    .map(|d| format!("<pubDate>{d}</pubDate>"))
                    .unwrap_or_default();
                format!(
                    "<item><title>{title}</title><link>{link}</link>{date}<description>{desc}</description></item>"
                )
            })
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel>{body}</channel></rss>"#)
    }

    async fn serve(server: &MockServer, route: &str, status: u16, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn empty_source_list_yields_nothing() {
        let articles = pipeline(10).ingest(&SourceList::default()).await;
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn duplicate_is_dropped_and_failed_extraction_degrades() {
        let server = MockServer::start().await;
        let one = format!("{}/articles/one", server.uri());
        let two = format!("{}/articles/two", server.uri());

        serve(
            &server,
            "/feed.xml",
            200,
            rss(&[
                ("Title One", one.as_str(), Some("Mon, 13 Oct 2025 09:30:00 GMT"), "Desc one"),
                ("Title Two", two.as_str(), Some("Tue, 14 Oct 2025 09:30:00 GMT"), "Desc two"),
            ]),
        )
        .await;
        serve(
            &server,
            "/front",
            200,
            r#"<html><body><a class="story" href="/articles/one"> Title One </a></body></html>"#
                .to_string(),
        )
        .await;
        // Fetched once: the scraped duplicate is dropped before extraction.
        Mock::given(method("GET"))
            .and(path("/articles/one"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><article><p>Body one.</p></article></body></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;
        serve(&server, "/articles/two", 404, String::new()).await;

        let sources = SourceList {
            rss_sources: vec![feed(&server, "Wire", "/feed.xml")],
            html_sources: vec![HtmlSource {
                name: "Wire".to_string(),
                url: format!("{}/front", server.uri()),
                article_selector: "a.story".to_string(),
                base_url: None,
            }],
        };
        let articles = pipeline(10).ingest(&sources).await;

        assert_eq!(articles.len(), 2);

        let newest = &articles[0];
        assert_eq!(newest.title, "Title Two");
        assert_eq!(newest.index, 1);
        assert_eq!(newest.text, "Title Two Desc two");

        let oldest = &articles[1];
        assert_eq!(oldest.title, "Title One");
        assert_eq!(oldest.index, 0);
        assert_eq!(oldest.text, "Title One Desc one Body one.");

        for article in &articles {
            assert_eq!(article.id, fingerprint(&article.source, &article.title, &article.link));
        }
    }

    #[tokio::test]
    async fn failing_source_does_not_abort_run() {
        let server = MockServer::start().await;
        let only = format!("{}/missing/only", server.uri());
        serve(&server, "/broken.xml", 500, String::new()).await;
        serve(&server, "/good.xml", 200, rss(&[("Only", only.as_str(), None, "")])).await;

        let sources = SourceList {
            rss_sources: vec![
                feed(&server, "Broken", "/broken.xml"),
                feed(&server, "Good", "/good.xml"),
            ],
            html_sources: Vec::new(),
        };
        let articles = pipeline(10).ingest(&sources).await;

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source, "Good");
        assert_eq!(articles[0].index, 0);
        assert_eq!(articles[0].text, "Only");
    }

    #[tokio::test]
    async fn each_source_is_capped_and_undated_articles_sort_last() {
        let server = MockServer::start().await;
        // Article pages are unmatched routes, so every extraction degrades.
        let link = |p: &str| format!("{}/missing{p}", server.uri());
        let (a1, a2, a3) = (link("/a1"), link("/a2"), link("/a3"));
        let (b1, b2, b3) = (link("/b1"), link("/b2"), link("/b3"));
        serve(
            &server,
            "/a.xml",
            200,
            rss(&[
                ("A1", a1.as_str(), None, ""),
                ("A2", a2.as_str(), Some("Sun, 12 Oct 2025 08:00:00 GMT"), ""),
                ("A3", a3.as_str(), Some("Wed, 15 Oct 2025 08:00:00 GMT"), ""),
            ]),
        )
        .await;
        serve(
            &server,
            "/b.xml",
            200,
            rss(&[
                ("B1", b1.as_str(), Some("Mon, 13 Oct 2025 08:00:00 GMT"), ""),
                ("B2", b2.as_str(), None, ""),
                ("B3", b3.as_str(), None, ""),
            ]),
        )
        .await;

        let sources = SourceList {
            rss_sources: vec![feed(&server, "A", "/a.xml"), feed(&server, "B", "/b.xml")],
            html_sources: Vec::new(),
        };
        let articles = pipeline(2).ingest(&sources).await;

        let order: Vec<(&str, usize)> = articles
            .iter()
            .map(|a| (a.title.as_str(), a.index))
            .collect();
        assert_eq!(order, vec![("B1", 2), ("A2", 1), ("A1", 0), ("B2", 3)]);
    }

    #[tokio::test]
    async fn undated_article_sorts_after_epoch_and_pre_epoch_dates() {
        let server = MockServer::start().await;
        let link = |p: &str| format!("{}/missing{p}", server.uri());
        let (u, e, p) = (link("/u"), link("/e"), link("/p"));
        serve(
            &server,
            "/archive.xml",
            200,
            rss(&[
                ("Undated", u.as_str(), None, ""),
                ("Epoch", e.as_str(), Some("Thu, 01 Jan 1970 00:00:00 GMT"), ""),
                ("Sixties", p.as_str(), Some("Sat, 01 Sep 1962 00:00:00 GMT"), ""),
            ]),
        )
        .await;

        let sources = SourceList {
            rss_sources: vec![feed(&server, "Archive", "/archive.xml")],
            html_sources: Vec::new(),
        };
        let articles = pipeline(10).ingest(&sources).await;

        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Epoch", "Sixties", "Undated"]);
        assert_eq!(articles[2].index, 0);
    }
}
