//! RSS, RDF and Atom feed adapter.
//!
//! The feed document is deserialized with `quick-xml`'s serde support into a
//! shape that accepts all three dialects at once:
//!
//! - RSS 2.0: `<rss><channel><item>…</item></channel></rss>`
//! - RSS 1.0 / RDF: `<rdf:RDF><item>…</item></rdf:RDF>`
//! - Atom: `<feed><entry>…</entry></feed>`
//!
//! Unknown elements are ignored. An RSS item without `<link>` falls back to a
//! permalink `<guid>`; an Atom entry without `<summary>` falls back to `<content>`.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::RssSource;
use crate::error::FetchError;
use crate::models::Candidate;
use crate::scrapers::get_text;
use crate::utils::{collapse_whitespace, strip_html};

#[derive(Debug, Default, Deserialize)]
struct FeedDocument {
    channel: Option<Channel>,
    #[serde(default, rename = "item")]
    rdf_items: Vec<Item>,
    #[serde(default, rename = "entry")]
    entries: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct Channel {
    #[serde(default, rename = "item")]
    items: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date")]
    dc_date: Option<String>,
    description: Option<String>,
    guid: Option<Guid>,
}

#[derive(Debug, Default, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
    #[serde(rename = "@isPermaLink")]
    is_perma_link: Option<String>,
}

impl Guid {
    /// The guid is a permalink unless marked `isPermaLink="false"`.
    fn permalink(self) -> Option<String> {
        match self.is_perma_link.as_deref().map(str::trim) {
            Some("false") => None,
            _ => self.value,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Entry {
    title: Option<String>,
    #[serde(default, rename = "link")]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    content: Option<AtomContent>,
}

#[derive(Debug, Default, Deserialize)]
struct AtomContent {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl Entry {
    fn alternate_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .and_then(|l| l.href.as_deref())
    }
}

/// A feed item before link resolution.
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    description: Option<String>,
}

/// Fetch a feed and return its first `max_items` candidates.
#[instrument(level = "info", skip_all, fields(source = %feed.name, url = %feed.url))]
pub async fn fetch(
    client: &Client,
    feed: &RssSource,
    max_items: usize,
) -> Result<Vec<Candidate>, FetchError> {
    let xml = get_text(client, &feed.url).await?;
    parse_feed(&feed.url, &xml, max_items)
}

/// Parse a feed document into at most `max_items` candidates.
///
/// Items without a resolvable link are skipped and do not count towards the limit.
pub fn parse_feed(feed_url: &str, xml: &str, max_items: usize) -> Result<Vec<Candidate>, FetchError> {
    let base = Url::parse(feed_url).map_err(|source| FetchError::Url {
        url: feed_url.to_string(),
        source,
    })?;
    let document: FeedDocument = quick_xml::de::from_str(xml).map_err(|source| FetchError::Feed {
        url: feed_url.to_string(),
        source,
    })?;

    let candidates = raw_items(document)
        .filter_map(|item| to_candidate(&base, item))
        .take(max_items)
        .collect::<Vec<_>>();

    debug!(count = candidates.len(), "Parsed feed items");
    Ok(candidates)
}

fn raw_items(document: FeedDocument) -> impl Iterator<Item = RawItem> {
    let rss = document
        .channel
        .map(|c| c.items)
        .unwrap_or_default()
        .into_iter()
        .chain(document.rdf_items)
        .map(|item| RawItem {
            title: item.title,
            link: item.link.or_else(|| item.guid.and_then(Guid::permalink)),
            pub_date: item.pub_date.or(item.dc_date),
            description: item.description,
        });

    let atom = document.entries.into_iter().map(|entry| RawItem {
        link: entry.alternate_link().map(str::to_string),
        title: entry.title,
        pub_date: entry.published.or(entry.updated),
        description: entry.summary.or_else(|| entry.content.and_then(|c| c.value)),
    });

    rss.chain(atom)
}

fn to_candidate(base: &Url, item: RawItem) -> Option<Candidate> {
    let raw_link = item.link.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let Some(raw_link) = raw_link else {
        debug!(title = ?item.title, "Skipping feed item without link");
        return None;
    };
    let link = match base.join(raw_link) {
        Ok(url) => url.to_string(),
        Err(e) => {
            debug!(link = raw_link, error = %e, "Skipping feed item with unusable link");
            return None;
        }
    };

    Some(Candidate {
        title: collapse_whitespace(item.title.as_deref().unwrap_or_default()),
        link,
        pub_date: item
            .pub_date
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        description: item.description.as_deref().map(strip_html).unwrap_or_default(),
    })
}
