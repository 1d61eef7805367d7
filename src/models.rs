//! Data models for ingested news and their analysis-ready projections.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Candidate`]: a raw item yielded by one source before enrichment
//! - [`Article`]: a deduplicated, enriched article owned by the ingestion run
//! - [`Section`]: the analysis service's unit of submitted content, one per article
//!
//! Section metadata uses camelCase field names (`pubDate`) to match the JSON
//! schema the analysis service expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{join_text_parts, parse_pub_date};

/// A raw article candidate as yielded by a feed or a scraped front page.
///
/// # Fields
///
/// * `title` - Headline, already trimmed
/// * `link` - Absolute URL of the article
/// * `pub_date` - Publish timestamp exactly as the origin supplied it
/// * `description` - Plain-text summary, empty when the origin has none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub link: String,
    pub pub_date: Option<String>,
    pub description: String,
}

/// A deduplicated article produced by one ingestion run.
///
/// Articles only live for the duration of a run; nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Position in discovery order across all sources of the run, starting at 0.
    pub index: usize,
    /// Name of the feed or site the article came from.
    pub source: String,
    pub title: String,
    pub link: String,
    /// Publish timestamp as supplied by the origin.
    pub pub_date: Option<String>,
    pub description: String,
    /// Title, description and extracted body joined into one analysis text.
    pub text: String,
    /// `pub_date` when it parses, otherwise the time the article was fetched.
    pub date: DateTime<Utc>,
    /// Parsed `pub_date`; `None` when the origin gave no usable timestamp.
    pub published_at: Option<DateTime<Utc>>,
    /// Content fingerprint, see [`crate::identity`].
    pub id: String,
}

impl Article {
    /// Build an article from a candidate, its extracted body and its fingerprint.
    pub fn assemble(
        index: usize,
        source: &str,
        candidate: Candidate,
        body: &str,
        id: String,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let published_at = candidate.pub_date.as_deref().and_then(parse_pub_date);
        let text = join_text_parts(&[&candidate.title, &candidate.description, body]);

        Self {
            index,
            source: source.to_string(),
            title: candidate.title,
            link: candidate.link,
            pub_date: candidate.pub_date,
            description: candidate.description,
            text,
            date: published_at.unwrap_or(fetched_at),
            published_at,
            id,
        }
    }

    /// Ordering key for newest-first sorting. `None` orders below every date,
    /// so undated articles sort after all dated ones, however old.
    pub fn sort_date(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

/// A read-only projection of an [`Article`] in the analysis service's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub text: String,
    pub index: usize,
    pub metadata: SectionMetadata,
}

/// Article metadata carried alongside a [`Section`]; always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionMetadata {
    pub title: String,
    pub source: String,
    pub link: String,
    /// Raw origin timestamp, empty when the origin supplied none.
    pub pub_date: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub index: usize,
}
