//! Source lists and service settings.
//!
//! Source lists are static JSON documents. Each document is one **source group**:
//! its articles are ingested together and submitted as one analysis. A typical
//! deployment ships one document per language or media sphere.
//!
//! ```json
//! {
//!   "label": "ukraine",
//!   "forceReanalysis": false,
//!   "rssSources": [{ "name": "Kyiv Independent", "url": "https://kyivindependent.com/news-archive/rss/" }],
//!   "htmlSources": [{ "name": "Ukrinform", "url": "https://www.ukrinform.net/block-lastnews", "articleSelector": "article h2 a" }]
//! }
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

use crate::cli::ServiceArgs;
use crate::error::ConfigError;

/// An RSS or Atom feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RssSource {
    pub name: String,
    pub url: String,
}

/// A front page scraped with a CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlSource {
    pub name: String,
    pub url: String,
    /// Selects one element per article; either the link itself or an element containing it.
    pub article_selector: String,
    /// Base for resolving relative links; defaults to `url`.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl HtmlSource {
    pub fn base(&self) -> &str {
        self.base_url.as_deref().unwrap_or(&self.url)
    }
}

/// One configured source of either flavor.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Rss(&'a RssSource),
    Html(&'a HtmlSource),
}

impl<'a> Source<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Source::Rss(s) => &s.name,
            Source::Html(s) => &s.name,
        }
    }

    pub fn url(&self) -> &'a str {
        match self {
            Source::Rss(s) => &s.url,
            Source::Html(s) => &s.url,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Source::Rss(_) => "rss",
            Source::Html(_) => "html",
        }
    }
}

/// The sources of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceList {
    #[serde(default)]
    pub rss_sources: Vec<RssSource>,
    #[serde(default)]
    pub html_sources: Vec<HtmlSource>,
}

impl SourceList {
    /// All sources in visiting order: feeds first, then scraped pages.
    pub fn iter(&self) -> impl Iterator<Item = Source<'_>> {
        self.rss_sources
            .iter()
            .map(Source::Rss)
            .chain(self.html_sources.iter().map(Source::Html))
    }

    pub fn len(&self) -> usize {
        self.rss_sources.len() + self.html_sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceDocument {
    label: Option<String>,
    #[serde(default)]
    force_reanalysis: bool,
    #[serde(flatten)]
    sources: SourceList,
}

/// A labelled set of sources submitted as one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    pub label: String,
    /// Ask the service to ignore cached results for this group's submissions.
    pub force_reanalysis: bool,
    pub sources: SourceList,
}

impl SourceGroup {
    /// Parse a source document; `fallback_label` is used when it names no label.
    pub fn from_json(fallback_label: &str, json: &str) -> Result<Self, serde_json::Error> {
        let doc: SourceDocument = serde_json::from_str(json)?;
        Ok(Self {
            label: doc.label.unwrap_or_else(|| fallback_label.to_string()),
            force_reanalysis: doc.force_reanalysis,
            sources: doc.sources,
        })
    }

    /// Load a source document from disk, labelled by its file stem by default.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sources");
        Self::from_json(stem, &json).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }
}

/// Load every configured source document, in order.
#[instrument(level = "info", skip_all, fields(count = paths.len()))]
pub fn load_groups<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SourceGroup>, ConfigError> {
    let groups = paths
        .iter()
        .map(|p| SourceGroup::load(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    for group in &groups {
        if group.sources.is_empty() {
            warn!(label = %group.label, "Source group lists no sources");
        }
        info!(
            label = %group.label,
            rss = group.sources.rss_sources.len(),
            html = group.sources.html_sources.len(),
            force_reanalysis = group.force_reanalysis,
            "Loaded source group"
        );
    }
    Ok(groups)
}

/// Client-credentials for the identity endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("audience", &self.audience)
            .finish()
    }
}

/// Everything needed to authenticate and talk to the analysis services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub token_url: Url,
    pub credentials: Credentials,
    pub core_base_url: String,
    pub manuscript_base_url: Option<String>,
    pub analysis_timeout: Duration,
}

impl ServiceSettings {
    pub fn from_args(args: &ServiceArgs) -> Result<Self, ConfigError> {
        let required = |value: &Option<String>, name: &'static str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(ConfigError::Missing(name))
        };

        let domain = required(&args.auth0_domain, "AUTH0_DOMAIN")?;
        Ok(Self {
            token_url: token_url(&domain)?,
            credentials: Credentials {
                client_id: required(&args.auth0_client_id, "AUTH0_CLIENT_ID")?,
                client_secret: required(&args.auth0_client_secret, "AUTH0_CLIENT_SECRET")?,
                audience: required(&args.auth0_audience, "AUTH0_AUDIENCE")?,
            },
            core_base_url: required(&args.core_base_url, "CORE_BASE_URL")?,
            manuscript_base_url: required(&args.manuscript_mgmt_base, "MANUSCRIPT_MGMT_BASE").ok(),
            analysis_timeout: Duration::from_secs(args.analysis_timeout_secs),
        })
    }
}

/// Token endpoint for an Auth0-style domain.
///
/// A bare host becomes `https://{domain}/oauth/token`; a value that already
/// carries a scheme is used as the base as given.
pub fn token_url(domain: &str) -> Result<Url, ConfigError> {
    let base = if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", domain.trim_end_matches('/'))
    };
    let raw = format!("{base}/oauth/token");
    Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
        name: "AUTH0_DOMAIN",
        value: domain.to_string(),
        source,
    })
}
