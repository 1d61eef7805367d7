//! Error taxonomy for the ingestion and dispatch paths.
//!
//! Fetch-layer failures ([`FetchError`]) are contained by the caller: a source or
//! an article body that cannot be fetched degrades to "nothing" and the run goes on.
//! Credential and dispatch failures ([`AuthError`], [`DispatchError`]) propagate to
//! the HTTP boundary, which turns them into a structured 500 payload.

use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// A transient failure while fetching a feed, a front page, or an article body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not parse feed from {url}: {source}")]
    Feed {
        url: String,
        #[source]
        source: quick_xml::DeError,
    },

    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("invalid URL {url:?}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no readable text found at {url}")]
    Empty { url: String },
}

/// Failure to obtain a bearer token from the identity endpoint.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity endpoint {endpoint} is unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("identity endpoint {endpoint} rejected the credentials with HTTP {status}")]
    Rejected { endpoint: String, status: u16 },

    #[error("identity endpoint {endpoint} returned an unreadable token response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("identity endpoint {endpoint} returned an unusable token lifetime of {expires_in} seconds")]
    InvalidExpiry { endpoint: String, expires_in: i64 },
}

/// Closed set of failure categories an operator can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
    BadGateway,
    ServiceUnavailable,
    /// Any other non-success status.
    Status(u16),
    /// The request went out but nothing usable came back (connect error, timeout).
    NoResponse,
    /// The request could not be built.
    RequestSetup,
}

impl FailureCategory {
    /// Map a non-success HTTP status onto a category.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            500 => Self::ServerError,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            other => Self::Status(other),
        }
    }

    /// Classify a transport-level reqwest failure.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            Self::RequestSetup
        } else {
            Self::NoResponse
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("Authentication failed. Please check your token."),
            Self::Forbidden => f.write_str("Access forbidden. Check your permissions."),
            Self::NotFound => f.write_str("Endpoint not found."),
            Self::ServerError => f.write_str("Server error. The API is experiencing issues."),
            Self::BadGateway => f.write_str("Bad gateway. The API server might be down."),
            Self::ServiceUnavailable => {
                f.write_str("Service unavailable. Please try again later.")
            }
            Self::Status(code) => write!(f, "API request failed with status {code}."),
            Self::NoResponse => f.write_str(
                "No response from server. Please check your connection and API URL.",
            ),
            Self::RequestSetup => f.write_str("The request could not be constructed."),
        }
    }
}

/// Failure talking to the analysis or manuscript-management service.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{category} ({endpoint} answered HTTP {status})")]
    Http {
        category: FailureCategory,
        status: u16,
        endpoint: String,
    },

    #[error("{category} ({endpoint}: {source})")]
    Transport {
        category: FailureCategory,
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from {endpoint} is not valid JSON: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0} environment variable is not defined")]
    NotConfigured(&'static str),
}

impl DispatchError {
    pub(crate) fn status(status: StatusCode, endpoint: &str) -> Self {
        Self::Http {
            category: FailureCategory::from_status(status),
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
        }
    }

    pub(crate) fn transport(source: reqwest::Error, endpoint: &str) -> Self {
        Self::Transport {
            category: FailureCategory::from_transport(&source),
            endpoint: endpoint.to_string(),
            source,
        }
    }

    /// The operator-facing category, when the failure has one.
    pub fn category(&self) -> Option<FailureCategory> {
        match self {
            Self::Http { category, .. } | Self::Transport { category, .. } => Some(*category),
            Self::Auth(AuthError::Rejected { status, .. }) => {
                StatusCode::from_u16(*status).ok().map(FailureCategory::from_status)
            }
            Self::Auth(AuthError::Unreachable { .. }) => Some(FailureCategory::NoResponse),
            Self::Auth(AuthError::Decode { .. } | AuthError::InvalidExpiry { .. })
            | Self::Decode { .. }
            | Self::NotConfigured(_) => None,
        }
    }
}

/// Every attempt of a retried operation failed; `last` is the final error, untouched.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct RetryExhausted<E: std::error::Error + 'static> {
    pub attempts: usize,
    #[source]
    pub last: E,
}

impl<E: std::error::Error + 'static> RetryExhausted<E> {
    pub fn into_last(self) -> E {
        self.last
    }
}

/// Invalid or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read source list {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("source list {path} is not valid: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} must be set to talk to the analysis service")]
    Missing(&'static str),

    #[error("{name} is not a valid URL ({value:?}): {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
}
