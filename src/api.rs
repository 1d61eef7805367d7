//! Authenticated client for the analysis and manuscript-management services.
//!
//! Every request carries a bearer token obtained from the shared
//! [`TokenManager`]. Failures are reported as [`DispatchError`] with a
//! [`FailureCategory`](crate::error::FailureCategory) derived from the HTTP
//! status or transport error, so operators can tell configuration problems
//! from outages.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | [`AnalysisClient::analyze`] | `POST {CORE_BASE_URL}/profiling/{analyticsType}/analyze` |
//! | [`AnalysisClient::previously_analyzed`] | `GET {MANUSCRIPT_MGMT_BASE}/analytics-json-all` |
//! | [`AnalysisClient::health_check`] | `GET {MANUSCRIPT_MGMT_BASE}/health` |
//!
//! None of these retry on their own; wrap them with [`crate::retry`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::ServiceSettings;
use crate::error::{DispatchError, RetryExhausted};
use crate::models::Section;
use crate::retry::fetch_with_retry;
use crate::token::TokenManager;
use crate::utils::truncate_for_log;

const HISTORY_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Options of one analysis submission, serialized as the request body.
///
/// ```json
/// {"analyticsType":"media-insights","fileId":"x","sections":[],"forceReanalysis":true,"options":{"granularity":"article"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Routing key selecting the analysis flavor.
    pub analytics_type: String,
    /// Names this submission; the service caches results under it.
    pub file_id: String,
    pub sections: Vec<Section>,
    /// Ignore any cached result for `file_id`.
    pub force_reanalysis: bool,
    pub options: AnalysisOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub granularity: String,
}

impl AnalysisRequest {
    pub fn new(
        analytics_type: impl Into<String>,
        file_id: impl Into<String>,
        sections: Vec<Section>,
        force_reanalysis: bool,
        granularity: impl Into<String>,
    ) -> Self {
        Self {
            analytics_type: analytics_type.into(),
            file_id: file_id.into(),
            sections,
            force_reanalysis,
            options: AnalysisOptions {
                granularity: granularity.into(),
            },
        }
    }
}

/// Outcome of a liveness probe; never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    /// HTTP status of the probe, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    fn failed(status: Option<u16>, error: impl ToString) -> Self {
        Self {
            healthy: false,
            status,
            error: Some(error.to_string()),
        }
    }
}

/// Client for the analysis service and its manuscript-management companion.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: Client,
    tokens: Arc<TokenManager>,
    core_base: String,
    manuscript_base: Option<String>,
    analysis_timeout: Duration,
}

impl AnalysisClient {
    pub fn new(
        http: Client,
        tokens: Arc<TokenManager>,
        core_base: impl Into<String>,
        manuscript_base: Option<String>,
        analysis_timeout: Duration,
    ) -> Self {
        Self {
            http,
            tokens,
            core_base: core_base.into().trim_end_matches('/').to_string(),
            manuscript_base: manuscript_base.map(|b| b.trim_end_matches('/').to_string()),
            analysis_timeout,
        }
    }

    /// Build the client and its token manager from service settings.
    pub fn from_settings(http: Client, settings: &ServiceSettings) -> Self {
        let tokens = TokenManager::new(
            http.clone(),
            settings.token_url.clone(),
            settings.credentials.clone(),
        );
        Self::new(
            http,
            Arc::new(tokens),
            settings.core_base_url.clone(),
            settings.manuscript_base_url.clone(),
            settings.analysis_timeout,
        )
    }

    /// Submit sections for analysis and return the service's response verbatim.
    ///
    /// # Errors
    ///
    /// [`DispatchError`] when no token can be obtained, the service answers with a
    /// non-success status, the request fails in transit, or the body is not JSON.
    #[instrument(
        level = "info",
        skip_all,
        fields(
            analytics_type = %request.analytics_type,
            file_id = %request.file_id,
            sections = request.sections.len(),
            force_reanalysis = request.force_reanalysis
        )
    )]
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<Value, DispatchError> {
        let endpoint = format!(
            "{}/profiling/{}/analyze",
            self.core_base,
            urlencoding::encode(&request.analytics_type)
        );
        let t0 = Instant::now();
        let token = self.tokens.get_token().await?;

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .json(request)
            .timeout(self.analysis_timeout)
            .send()
            .await
            .map_err(|e| DispatchError::transport(e, &endpoint))?;

        let body = read_json(response, &endpoint).await?;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            response = %truncate_for_log(&body.to_string(), 200),
            "Analysis submitted"
        );
        Ok(body)
    }

    /// List the files the manuscript service has already analyzed.
    #[instrument(level = "info", skip_all)]
    pub async fn previously_analyzed(&self) -> Result<Value, DispatchError> {
        let base = self
            .manuscript_base
            .as_deref()
            .ok_or(DispatchError::NotConfigured("MANUSCRIPT_MGMT_BASE"))?;
        let endpoint = format!("{base}/analytics-json-all");
        let token = self.tokens.get_token().await?;

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(token)
            .timeout(HISTORY_TIMEOUT)
            .send()
            .await
            .map_err(|e| DispatchError::transport(e, &endpoint))?;

        let body = read_json(response, &endpoint).await?;
        debug!(response = %truncate_for_log(&body.to_string(), 200), "Fetched analysis history");
        Ok(body)
    }

    /// [`previously_analyzed`](Self::previously_analyzed) with exponential backoff.
    pub async fn previously_analyzed_with_retry(
        &self,
        max_attempts: usize,
        initial_delay: Duration,
    ) -> Result<Value, RetryExhausted<DispatchError>> {
        fetch_with_retry(max_attempts, initial_delay, || self.previously_analyzed()).await
    }

    /// Probe the manuscript service; failures are reported, never raised.
    #[instrument(level = "info", skip_all)]
    pub async fn health_check(&self) -> HealthReport {
        let Some(base) = self.manuscript_base.as_deref() else {
            return HealthReport::failed(None, DispatchError::NotConfigured("MANUSCRIPT_MGMT_BASE"));
        };
        let endpoint = format!("{base}/health");

        let token = match self.tokens.get_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Health probe could not authenticate");
                return HealthReport::failed(None, e);
            }
        };

        let result = self
            .http
            .get(&endpoint)
            .bearer_auth(token)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => HealthReport {
                healthy: true,
                status: Some(response.status().as_u16()),
                error: None,
            },
            Ok(response) => {
                let status = response.status();
                warn!(status = status.as_u16(), "Health probe answered with failure");
                HealthReport::failed(
                    Some(status.as_u16()),
                    DispatchError::status(status, &endpoint),
                )
            }
            Err(e) => {
                warn!(error = %e, "Health probe failed");
                HealthReport::failed(None, DispatchError::transport(e, &endpoint))
            }
        }
    }
}

async fn read_json(response: reqwest::Response, endpoint: &str) -> Result<Value, DispatchError> {
    let status = response.status();
    if !status.is_success() {
        let err = DispatchError::status(status, endpoint);
        warn!(status = status.as_u16(), error = %err, "Service rejected request");
        return Err(err);
    }
    response.json().await.map_err(|source| DispatchError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}
