//! One ingest → sectionize → analyze cycle over all configured source groups.
//!
//! Each [`SourceGroup`] is ingested on its own and submitted as a separate
//! analysis named `{label}-{analyticsType}-{unix_millis}`. Groups run one after
//! another; the first dispatch failure ends the cycle.

use chrono::Utc;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument};

use crate::api::{AnalysisClient, AnalysisRequest};
use crate::config::SourceGroup;
use crate::error::{DispatchError, RetryExhausted};
use crate::models::Section;
use crate::pipeline::IngestionPipeline;
use crate::retry::Backoff;
use crate::sections::to_sections;

/// Result of a completed cycle, as returned by `GET /api/news`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub analyses_started: bool,
    /// Articles submitted, summed over all groups.
    pub articles_count: usize,
    /// `id` of the first analysis the service reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
}

/// Sections produced for one group, before dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSections {
    pub label: String,
    pub sections: Vec<Section>,
}

/// Drives ingestion and dispatch for a fixed set of source groups.
#[derive(Debug, Clone)]
pub struct NewsCycle {
    pipeline: IngestionPipeline,
    groups: Vec<SourceGroup>,
    analytics_type: String,
    granularity: String,
    backoff: Backoff,
}

impl NewsCycle {
    pub fn new(
        pipeline: IngestionPipeline,
        groups: Vec<SourceGroup>,
        analytics_type: impl Into<String>,
        granularity: impl Into<String>,
        backoff: Backoff,
    ) -> Self {
        Self {
            pipeline,
            groups,
            analytics_type: analytics_type.into(),
            granularity: granularity.into(),
            backoff,
        }
    }

    /// Ingest every group and return its sections without dispatching.
    pub async fn collect(&self) -> Vec<GroupSections> {
        let mut out = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let articles = self.pipeline.ingest(&group.sources).await;
            out.push(GroupSections {
                label: group.label.clone(),
                sections: to_sections(&articles),
            });
        }
        out
    }

    /// Ingest and submit every group.
    ///
    /// # Errors
    ///
    /// The exhausted retry of the first group whose submission kept failing.
    #[instrument(level = "info", skip_all, fields(groups = self.groups.len(), retry = %self.backoff))]
    pub async fn run(
        &self,
        client: &AnalysisClient,
    ) -> Result<CycleReport, RetryExhausted<DispatchError>> {
        let t0 = Instant::now();
        let mut report = CycleReport {
            analyses_started: false,
            articles_count: 0,
            analysis_id: None,
        };

        for group in &self.groups {
            let articles = self.pipeline.ingest(&group.sources).await;
            let request = AnalysisRequest::new(
                self.analytics_type.as_str(),
                file_id(&group.label, &self.analytics_type),
                to_sections(&articles),
                group.force_reanalysis,
                self.granularity.as_str(),
            );

            let response = self.backoff.retry(|| client.analyze(&request)).await?;
            let id = response
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            info!(
                label = %group.label,
                file_id = %request.file_id,
                articles = articles.len(),
                analysis_id = ?id,
                "Group submitted for analysis"
            );

            report.analyses_started = true;
            report.articles_count += articles.len();
            if report.analysis_id.is_none() {
                report.analysis_id = id;
            }
        }

        info!(
            articles = report.articles_count,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "News cycle finished"
        );
        Ok(report)
    }
}

/// Submission name for a group: `{label}-{analyticsType}-{unix_millis}`.
pub fn file_id(label: &str, analytics_type: &str) -> String {
    format!("{label}-{analytics_type}-{}", Utc::now().timestamp_millis())
}
