//! Persistence of canonical metrics and extraction runs.
//!
//! [`Store`] is the contract the orchestrator writes through and readers query. Any backend must make a
//! batch upsert atomic: either every record of the batch becomes visible or none does. [`MemoryStore`] is
//! the reference backend.

mod memory;
mod search;

pub use memory::MemoryStore;
pub use search::{DEFAULT_SEARCH_LIMIT, FacetCounts, FacetQuery, SearchQuery, SearchResult};

use crate::Error;
use crate::model::CanonicalMetric;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core::fmt::Debug;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub(crate) const LOG_TARGET: &str = "     store";

/// State of an [`ExtractionRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Audit record of one orchestrator invocation against one adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRun {
    pub id: String,
    pub adapter_name: String,
    #[serde(default)]
    pub commit: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics_count: usize,
    pub status: RunStatus,
    #[serde(default)]
    pub error_message: String,
}

impl ExtractionRun {
    /// A run that has just started.
    #[must_use]
    pub fn start(id: impl Into<String>, adapter_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            adapter_name: adapter_name.into(),
            commit: String::new(),
            started_at,
            completed_at: None,
            metrics_count: 0,
            status: RunStatus::Running,
            error_message: String::new(),
        }
    }

    /// Mark the run completed with the number of metrics stored.
    pub fn complete(&mut self, metrics_count: usize, at: DateTime<Utc>) {
        self.status = RunStatus::Completed;
        self.metrics_count = metrics_count;
        self.completed_at = Some(at);
    }

    /// Mark the run failed, recording the error message verbatim.
    pub fn fail(&mut self, error: &Error, at: DateTime<Utc>) {
        self.status = RunStatus::Failed;
        self.error_message = error.to_string();
        self.completed_at = Some(at);
    }
}

/// A backend for canonical metrics and extraction runs. Implementations must be safe for concurrent use.
#[async_trait]
pub trait Store: Debug + Send + Sync {
    async fn upsert_metric(&self, metric: &CanonicalMetric) -> Result<(), Error>;

    /// Replace-by-identity for the whole batch, atomically.
    async fn upsert_metrics(&self, metrics: &[CanonicalMetric]) -> Result<(), Error>;

    async fn get_metric(&self, id: &str) -> Result<Option<CanonicalMetric>, Error>;

    /// Remove one metric together with its attributes. Returns whether it existed.
    async fn delete_metric(&self, id: &str) -> Result<bool, Error>;

    /// Remove every metric of a source. Returns how many were removed.
    async fn delete_metrics_by_source(&self, source_name: &str) -> Result<usize, Error>;

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, Error>;

    async fn get_facet_counts(&self) -> Result<FacetCounts, Error>;

    async fn get_filtered_facet_counts(&self, query: &FacetQuery) -> Result<FacetCounts, Error>;

    /// Metrics extracted from the semantic-conventions registry itself.
    async fn get_semconv_metrics(&self) -> Result<Vec<CanonicalMetric>, Error>;

    async fn create_extraction_run(&self, run: &ExtractionRun) -> Result<(), Error>;

    /// Finalize a running extraction run.
    async fn update_extraction_run(&self, run: &ExtractionRun) -> Result<(), Error>;

    async fn get_extraction_run(&self, id: &str) -> Result<Option<ExtractionRun>, Error>;

    /// The run of `adapter_name` with the newest start time.
    async fn get_latest_extraction_run(&self, adapter_name: &str) -> Result<Option<ExtractionRun>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_lifecycle() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let mut run = ExtractionRun::start("otel-go-1", "otel-go", start);
        assert_eq!(run.status, RunStatus::Running);
        assert!(!run.status.is_terminal());

        run.complete(42, start);
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.metrics_count, 42);
        assert!(run.status.is_terminal());

        let mut failed = ExtractionRun::start("otel-go-2", "otel-go", start);
        failed.fail(&Error::fetch(ohno::app_err!("git clone failed")), start);
        assert_eq!(failed.status, RunStatus::Failed);
        assert!(failed.error_message.contains("git clone failed"));
        assert_eq!(failed.completed_at, Some(start));
    }

    #[test]
    fn test_status_tags() {
        assert_eq!(RunStatus::Completed.to_string(), "completed");
        assert_eq!("failed".parse::<RunStatus>().unwrap(), RunStatus::Failed);
        assert_eq!(serde_json::to_string(&RunStatus::Running).unwrap(), "\"running\"");
    }
}
