//! The seam through which every upstream source plugs into the pipeline.
//!
//! An [`Adapter`] knows where one upstream source lives, how to obtain a snapshot of it, and how to recover
//! [`RawMetric`] records from that snapshot. Adapters are stateless between calls; the [`Registry`] keeps them
//! keyed by name so batch runs enumerate them in a deterministic order.

mod registry;

pub use registry::Registry;

use crate::fetcher::{FetchRequest, GitFetcher};
use crate::model::{Attribute, ComponentType, ConfidenceLevel, ExtractionMethod, InstrumentType, SourceCategory};
use crate::{Error, ErrorKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core::fmt::Debug;
use ohno::EnrichableExt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub(crate) const LOG_TARGET: &str = "   adapter";

/// Caller-supplied knobs for [`Adapter::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Revision to pin; `None` tracks the remote head
    pub commit: Option<String>,

    /// Discard any cached snapshot first
    pub force: bool,

    /// Root directory for snapshots
    pub cache_dir: PathBuf,

    /// Depth of shallow clones
    pub depth: u32,
}

impl FetchOptions {
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            commit: None,
            force: false,
            cache_dir: cache_dir.into(),
            depth: 1,
        }
    }
}

/// A snapshot descriptor returned by [`Adapter::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub repo_path: PathBuf,
    pub commit: String,
    pub timestamp: DateTime<Utc>,
}

/// An adapter-produced metric record, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMetric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub instrument_type: InstrumentType,
    pub attributes: Vec<Attribute>,
    pub enabled_by_default: bool,
    pub component_type: ComponentType,
    pub component_name: String,

    /// Absolute path of the defining file
    pub source_location: String,

    /// Repository-relative path of the defining file
    pub path: String,
}

/// One upstream source.
#[async_trait]
pub trait Adapter: Debug + Send + Sync {
    /// Stable name, recorded as the metrics' `source_name`.
    fn name(&self) -> &str;

    fn source_category(&self) -> SourceCategory;

    fn confidence(&self) -> ConfidenceLevel;

    fn extraction_method(&self) -> ExtractionMethod;

    fn repo_url(&self) -> &str;

    /// Produce a local snapshot of the upstream source.
    ///
    /// The default implementation shallow-clones [`Adapter::repo_url`] into the cache.
    async fn fetch(&self, cancel: &CancellationToken, options: &FetchOptions) -> Result<FetchResult, Error> {
        fetch_git(self.repo_url(), cancel, options).await
    }

    /// Recover raw metrics from a snapshot.
    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error>;
}

/// Fetch `repo_url` into the snapshot cache, honoring cancellation.
pub async fn fetch_git(repo_url: &str, cancel: &CancellationToken, options: &FetchOptions) -> Result<FetchResult, Error> {
    let fetcher = GitFetcher::new(&options.cache_dir);
    let request = FetchRequest {
        repo_url: repo_url.to_string(),
        commit: options.commit.clone(),
        shallow: true,
        depth: options.depth,
        force: options.force,
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::cancelled()),
        result = fetcher.fetch(&request) => {
            let snapshot = result.map_err(|e| Error::fetch(e.enrich_with(|| format!("could not fetch '{repo_url}'"))))?;
            Ok(FetchResult {
                repo_path: snapshot.repo_path,
                commit: snapshot.commit,
                timestamp: snapshot.timestamp,
            })
        }
    }
}

/// Run a blocking extraction on the blocking pool.
///
/// `extract` receives its own handle to the cancellation token and is expected to poll it between files.
pub async fn run_blocking<F>(cancel: &CancellationToken, extract: F) -> Result<Vec<RawMetric>, Error>
where
    F: FnOnce(&CancellationToken) -> Result<Vec<RawMetric>, Error> + Send + 'static,
{
    let token = cancel.clone();
    let metrics = tokio::task::spawn_blocking(move || extract(&token))
        .await
        .map_err(|e| Error::new(ErrorKind::Extract, ohno::app_err!("extraction task failed: {e}")))??;

    if cancel.is_cancelled() {
        return Err(Error::cancelled());
    }

    Ok(metrics)
}
