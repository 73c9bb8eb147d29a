//! Drives extraction runs.
//!
//! A run fetches one adapter's snapshot, extracts raw metrics from it, normalizes them into canonical
//! records, classifies them against the semantic conventions, and upserts the surviving batch. Every run is
//! audited by an [`ExtractionRun`] that is finalized as `completed` or `failed` on every exit path once it
//! has been created.

use crate::Error;
use crate::adapter::{Adapter, FetchOptions, FetchResult, RawMetric, Registry};
use crate::enricher::SemconvIndex;
use crate::model::CanonicalMetric;
use crate::store::{ExtractionRun, Store};
use chrono::{DateTime, Utc};
use core::time::Duration;
use futures_util::future::join_all;
use ohno::EnrichableExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "  pipeline";

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub adapter_name: String,
    pub run_id: String,
    pub commit: String,

    /// Raw records returned by the adapter
    pub metrics_extracted: usize,

    /// Canonical records upserted after validation and deduplication
    pub metrics_stored: usize,

    pub duration: Duration,
}

/// Runs adapters against a shared store.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    store: Arc<dyn Store>,
    semconv: Option<Arc<SemconvIndex>>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, semconv: None }
    }

    /// Classify every stored metric against `index`.
    #[must_use]
    pub fn with_semconv(mut self, index: Arc<SemconvIndex>) -> Self {
        self.semconv = Some(index);
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Execute one extraction run.
    pub async fn run(&self, adapter: &dyn Adapter, cancel: &CancellationToken, options: &FetchOptions) -> Result<RunResult, Error> {
        let start = Instant::now();
        let started_at = Utc::now();
        let name = adapter.name();

        let mut run = ExtractionRun::start(format!("{name}-{}", started_at.timestamp_nanos_opt().unwrap_or_default()), name, started_at);
        self.store
            .create_extraction_run(&run)
            .await
            .map_err(|e| Error::new(e.kind(), e.into_app_err().enrich_with(|| format!("could not record run for adapter '{name}'"))))?;

        log::info!(target: LOG_TARGET, "Starting run '{}' for adapter '{name}'", run.id);

        match self.execute(adapter, cancel, options, &mut run).await {
            Ok((metrics_extracted, metrics_stored)) => {
                run.complete(metrics_stored, Utc::now());
                if let Err(e) = self.store.update_extraction_run(&run).await {
                    log::warn!(target: LOG_TARGET, "Could not finalize run '{}': {e}", run.id);
                }

                log::info!(
                    target: LOG_TARGET,
                    "Run '{}' completed: {metrics_stored} metric(s) stored from {metrics_extracted} extracted",
                    run.id
                );

                Ok(RunResult {
                    adapter_name: name.to_string(),
                    run_id: run.id,
                    commit: run.commit,
                    metrics_extracted,
                    metrics_stored,
                    duration: start.elapsed(),
                })
            }

            Err(e) => {
                run.fail(&e, Utc::now());
                if let Err(update) = self.store.update_extraction_run(&run).await {
                    log::warn!(target: LOG_TARGET, "Could not finalize run '{}': {update}", run.id);
                }

                log::warn!(target: LOG_TARGET, "Run '{}' failed: {e}", run.id);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        adapter: &dyn Adapter,
        cancel: &CancellationToken,
        options: &FetchOptions,
        run: &mut ExtractionRun,
    ) -> Result<(usize, usize), Error> {
        let fetched = adapter.fetch(cancel, options).await?;
        run.commit.clone_from(&fetched.commit);
        log::info!(target: LOG_TARGET, "Fetched '{}' at {}", adapter.repo_url(), fetched.commit);

        let raw = adapter.extract(cancel, &fetched).await?;
        let extracted = raw.len();

        let mut metrics = normalize(adapter, &fetched, raw, Utc::now());
        if let Some(index) = &self.semconv {
            index.enrich_all(&mut metrics);
        }

        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        self.store.upsert_metrics(&metrics).await?;
        Ok((extracted, metrics.len()))
    }

    /// Run every adapter of `registry`, in name order, with at most `max_concurrent` runs in flight.
    ///
    /// Each adapter gets its own outcome; a failing run does not affect the others.
    pub async fn run_all(
        &self,
        registry: &Registry,
        cancel: &CancellationToken,
        options: &FetchOptions,
        max_concurrent: usize,
    ) -> Vec<(String, Result<RunResult, Error>)> {
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

        join_all(registry.iter().map(|adapter| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let name = adapter.name().to_string();
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => self.run(adapter.as_ref(), cancel, options).await,
                    Err(e) => Err(Error::new(crate::ErrorKind::Extract, ohno::app_err!("run scheduling failed: {e}"))),
                };
                (name, result)
            }
        }))
        .await
    }
}

/// Convert raw records into canonical ones.
///
/// Adapter-level fields are stamped onto every record. Records failing validation are dropped with a
/// warning, and records sharing an identity collapse to one, preferring a record with a description.
pub(crate) fn normalize(adapter: &dyn Adapter, fetched: &FetchResult, raw: Vec<RawMetric>, now: DateTime<Utc>) -> Vec<CanonicalMetric> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut metrics: Vec<CanonicalMetric> = Vec::with_capacity(raw.len());

    for r in raw {
        let mut metric = CanonicalMetric {
            id: String::new(),
            metric_name: r.name,
            instrument_type: r.instrument_type,
            description: r.description,
            unit: r.unit,
            attributes: r.attributes,
            enabled_by_default: r.enabled_by_default,
            component_type: r.component_type,
            component_name: r.component_name,
            source_category: adapter.source_category(),
            source_name: adapter.name().to_string(),
            source_location: r.source_location,
            extraction_method: adapter.extraction_method(),
            source_confidence: adapter.confidence(),
            repo: adapter.repo_url().to_string(),
            path: r.path,
            commit: fetched.commit.clone(),
            extracted_at: fetched.timestamp,
            semconv_match: crate::model::SemconvMatch::None,
            semconv_name: String::new(),
            semconv_stability: String::new(),
            created_at: Some(now),
            updated_at: Some(now),
        };

        if let Err(e) = metric.validate() {
            log::warn!(target: LOG_TARGET, "Dropping metric from '{}': {e}", adapter.name());
            continue;
        }

        metric.ensure_id();
        match positions.get(&metric.id) {
            Some(&i) => {
                if metrics[i].description.is_empty() && !metric.description.is_empty() {
                    metrics[i] = metric;
                }
            }
            None => {
                let _ = positions.insert(metric.id.clone(), metrics.len());
                metrics.push(metric);
            }
        }
    }

    metrics
}
