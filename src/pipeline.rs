//! A configured batch: the shipped adapters, the store, and the enrichment registry wired from a [`Config`].

use crate::Error;
use crate::adapter::{Adapter, FetchOptions, Registry};
use crate::adapters::{SemconvAdapter, configured_registry};
use crate::config::Config;
use crate::enricher::SemconvIndex;
use crate::logging::init_logging;
use crate::orchestrator::{Orchestrator, RunResult};
use crate::store::{MemoryStore, SearchQuery, Store};
use camino::Utf8PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "     batch";

/// Per-adapter outcomes of one batch, in adapter name order.
pub type BatchOutcomes = Vec<(String, Result<RunResult, Error>)>;

/// Everything a batch needs, built once from configuration.
#[derive(Debug)]
pub struct Pipeline {
    store: Arc<MemoryStore>,
    registry: Registry,
    options: FetchOptions,
    max_concurrent_runs: usize,
    semconv_model_dir: Option<Utf8PathBuf>,
}

impl Pipeline {
    /// Install logging and open the store, the cache location and the adapter selection named by `config`.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        init_logging(config.log_level);

        let mut options = FetchOptions::new(config.resolved_cache_dir().map_err(Error::io)?);
        options.depth = config.shallow_depth;

        let store = match &config.store_path {
            Some(path) => MemoryStore::open(path.as_std_path()).map_err(Error::store)?,
            None => MemoryStore::new(),
        };

        let registry = configured_registry(config).map_err(Error::validation)?;
        log::debug!(target: LOG_TARGET, "Configured {} adapter(s)", registry.len());

        Ok(Self {
            store: Arc::new(store),
            registry,
            options,
            max_concurrent_runs: config.max_concurrent_runs,
            semconv_model_dir: config.semconv_model_dir.clone(),
        })
    }

    /// Replace the adapter selection.
    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn fetch_options(&self) -> &FetchOptions {
        &self.options
    }

    /// The enrichment registry: the configured model directory when there is one, otherwise the `otel-semconv`
    /// metrics already in the store. `None` when neither yields anything.
    pub async fn semconv_index(&self) -> Result<Option<SemconvIndex>, Error> {
        let index = match &self.semconv_model_dir {
            Some(dir) => SemconvIndex::load_model_dir(dir.as_std_path())?,
            None => SemconvIndex::from_metrics(&self.store.get_semconv_metrics().await?),
        };

        Ok((!index.is_empty()).then_some(index))
    }

    /// Run every selected adapter, then save the store.
    ///
    /// When the registry comes from the store and `otel-semconv` completed in this batch, every stored metric
    /// is classified again against the refreshed registry before saving.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<BatchOutcomes, Error> {
        let mut orchestrator = Orchestrator::new(Arc::clone(&self.store) as Arc<dyn Store>);
        if let Some(index) = self.semconv_index().await? {
            orchestrator = orchestrator.with_semconv(Arc::new(index));
        }

        let outcomes = orchestrator
            .run_all(&self.registry, cancel, &self.options, self.max_concurrent_runs)
            .await;

        let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
        log::info!(target: LOG_TARGET, "Batch finished: {} run(s), {failed} failed", outcomes.len());

        let semconv_refreshed = outcomes.iter().any(|(name, r)| name == SemconvAdapter.name() && r.is_ok());
        if self.semconv_model_dir.is_none() && semconv_refreshed {
            let _ = self.enrich_stored().await?;
        }

        self.store.flush()?;
        Ok(outcomes)
    }

    /// Classify every stored metric against the current registry and write the results back.
    ///
    /// Returns the number of metrics classified; nothing is written when the registry is empty.
    pub async fn enrich_stored(&self) -> Result<usize, Error> {
        let Some(index) = self.semconv_index().await? else {
            log::warn!(target: LOG_TARGET, "No semantic-convention metrics available; skipping enrichment");
            return Ok(0);
        };

        let query = SearchQuery {
            limit: usize::MAX,
            ..SearchQuery::default()
        };
        let mut metrics = self.store.search(&query).await?.metrics;
        index.enrich_all(&mut metrics);
        self.store.upsert_metrics(&metrics).await?;

        log::info!(target: LOG_TARGET, "Classified {} stored metric(s) against {} convention(s)", metrics.len(), index.len());
        Ok(metrics.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::model::SemconvMatch;
    use crate::model::test_support::metric;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: Some(Utf8PathBuf::from_path_buf(dir.path().join("cache")).unwrap()),
            shallow_depth: 3,
            adapters: vec!["otel-go".to_string(), "prometheus-node".to_string()],
            ..Config::default()
        };

        let pipeline = Pipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.fetch_options().depth, 3);
        assert_eq!(pipeline.fetch_options().cache_dir, dir.path().join("cache"));
        assert_eq!(pipeline.registry().names().collect::<Vec<_>>(), vec!["otel-go", "prometheus-node"]);
        assert!(pipeline.store().path().is_none());
    }

    #[test]
    fn test_from_config_unknown_adapter() {
        let config = Config {
            cache_dir: Some(Utf8PathBuf::from("/tmp/metric-library")),
            adapters: vec!["otel-cobol".to_string()],
            ..Config::default()
        };

        let err = Pipeline::from_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("otel-cobol"));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_index_prefers_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model");
        std::fs::create_dir_all(model.join("http")).unwrap();
        std::fs::write(
            model.join("http/metrics.yaml"),
            "groups:\n  - id: metric.http.client.request.duration\n    type: metric\n    metric_name: http.client.request.duration\n    stability: stable\n    instrument: histogram\n",
        )
        .unwrap();

        let config = Config {
            cache_dir: Some(Utf8PathBuf::from("/tmp/metric-library")),
            semconv_model_dir: Some(Utf8PathBuf::from_path_buf(model).unwrap()),
            ..Config::default()
        };
        let pipeline = Pipeline::from_config(&config).unwrap();

        let mut stored = metric("otel-semconv", "db", "db.client.operation.duration");
        stored.semconv_stability = "stable".to_string();
        pipeline.store().upsert_metric(&stored).await.unwrap();

        let index = pipeline.semconv_index().await.unwrap().unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.classify("http.client.request.duration").0, SemconvMatch::Exact);
    }

    #[tokio::test]
    async fn test_enrich_stored() {
        let config = Config {
            cache_dir: Some(Utf8PathBuf::from("/tmp/metric-library")),
            ..Config::default()
        };
        let pipeline = Pipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.enrich_stored().await.unwrap(), 0);

        let store = pipeline.store();
        store.upsert_metric(&metric("otel-semconv", "http", "http.server.request.duration")).await.unwrap();
        let source = metric("otel-go", "http", "http.server.request.duration.bucket");
        store.upsert_metric(&source).await.unwrap();

        assert_eq!(pipeline.enrich_stored().await.unwrap(), 2);

        let got = store.get_metric(&source.id).await.unwrap().unwrap();
        assert_eq!(got.semconv_match, SemconvMatch::Prefix);
        assert_eq!(got.semconv_name, "http.server.request.duration");
        assert_eq!(got.semconv_stability, "stable");
    }
}
