use super::{ExtractionRun, FacetCounts, FacetQuery, LOG_TARGET, SearchQuery, SearchResult, Store};
use crate::model::CanonicalMetric;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Source name of the semantic-conventions registry adapter.
const SEMCONV_SOURCE: &str = "otel-semconv";

#[derive(Debug, Default)]
struct State {
    metrics: HashMap<String, CanonicalMetric>,
    runs: HashMap<String, ExtractionRun>,
}

/// On-disk form of a [`MemoryStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    metrics: Vec<CanonicalMetric>,
    #[serde(default)]
    runs: Vec<ExtractionRun>,
}

/// A [`Store`] held in memory, optionally backed by a JSON snapshot file.
///
/// Readers share the lock; every write, including a whole batch upsert, holds it exclusively, so a batch is
/// observed either entirely or not at all. Attributes are owned by their metric and go away with it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// An empty store with no backing file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`, loading it when it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes).into_app_err_with(|| format!("parsing store snapshot '{}'", path.display()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e).into_app_err_with(|| format!("reading store snapshot '{}'", path.display())),
        };

        log::debug!(
            target: LOG_TARGET,
            "Loaded {} metric(s) and {} run(s) from '{}'",
            snapshot.metrics.len(),
            snapshot.runs.len(),
            path.display()
        );

        let state = State {
            metrics: snapshot.metrics.into_iter().map(|m| (m.id.clone(), m)).collect(),
            runs: snapshot.runs.into_iter().map(|r| (r.id.clone(), r)).collect(),
        };

        Ok(Self {
            state: RwLock::new(state),
            path: Some(path),
        })
    }

    /// The backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the current contents to the backing file.
    ///
    /// The snapshot is written next to the file and renamed over it. A store without a backing file has
    /// nothing to flush.
    pub fn flush(&self) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let snapshot = {
            let state = self.read()?;
            let mut metrics: Vec<_> = state.metrics.values().cloned().collect();
            metrics.sort_by(|a, b| a.id.cmp(&b.id));
            let mut runs: Vec<_> = state.runs.values().cloned().collect();
            runs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
            Snapshot { metrics, runs }
        };

        let json = serde_json::to_vec_pretty(&snapshot).into_app_err("serializing store snapshot").map_err(Error::store)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .into_app_err_with(|| format!("creating '{}'", parent.display()))
                .map_err(Error::store)?;
        }

        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        fs::write(&temp, json)
            .into_app_err_with(|| format!("writing '{}'", temp.display()))
            .map_err(Error::store)?;
        fs::rename(&temp, path)
            .into_app_err_with(|| format!("replacing '{}'", path.display()))
            .map_err(Error::store)?;

        log::debug!(target: LOG_TARGET, "Flushed {} metric(s) to '{}'", snapshot.metrics.len(), path.display());
        Ok(())
    }

    /// Number of stored metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).metrics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, Error> {
        self.state.read().map_err(|e| Error::store(ohno::app_err!("store state is unusable: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, Error> {
        self.state.write().map_err(|e| Error::store(ohno::app_err!("store state is unusable: {e}")))
    }
}

/// Prepare a record for storage: assign its identity and check the required fields.
fn prepare(metric: &CanonicalMetric) -> Result<CanonicalMetric, Error> {
    let mut metric = metric.clone();
    metric.ensure_id();
    metric.validate()?;
    Ok(metric)
}

fn apply(state: &mut State, mut metric: CanonicalMetric) {
    let now = Utc::now();
    metric.created_at = state
        .metrics
        .get(&metric.id)
        .and_then(|prior| prior.created_at)
        .or(metric.created_at)
        .or(Some(now));
    metric.updated_at = metric.updated_at.or(Some(now));
    let _ = state.metrics.insert(metric.id.clone(), metric);
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_metric(&self, metric: &CanonicalMetric) -> Result<(), Error> {
        let metric = prepare(metric)?;
        apply(&mut *self.write()?, metric);
        Ok(())
    }

    async fn upsert_metrics(&self, metrics: &[CanonicalMetric]) -> Result<(), Error> {
        let prepared = metrics.iter().map(prepare).collect::<Result<Vec<_>, _>>()?;

        let mut state = self.write()?;
        for metric in prepared {
            apply(&mut state, metric);
        }

        Ok(())
    }

    async fn get_metric(&self, id: &str) -> Result<Option<CanonicalMetric>, Error> {
        Ok(self.read()?.metrics.get(id).cloned())
    }

    async fn delete_metric(&self, id: &str) -> Result<bool, Error> {
        Ok(self.write()?.metrics.remove(id).is_some())
    }

    async fn delete_metrics_by_source(&self, source_name: &str) -> Result<usize, Error> {
        let mut state = self.write()?;
        let before = state.metrics.len();
        state.metrics.retain(|_, m| m.source_name != source_name);
        Ok(before - state.metrics.len())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, Error> {
        let start = Instant::now();

        let mut matches: Vec<_> = {
            let state = self.read()?;
            state.metrics.values().filter(|m| query.matches(m)).cloned().collect()
        };

        query.sort(&mut matches);
        let total = matches.len();
        let metrics = matches.into_iter().skip(query.offset).take(query.effective_limit()).collect();

        Ok(SearchResult {
            metrics,
            total,
            took: start.elapsed(),
        })
    }

    async fn get_facet_counts(&self) -> Result<FacetCounts, Error> {
        let state = self.read()?;
        Ok(FacetCounts::count(state.metrics.values(), state.metrics.values()))
    }

    async fn get_filtered_facet_counts(&self, query: &FacetQuery) -> Result<FacetCounts, Error> {
        let state = self.read()?;
        let selected = state
            .metrics
            .values()
            .filter(|m| query.source_name.as_ref().is_none_or(|s| &m.source_name == s));
        Ok(FacetCounts::count(selected, state.metrics.values()))
    }

    async fn get_semconv_metrics(&self) -> Result<Vec<CanonicalMetric>, Error> {
        let state = self.read()?;
        let mut metrics: Vec<_> = state.metrics.values().filter(|m| m.source_name == SEMCONV_SOURCE).cloned().collect();
        metrics.sort_by(|a, b| a.metric_name.cmp(&b.metric_name));
        Ok(metrics)
    }

    async fn create_extraction_run(&self, run: &ExtractionRun) -> Result<(), Error> {
        let mut state = self.write()?;
        if state.runs.contains_key(&run.id) {
            return Err(Error::store(ohno::app_err!("extraction run '{}' already exists", run.id)));
        }

        let _ = state.runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn update_extraction_run(&self, run: &ExtractionRun) -> Result<(), Error> {
        let mut state = self.write()?;
        let Some(existing) = state.runs.get_mut(&run.id) else {
            return Err(Error::store(ohno::app_err!("extraction run '{}' does not exist", run.id)));
        };

        if existing.status.is_terminal() {
            return Err(Error::store(ohno::app_err!(
                "extraction run '{}' is already {} and cannot be changed",
                run.id,
                existing.status
            )));
        }

        if !run.status.is_terminal() {
            return Err(Error::store(ohno::app_err!(
                "extraction run '{}' can only move to completed or failed, not {}",
                run.id,
                run.status
            )));
        }

        existing.clone_from(run);
        Ok(())
    }

    async fn get_extraction_run(&self, id: &str) -> Result<Option<ExtractionRun>, Error> {
        Ok(self.read()?.runs.get(id).cloned())
    }

    async fn get_latest_extraction_run(&self, adapter_name: &str) -> Result<Option<ExtractionRun>, Error> {
        let state = self.read()?;
        Ok(state
            .runs
            .values()
            .filter(|r| r.adapter_name == adapter_name)
            .max_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::model::test_support::metric;
    use crate::model::{Attribute, ComponentType, InstrumentType, SourceCategory};
    use crate::store::RunStatus;
    use chrono::{Duration, TimeZone};

    fn http_metric() -> CanonicalMetric {
        let mut m = metric("otel-go", "http", "http.server.request.duration");
        m.instrument_type = InstrumentType::Histogram;
        m.description = "Duration of HTTP server requests.".to_string();
        m.unit = "s".to_string();
        m.attributes = vec![
            Attribute {
                name: "http.request.method".to_string(),
                attr_type: "string".to_string(),
                description: "HTTP request method.".to_string(),
                required: true,
                enum_values: vec!["GET".to_string(), "POST".to_string(), "_OTHER".to_string()],
            },
            Attribute::named("url.scheme"),
        ];
        m.created_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        m.updated_at = m.created_at;
        m
    }

    #[tokio::test]
    async fn test_round_trip_preserves_attributes() {
        let store = MemoryStore::new();
        let m = http_metric();
        store.upsert_metric(&m).await.unwrap();

        let got = store.get_metric(&m.id).await.unwrap().unwrap();
        assert_eq!(got, m);
        assert_eq!(got.attributes[0].enum_values, vec!["GET", "POST", "_OTHER"]);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_keeps_created_at() {
        let store = MemoryStore::new();
        let m = http_metric();
        store.upsert_metric(&m).await.unwrap();

        let mut changed = m.clone();
        changed.description = "Updated".to_string();
        changed.attributes.truncate(1);
        changed.created_at = None;
        changed.updated_at = None;
        store.upsert_metric(&changed).await.unwrap();
        store.upsert_metric(&changed).await.unwrap();

        assert_eq!(store.len(), 1);
        let got = store.get_metric(&m.id).await.unwrap().unwrap();
        assert_eq!(got.description, "Updated");
        assert_eq!(got.attributes.len(), 1);
        assert_eq!(got.created_at, m.created_at);
        assert!(got.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_upsert_assigns_identity() {
        let store = MemoryStore::new();
        let mut m = http_metric();
        m.id.clear();
        store.upsert_metrics(&[m.clone()]).await.unwrap();
        assert!(store.get_metric(&m.compute_id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failing_batch_leaves_store_unchanged() {
        let store = MemoryStore::new();
        let good = http_metric();
        let mut bad = metric("otel-go", "http", "x");
        bad.component_name.clear();

        let err = store.upsert_metrics(&[good.clone(), bad]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.is_empty());
        assert!(store.get_metric(&good.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_poisoned_state_is_a_store_error() {
        let store = MemoryStore::new();
        store.upsert_metric(&http_metric()).await.unwrap();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.state.write().unwrap();
            std::panic::resume_unwind(Box::new("writer failed"));
        }));
        assert!(outcome.is_err());

        let err = store.search(&SearchQuery::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(store.upsert_metric(&http_metric()).await.unwrap_err().kind(), ErrorKind::Store);
        assert!(store.flush().is_ok());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store
            .upsert_metrics(&[http_metric(), metric("otel-go", "grpc", "rpc.server.duration"), metric("otel-js", "host", "system.cpu.time")])
            .await
            .unwrap();

        assert!(store.delete_metric(&http_metric().id).await.unwrap());
        assert!(!store.delete_metric(&http_metric().id).await.unwrap());
        assert_eq!(store.delete_metrics_by_source("otel-go").await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_search_paging_and_total() {
        let store = MemoryStore::new();
        let metrics: Vec<_> = (0..30).map(|i| metric("otel-go", "c", &format!("metric.{i:02}"))).collect();
        store.upsert_metrics(&metrics).await.unwrap();

        let page = store.search(&SearchQuery::default()).await.unwrap();
        assert_eq!(page.total, 30);
        assert_eq!(page.metrics.len(), 20);
        assert_eq!(page.metrics[0].metric_name, "metric.00");

        let query = SearchQuery {
            limit: 10,
            offset: 25,
            ..SearchQuery::default()
        };
        let page = store.search(&query).await.unwrap();
        assert_eq!(page.total, 30);
        assert_eq!(page.metrics.len(), 5);
        assert_eq!(page.metrics[0].metric_name, "metric.25");
    }

    #[tokio::test]
    async fn test_search_text_ignores_component_and_source() {
        let store = MemoryStore::new();
        let mut by_description = metric("src", "comp", "b.metric");
        by_description.description = "counts redis commands".to_string();
        store
            .upsert_metrics(&[
                metric("src", "comp", "redis.commands"),
                by_description,
                metric("redis-source", "redis", "unrelated.metric"),
            ])
            .await
            .unwrap();

        let result = store.search(&SearchQuery::text("redis")).await.unwrap();
        let names: Vec<_> = result.metrics.iter().map(|m| m.metric_name.as_str()).collect();
        assert_eq!(names, vec!["redis.commands", "b.metric"]);
        assert_eq!(result.total, 2);
    }

    #[tokio::test]
    async fn test_facets() {
        let store = MemoryStore::new();
        let mut prom = metric("prometheus-node", "cpu", "node_cpu_seconds_total");
        prom.source_category = SourceCategory::Prometheus;
        prom.component_type = ComponentType::Platform;
        prom.instrument_type = InstrumentType::Counter;
        prom.unit = "s".to_string();
        store.upsert_metrics(&[http_metric(), prom, metric("otel-go", "grpc", "rpc.calls")]).await.unwrap();

        let all = store.get_facet_counts().await.unwrap();
        assert_eq!(all.source_names["otel-go"], 2);
        assert_eq!(all.source_names["prometheus-node"], 1);
        assert_eq!(all.units["s"], 2);
        assert_eq!(all.units.len(), 1);
        assert_eq!(all.source_categories[&SourceCategory::Otel], 2);

        let filtered = store
            .get_filtered_facet_counts(&FacetQuery {
                source_name: Some("prometheus-node".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(filtered.instrument_types.len(), 1);
        assert_eq!(filtered.instrument_types[&InstrumentType::Counter], 1);
        assert_eq!(filtered.component_names.keys().collect::<Vec<_>>(), vec!["cpu"]);
        assert_eq!(filtered.source_names.len(), 2);
    }

    #[tokio::test]
    async fn test_semconv_metrics() {
        let store = MemoryStore::new();
        store
            .upsert_metrics(&[metric("otel-semconv", "http", "http.server.request.duration"), http_metric()])
            .await
            .unwrap();
        let semconv = store.get_semconv_metrics().await.unwrap();
        assert_eq!(semconv.len(), 1);
        assert_eq!(semconv[0].source_name, "otel-semconv");
    }

    #[tokio::test]
    async fn test_extraction_run_rules() {
        let store = MemoryStore::new();
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let mut run = ExtractionRun::start("otel-go-1", "otel-go", start);
        store.create_extraction_run(&run).await.unwrap();
        assert_eq!(store.create_extraction_run(&run).await.unwrap_err().kind(), ErrorKind::Store);

        assert!(store.update_extraction_run(&run).await.is_err());

        run.complete(3, start + Duration::seconds(5));
        store.update_extraction_run(&run).await.unwrap();
        assert_eq!(store.get_extraction_run("otel-go-1").await.unwrap().unwrap().status, RunStatus::Completed);

        run.status = RunStatus::Failed;
        assert!(store.update_extraction_run(&run).await.is_err());

        let later = ExtractionRun::start("otel-go-2", "otel-go", start + Duration::minutes(1));
        store.create_extraction_run(&later).await.unwrap();
        store.create_extraction_run(&ExtractionRun::start("otel-js-1", "otel-js", start + Duration::hours(1))).await.unwrap();

        let latest = store.get_latest_extraction_run("otel-go").await.unwrap().unwrap();
        assert_eq!(latest.id, "otel-go-2");
        assert!(store.get_latest_extraction_run("nobody").await.unwrap().is_none());
        assert!(store.get_extraction_run("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_snapshot_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/metrics.json");

        let store = MemoryStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.upsert_metric(&http_metric()).await.unwrap();
        store
            .create_extraction_run(&ExtractionRun::start("otel-go-1", "otel-go", Utc::now()))
            .await
            .unwrap();
        store.flush().unwrap();
        assert!(path.exists());

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.get_metric(&http_metric().id).await.unwrap().unwrap(), http_metric());
        assert!(reopened.get_extraction_run("otel-go-1").await.unwrap().is_some());
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_open_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(MemoryStore::open(&path).is_err());
    }

    #[test]
    fn test_flush_without_path() {
        MemoryStore::new().flush().unwrap();
    }
}
