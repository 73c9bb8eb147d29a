use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::adapters::require_root;
use crate::model::ComponentType;
use crate::scan::clickhouse::{AsyncMetricsScanner, CurrentMetricsScanner, ProfileEventsScanner};
use crate::scan::{SourceFile, SourceScanner, dedup_by_name, read_source};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const CURRENT_METRICS: &str = "src/Common/CurrentMetrics.cpp";
const PROFILE_EVENTS: &str = "src/Common/ProfileEvents.cpp";

/// Both files assign asynchronous metrics; the server-level ones take precedence.
const ASYNC_METRICS: [&str; 2] = ["src/Interpreters/ServerAsynchronousMetrics.cpp", "src/Common/AsynchronousMetrics.cpp"];

/// The metric tables behind ClickHouse's built-in Prometheus endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHouseAdapter;

#[async_trait]
impl Adapter for ClickHouseAdapter {
    identity!("prometheus-clickhouse", Prometheus, Ast, Authoritative, "https://github.com/ClickHouse/ClickHouse");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| extract_tables(&root, cancel)).await
    }
}

fn extract_tables(root: &Path, cancel: &CancellationToken) -> Result<Vec<RawMetric>, Error> {
    require_root(root)?;

    let mut metrics = scan_file(root, CURRENT_METRICS, &CurrentMetricsScanner, "current_metrics");
    metrics.extend(scan_file(root, PROFILE_EVENTS, &ProfileEventsScanner, "profile_events"));

    let mut async_metrics = Vec::new();
    for relative in ASYNC_METRICS {
        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        async_metrics.extend(scan_file(root, relative, &AsyncMetricsScanner, "async_metrics"));
    }
    metrics.extend(dedup_by_name(async_metrics));

    Ok(metrics)
}

/// Scan one well-known file; a file that is absent or unreadable contributes nothing.
fn scan_file<S: SourceScanner>(root: &Path, relative: &str, scanner: &S, component: &str) -> Vec<RawMetric> {
    let file = SourceFile {
        path: root.join(relative),
        relative: relative.to_string(),
    };

    let Some(source) = read_source(&file.path) else {
        return Vec::new();
    };

    scanner
        .scan(&source)
        .into_iter()
        .map(|d| d.into_raw(ComponentType::Platform, component, &file))
        .collect()
}
