use super::scan_package;
use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::adapters::file_stem;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Percona's `mongodb_exporter`, whose collectors live under `exporter/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDbExporterAdapter;

#[async_trait]
impl Adapter for MongoDbExporterAdapter {
    identity!("prometheus-mongodb", Prometheus, Ast, Derived, "https://github.com/percona/mongodb_exporter");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| scan_package(&root, &root.join("exporter"), component_name, cancel)).await
    }
}

fn component_name(relative: &str) -> String {
    let stem = file_stem(relative);
    stem.strip_suffix("_collector").unwrap_or(stem).to_string()
}
