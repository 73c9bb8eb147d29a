use super::scan_package;
use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::adapters::file_stem;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// `elasticsearch_exporter`, one collector per file under `collector/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticsearchExporterAdapter;

#[async_trait]
impl Adapter for ElasticsearchExporterAdapter {
    identity!(
        "prometheus-elasticsearch",
        Prometheus,
        Ast,
        Derived,
        "https://github.com/prometheus-community/elasticsearch_exporter"
    );

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            scan_package(&root, &root.join("collector"), |relative| file_stem(relative).to_string(), cancel)
        })
        .await
    }
}
