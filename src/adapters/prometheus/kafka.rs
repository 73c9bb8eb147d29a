use super::GO_PACKAGE;
use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::adapters::file_stem;
use crate::model::ComponentType;
use crate::scan::go::PrometheusScanner;
use crate::scan::{dedup_by_name_and_component, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// `kafka_exporter`, whose collector lives in the repository's top-level Go files.
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaExporterAdapter;

#[async_trait]
impl Adapter for KafkaExporterAdapter {
    identity!("prometheus-kafka", Prometheus, Ast, Derived, "https://github.com/danielqsj/kafka_exporter");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let metrics = scan_tree(
                &root,
                &root,
                &GO_PACKAGE,
                &PrometheusScanner::new(),
                ComponentType::Platform,
                component_name,
                cancel,
            )?;
            Ok(dedup_by_name_and_component(metrics))
        })
        .await
    }
}

fn component_name(relative: &str) -> String {
    let stem = file_stem(relative);
    stem.strip_suffix("_exporter").unwrap_or(stem).to_string()
}
