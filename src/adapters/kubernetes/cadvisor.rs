use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::adapters::file_stem;
use crate::model::ComponentType;
use crate::scan::go::CadvisorScanner;
use crate::scan::{WalkSpec, dedup_by_name_and_component, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const METRICS: WalkSpec = WalkSpec {
    extensions: &[".go"],
    skip_dirs: &[],
    skip_file_suffixes: &["_test.go", "prometheus_fake.go"],
    skip_path_fragments: &[],
    max_depth: Some(1),
};

/// cadvisor's Prometheus collectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct CadvisorAdapter;

#[async_trait]
impl Adapter for CadvisorAdapter {
    identity!("kubernetes-cadvisor", Kubernetes, Ast, Authoritative, "https://github.com/google/cadvisor");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let metrics = scan_tree(
                &root,
                &root.join("metrics"),
                &METRICS,
                &CadvisorScanner,
                ComponentType::Platform,
                component_name,
                cancel,
            )?;
            Ok(dedup_by_name_and_component(metrics))
        })
        .await
    }
}

/// `prometheus_machine.go` is `machine`; the main `prometheus.go` collector describes containers.
fn component_name(relative: &str) -> String {
    let stem = file_stem(relative);
    match stem.strip_prefix("prometheus_").or_else(|| stem.strip_prefix("prometheus")) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => "container".to_string(),
    }
}
