use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::adapters::file_stem;
use crate::model::ComponentType;
use crate::scan::go::KsmScanner;
use crate::scan::{WalkSpec, dedup_by_name_and_component, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// One file per Kubernetes resource; `builder.go` and `utils.go` only wire them together.
const STORES: WalkSpec = WalkSpec {
    extensions: &[".go"],
    skip_dirs: &[],
    skip_file_suffixes: &["_test.go", "builder.go", "utils.go"],
    skip_path_fragments: &[],
    max_depth: Some(1),
};

/// kube-state-metrics resource stores; each file names the resource it exports.
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeStateMetricsAdapter;

#[async_trait]
impl Adapter for KubeStateMetricsAdapter {
    identity!("kubernetes-ksm", Kubernetes, Ast, Authoritative, "https://github.com/kubernetes/kube-state-metrics");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let metrics = scan_tree(
                &root,
                &root.join("internal").join("store"),
                &STORES,
                &KsmScanner,
                ComponentType::Platform,
                |relative| file_stem(relative).to_string(),
                cancel,
            )?;
            Ok(dedup_by_name_and_component(metrics))
        })
        .await
    }
}
