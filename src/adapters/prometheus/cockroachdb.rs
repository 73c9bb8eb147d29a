use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::go::CockroachScanner;
use crate::scan::{WalkSpec, dedup_by_name, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const SOURCES: WalkSpec = WalkSpec {
    extensions: &[".go"],
    skip_dirs: &["testdata", "testutils"],
    skip_file_suffixes: &["_test.go"],
    skip_path_fragments: &[],
    max_depth: None,
};

/// CockroachDB, whose packages under `pkg/` register `metric.Metadata` literals.
#[derive(Debug, Clone, Copy, Default)]
pub struct CockroachDbAdapter;

#[async_trait]
impl Adapter for CockroachDbAdapter {
    identity!("prometheus-cockroachdb", Prometheus, Ast, Authoritative, "https://github.com/cockroachdb/cockroach");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let metrics = scan_tree(
                &root,
                &root.join("pkg"),
                &SOURCES,
                &CockroachScanner,
                ComponentType::Platform,
                |_| "cockroachdb".to_string(),
                cancel,
            )?;
            Ok(dedup_by_name(metrics))
        })
        .await
    }
}
