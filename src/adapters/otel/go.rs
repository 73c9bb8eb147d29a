use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::go::{GoOtelScanner, otel_component_name};
use crate::scan::{WalkSpec, dedup_by_name_and_component, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const INSTRUMENTATION: WalkSpec = WalkSpec {
    extensions: &[".go"],
    skip_dirs: &["test", "testdata", "vendor", "example", "examples"],
    skip_file_suffixes: &["_test.go"],
    skip_path_fragments: &[],
    max_depth: None,
};

/// Instrumentation libraries of `opentelemetry-go-contrib`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtelGoAdapter;

#[async_trait]
impl Adapter for OtelGoAdapter {
    identity!(
        "otel-go",
        Otel,
        Ast,
        Derived,
        "https://github.com/open-telemetry/opentelemetry-go-contrib"
    );

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let metrics = scan_tree(
                &root,
                &root.join("instrumentation"),
                &INSTRUMENTATION,
                &GoOtelScanner,
                ComponentType::Instrumentation,
                otel_component_name,
                cancel,
            )?;
            Ok(dedup_by_name_and_component(metrics))
        })
        .await
    }
}
