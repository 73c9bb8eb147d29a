use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::python::{PythonScanner, component_name};
use crate::scan::{WalkSpec, dedup_by_name_and_component, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const INSTRUMENTATION: WalkSpec = WalkSpec {
    extensions: &[".py"],
    skip_dirs: &["__pycache__"],
    skip_file_suffixes: &["_test.py"],
    skip_path_fragments: &["/tests/"],
    max_depth: None,
};

/// Instrumentation packages of `opentelemetry-python-contrib`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtelPythonAdapter;

#[async_trait]
impl Adapter for OtelPythonAdapter {
    identity!(
        "otel-python",
        Otel,
        Ast,
        Derived,
        "https://github.com/open-telemetry/opentelemetry-python-contrib"
    );

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let metrics = scan_tree(
                &root,
                &root.join("instrumentation"),
                &INSTRUMENTATION,
                &PythonScanner::new(),
                ComponentType::Instrumentation,
                component_name,
                cancel,
            )?;
            Ok(dedup_by_name_and_component(metrics))
        })
        .await
    }
}
