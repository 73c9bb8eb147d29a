use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::rust::{RustScanner, component_name};
use crate::scan::{WalkSpec, dedup_by_name_and_component, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const CRATES: WalkSpec = WalkSpec {
    extensions: &[".rs"],
    skip_dirs: &["target", "tests", "benches", ".git"],
    skip_file_suffixes: &["_test.rs"],
    skip_path_fragments: &[],
    max_depth: None,
};

/// Crates of `opentelemetry-rust-contrib`, which live directly below the repository root.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtelRustAdapter;

#[async_trait]
impl Adapter for OtelRustAdapter {
    identity!(
        "otel-rust",
        Otel,
        Ast,
        Derived,
        "https://github.com/open-telemetry/opentelemetry-rust-contrib"
    );

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let metrics = scan_tree(&root, &root, &CRATES, &RustScanner, ComponentType::Instrumentation, component_name, cancel)?;
            Ok(dedup_by_name_and_component(metrics))
        })
        .await
    }
}
