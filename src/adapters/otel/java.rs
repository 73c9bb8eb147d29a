use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::java::{JavaScanner, api_component_name, component_name};
use crate::scan::{WalkSpec, dedup_by_name_and_component, scan_tree};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const SOURCES: WalkSpec = WalkSpec {
    extensions: &[".java"],
    skip_dirs: &["build"],
    skip_file_suffixes: &[],
    skip_path_fragments: &["/test/", "/jmh/"],
    max_depth: None,
};

/// Semantic-convention helpers shared by the instrumentations; scanned when present.
const API_INCUBATOR: &str = "instrumentation-api-incubator";

/// Instrumentations of `opentelemetry-java-instrumentation`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtelJavaAdapter;

#[async_trait]
impl Adapter for OtelJavaAdapter {
    identity!(
        "otel-java",
        Otel,
        Ast,
        Derived,
        "https://github.com/open-telemetry/opentelemetry-java-instrumentation"
    );

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| extract_sources(&root, cancel)).await
    }
}

fn extract_sources(root: &Path, cancel: &CancellationToken) -> Result<Vec<RawMetric>, Error> {
    let mut metrics = scan_tree(
        root,
        &root.join("instrumentation"),
        &SOURCES,
        &JavaScanner,
        ComponentType::Instrumentation,
        component_name,
        cancel,
    )?;

    let api = root.join(API_INCUBATOR);
    if api.is_dir() {
        metrics.extend(scan_tree(
            root,
            &api,
            &SOURCES,
            &JavaScanner,
            ComponentType::Instrumentation,
            api_component_name,
            cancel,
        )?);
    }

    Ok(dedup_by_name_and_component(metrics))
}
