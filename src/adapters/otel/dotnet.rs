use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::csharp::{CSharpScanner, component_name};
use crate::scan::{WalkSpec, dedup_by_name_and_component, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const SOURCES: WalkSpec = WalkSpec {
    extensions: &[".cs"],
    skip_dirs: &["test", "tests", "obj", "bin"],
    skip_file_suffixes: &[],
    skip_path_fragments: &[".Tests", ".Test."],
    max_depth: None,
};

/// Projects of `opentelemetry-dotnet-contrib`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtelDotnetAdapter;

#[async_trait]
impl Adapter for OtelDotnetAdapter {
    identity!(
        "otel-dotnet",
        Otel,
        Ast,
        Derived,
        "https://github.com/open-telemetry/opentelemetry-dotnet-contrib"
    );

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let metrics = scan_tree(
                &root,
                &root.join("src"),
                &SOURCES,
                &CSharpScanner,
                ComponentType::Instrumentation,
                component_name,
                cancel,
            )?;
            Ok(dedup_by_name_and_component(metrics))
        })
        .await
    }
}
