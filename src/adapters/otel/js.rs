//! Two passes over `opentelemetry-js-contrib/packages`.
//!
//! The first pass reads every `semconv.ts` module: its exports become records of their own and seed the
//! constants table. The second pass scans the remaining TypeScript for meter calls, resolving `METRIC_*`
//! references through that table and filling a missing description or unit from the matching export.

use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::js::{JsScanner, SemconvExport, component_name, semconv_exports};
use crate::scan::{MetricDef, SourceFile, SourceScanner, WalkSpec, collect_files, dedup_by_name_and_component, read_source, relative_path};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const PACKAGES: WalkSpec = WalkSpec {
    extensions: &[".ts"],
    skip_dirs: &["node_modules", "test", "build"],
    skip_file_suffixes: &[],
    skip_path_fragments: &["/test/", ".test.", ".spec.", "node_modules"],
    max_depth: None,
};

const SEMCONV_MODULE: &str = "semconv.ts";

/// Instrumentation packages of `opentelemetry-js-contrib`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtelJsAdapter;

#[async_trait]
impl Adapter for OtelJsAdapter {
    identity!(
        "otel-js",
        Otel,
        Ast,
        Derived,
        "https://github.com/open-telemetry/opentelemetry-js-contrib"
    );

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| extract_packages(&root, cancel)).await
    }
}

fn extract_packages(root: &Path, cancel: &CancellationToken) -> Result<Vec<RawMetric>, Error> {
    let packages = root.join("packages");
    let (semconv_files, sources): (Vec<_>, Vec<_>) = collect_files(root, &packages, &PACKAGES, cancel)?
        .into_iter()
        .partition(|f| f.path.file_name().is_some_and(|n| n == SEMCONV_MODULE));

    let mut modules: Vec<(SourceFile, Vec<SemconvExport>)> = Vec::new();
    let mut constants = HashMap::new();
    let mut registry: HashMap<String, MetricDef> = HashMap::new();

    for file in semconv_files {
        let Some(source) = read_source(&file.path) else {
            continue;
        };

        let exports = semconv_exports(&source);
        for export in &exports {
            let _ = constants.insert(export.constant.clone(), export.def.name.clone());
            let _ = registry.insert(export.def.name.clone(), export.def.clone());
        }
        modules.push((file, exports));
    }

    let scanner = JsScanner::with_constants(constants);
    let mut metrics = Vec::new();

    for file in sources {
        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        let Some(source) = read_source(&file.path) else {
            continue;
        };

        let component = component_name(&relative_path(&packages, &file.path));
        for mut def in scanner.scan(&source) {
            if let Some(known) = registry.get(&def.name) {
                if def.description.is_empty() {
                    def.description.clone_from(&known.description);
                }
                if def.unit.is_empty() {
                    def.unit.clone_from(&known.unit);
                }
            }
            metrics.push(def.into_raw(ComponentType::Instrumentation, component.clone(), &file));
        }
    }

    // call sites come first so their options win over the registry's JSDoc
    for (file, exports) in modules {
        let component = component_name(&relative_path(&packages, &file.path));
        metrics.extend(
            exports
                .into_iter()
                .map(|e| e.def.into_raw(ComponentType::Instrumentation, component.clone(), &file)),
        );
    }

    Ok(dedup_by_name_and_component(metrics))
}
