use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::metadata::semconv::{self, ModelFile};
use crate::model::ComponentType;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// The semantic-conventions registry: every `metric` group of the `model/` tree.
///
/// Its records are what the enricher classifies other sources against.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemconvAdapter;

#[async_trait]
impl Adapter for SemconvAdapter {
    identity!(
        "otel-semconv",
        Otel,
        Metadata,
        Authoritative,
        "https://github.com/open-telemetry/semantic-conventions"
    );

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| extract_model(&root, cancel)).await
    }
}

fn extract_model(root: &Path, cancel: &CancellationToken) -> Result<Vec<RawMetric>, Error> {
    let files = semconv::load_model(root, &root.join("model"), cancel)?;
    Ok(files.into_iter().flat_map(into_raw).collect())
}

fn into_raw(model: ModelFile) -> impl Iterator<Item = RawMetric> {
    let ModelFile { file, component, metrics } = model;

    metrics.into_iter().filter(|m| !m.name.is_empty()).map(move |m| RawMetric {
        instrument_type: m.instrument_type(),
        attributes: m.attributes(),
        description: m.brief.trim().to_string(),
        unit: m.unit.clone(),
        name: m.name,
        enabled_by_default: true,
        component_type: ComponentType::Instrumentation,
        component_name: component.clone(),
        source_location: file.path.display().to_string(),
        path: file.relative.clone(),
    })
}
