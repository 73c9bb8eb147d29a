use crate::Error;
use crate::adapter::{Adapter, FetchResult, LOG_TARGET, RawMetric, run_blocking};
use crate::adapters::require_root;
use crate::metadata::{Manifest, discover};
use crate::scan::relative_path;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Component manifests of the OpenTelemetry Collector contrib distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectorContribAdapter;

#[async_trait]
impl Adapter for CollectorContribAdapter {
    identity!(
        "otel-collector-contrib",
        Otel,
        Metadata,
        Authoritative,
        "https://github.com/open-telemetry/opentelemetry-collector-contrib"
    );

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| extract_manifests(&root, cancel)).await
    }
}

fn extract_manifests(root: &Path, cancel: &CancellationToken) -> Result<Vec<RawMetric>, Error> {
    require_root(root)?;

    let mut metrics = Vec::new();
    for file in discover(root) {
        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        let manifest = match Manifest::from_file(&file.path) {
            Ok(manifest) => manifest,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Skipping manifest: {e}");
                continue;
            }
        };

        let relative = relative_path(root, &file.path);
        metrics.extend(manifest.raw_metrics(file.component_type, &file.component_name, &file.path, &relative));
    }

    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::adapters::test_support::{fetched, write_tree};
    use crate::model::{ComponentType, InstrumentType};

    const REDIS: &str = r"
type: redis
status:
  class: receiver
attributes:
  state:
    description: Redis CPU usage state
    type: string
    enum: [sys, user]
metrics:
  redis.cpu.time:
    enabled: true
    description: System CPU consumed by the Redis server in seconds since server start
    unit: s
    sum:
      value_type: double
      monotonic: true
      aggregation_temporality: cumulative
    attributes: [state]
  redis.clients.connected:
    enabled: true
    description: Number of client connections
    unit: '{client}'
    sum:
      value_type: int
      monotonic: false
";

    const BATCH: &str = r"
type: batch
metrics:
  otelcol_processor_batch_batch_send_size:
    enabled: false
    description: Number of units in the batch
    histogram:
      value_type: int
";

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_extracts_every_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("receiver/redisreceiver/metadata.yaml", REDIS),
                ("processor/batchprocessor/metadata.yaml", BATCH),
                ("exporter/brokenexporter/metadata.yaml", "metrics: [unterminated"),
                ("receiver/README.md", "not a component"),
            ],
        );

        let metrics = CollectorContribAdapter
            .extract(&CancellationToken::new(), &fetched(dir.path()))
            .await
            .unwrap();
        assert_eq!(metrics.len(), 3);

        let cpu = &metrics[0];
        assert_eq!(cpu.name, "redis.cpu.time");
        assert_eq!(cpu.instrument_type, InstrumentType::Counter);
        assert_eq!(cpu.component_type, ComponentType::Receiver);
        assert_eq!(cpu.component_name, "redisreceiver");
        assert_eq!(cpu.path, "receiver/redisreceiver/metadata.yaml");
        assert_eq!(cpu.attributes[0].enum_values, vec!["sys", "user"]);

        assert_eq!(metrics[1].instrument_type, InstrumentType::UpDownCounter);

        let batch = &metrics[2];
        assert_eq!(batch.component_type, ComponentType::Processor);
        assert_eq!(batch.instrument_type, InstrumentType::Histogram);
        assert!(!batch.enabled_by_default);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_empty_tree_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = CollectorContribAdapter
            .extract(&CancellationToken::new(), &fetched(dir.path()))
            .await
            .unwrap();
        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_parse_error() {
        let err = CollectorContribAdapter
            .extract(&CancellationToken::new(), &fetched(Path::new("/definitely/not/a/snapshot")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
