use super::scan_package;
use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::adapters::file_stem;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Platform suffixes of collector files; `cpu_linux.go` and `cpu_darwin.go` both belong to `cpu`.
const PLATFORM_SUFFIXES: [&str; 9] = [
    "_linux",
    "_darwin",
    "_bsd",
    "_freebsd",
    "_netbsd",
    "_openbsd",
    "_dragonfly",
    "_solaris",
    "_common",
];

/// The node exporter's collectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeExporterAdapter;

#[async_trait]
impl Adapter for NodeExporterAdapter {
    identity!("prometheus-node", Prometheus, Ast, Derived, "https://github.com/prometheus/node_exporter");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| scan_package(&root, &root.join("collector"), component_name, cancel)).await
    }
}

fn component_name(relative: &str) -> String {
    let stem = file_stem(relative);
    PLATFORM_SUFFIXES
        .iter()
        .fold(stem, |name, suffix| name.strip_suffix(suffix).unwrap_or(name))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{fetched, write_tree};
    use crate::model::{ComponentType, InstrumentType};

    const COLLECTOR: &str = r#"
package collector

const namespace = "node"
"#;

    const CPU: &str = r#"
package collector

const cpuCollectorSubsystem = "cpu"

func NewCPUCollector(logger *slog.Logger) (Collector, error) {
    return &cpuCollector{
        cpu: prometheus.NewDesc(
            prometheus.BuildFQName(namespace, cpuCollectorSubsystem, "seconds_total"),
            "Seconds the CPUs spent in each mode.",
            []string{"cpu", "mode"}, nil,
        ),
    }, nil
}
"#;

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_resolves_package_constants() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("collector/collector.go", COLLECTOR),
                ("collector/cpu_linux.go", CPU),
                ("collector/cpu_darwin.go", CPU),
                ("collector/cpu_linux_test.go", CPU),
                ("collector/fixtures/nested.go", CPU),
            ],
        );

        let metrics = NodeExporterAdapter.extract(&CancellationToken::new(), &fetched(dir.path())).await.unwrap();
        assert_eq!(metrics.len(), 1);

        let cpu = &metrics[0];
        assert_eq!(cpu.name, "node_cpu_seconds_total");
        assert_eq!(cpu.instrument_type, InstrumentType::Counter);
        assert_eq!(cpu.component_type, ComponentType::Platform);
        assert_eq!(cpu.component_name, "cpu");
        assert_eq!(cpu.attributes.len(), 2);
    }

    #[test]
    fn test_component_name() {
        assert_eq!(component_name("cpu_linux.go"), "cpu");
        assert_eq!(component_name("filesystem_common.go"), "filesystem");
        assert_eq!(component_name("netdev_bsd.go"), "netdev");
        assert_eq!(component_name("textfile.go"), "textfile");
    }
}
