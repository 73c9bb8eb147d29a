use super::GO_PACKAGE;
use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::go::PrometheusScanner;
use crate::scan::{dedup_by_name_and_component, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const COMPONENT: &str = "memcached";

/// `memcached_exporter`; every descriptor lives in `pkg/exporter`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemcachedExporterAdapter;

#[async_trait]
impl Adapter for MemcachedExporterAdapter {
    identity!("prometheus-memcached", Prometheus, Ast, Derived, "https://github.com/prometheus/memcached_exporter");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let metrics = scan_tree(
                &root,
                &root.join("pkg").join("exporter"),
                &GO_PACKAGE,
                &PrometheusScanner::new(),
                ComponentType::Platform,
                |_| COMPONENT.to_string(),
                cancel,
            )?;
            Ok(dedup_by_name_and_component(metrics))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{fetched, write_tree};
    use crate::model::InstrumentType;

    const EXPORTER: &str = r#"
package exporter

const (
	Namespace           = "memcached"
	subsystemLruCrawler = "lru_crawler"
)

func New() *Exporter {
	return &Exporter{
		up: prometheus.NewDesc(
			prometheus.BuildFQName(Namespace, "", "up"),
			"Could the memcached server be reached.",
			nil,
			nil,
		),
		commands: prometheus.NewDesc(
			prometheus.BuildFQName(Namespace, "", "commands_total"),
			"Total number of all requests broken down by command (get, set, etc.) and status.",
			[]string{"command", "status"},
			nil,
		),
		lruCrawlerEnabled: prometheus.NewDesc(
			prometheus.BuildFQName(Namespace, subsystemLruCrawler, "enabled"),
			"Whether the LRU crawler is enabled.",
			nil,
			nil,
		),
	}
}
"#;

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_scans_exporter_package() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), &[("pkg/exporter/exporter.go", EXPORTER), ("pkg/exporter/exporter_test.go", EXPORTER)]);

        let metrics = MemcachedExporterAdapter
            .extract(&CancellationToken::new(), &fetched(dir.path()))
            .await
            .unwrap();
        let names: Vec<_> = metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["memcached_up", "memcached_commands_total", "memcached_lru_crawler_enabled"]);
        assert!(metrics.iter().all(|m| m.component_name == COMPONENT));
        assert_eq!(metrics[1].instrument_type, InstrumentType::Counter);
        assert_eq!(metrics[1].attributes.len(), 2);
    }
}
