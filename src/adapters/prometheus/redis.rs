use super::GO_PACKAGE;
use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::go::RedisScanner;
use crate::scan::{dedup_by_name, scan_tree};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// The exporter's default namespace, prefixed to every table key.
const NAMESPACE: &str = "redis";

/// `redis_exporter`, whose metrics are table entries under `exporter/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisExporterAdapter;

#[async_trait]
impl Adapter for RedisExporterAdapter {
    identity!("prometheus-redis", Prometheus, Ast, Derived, "https://github.com/oliver006/redis_exporter");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            let dir = root.join("exporter");
            let mut metrics = scan_tree(
                &root,
                &dir,
                &GO_PACKAGE,
                &RedisScanner,
                ComponentType::Platform,
                |_| NAMESPACE.to_string(),
                cancel,
            )?;
            for metric in &mut metrics {
                metric.name = format!("{NAMESPACE}_{}", metric.name);
            }
            Ok(dedup_by_name(metrics))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{fetched, write_tree};
    use crate::model::{Attribute, InstrumentType};

    const EXPORTER: &str = r#"
package exporter

var metricDescriptions = map[string]struct {
	txt  string
	lbls []string
}{
	"commands_duration_seconds_total": {
		txt:  "Total amount of time in seconds spent per command",
		lbls: []string{"cmd"},
	},
	"connected_slave_lag_seconds": {
		txt:  "Lag of connected slave",
		lbls: []string{"slave_ip", "slave_port"},
	},
	"db_keys": {
		txt:  "Total number of keys by DB",
		lbls: []string{"db"},
	},
}
"#;

    const GAUGES: &str = r#"
package exporter

var metricMapGauges = map[string]string{
	"connected_clients": "connected_clients",
	"blocked_clients":   "blocked_clients",
	"used_memory":       "used_memory",
}

var metricMapCounters = map[string]string{
	"expired_keys_total": "expired_keys",
}
"#;

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_tables() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("exporter/exporter.go", EXPORTER),
                ("exporter/gauges.go", GAUGES),
                ("exporter/exporter_test.go", GAUGES),
                ("exporter/testdata/extra.go", GAUGES),
            ],
        );

        let metrics = RedisExporterAdapter.extract(&CancellationToken::new(), &fetched(dir.path())).await.unwrap();
        assert_eq!(metrics.len(), 7);
        assert!(metrics.iter().all(|m| m.component_name == "redis" && m.component_type == ComponentType::Platform));

        let find = |name: &str| metrics.iter().find(|m| m.name == name).unwrap();

        let duration = find("redis_commands_duration_seconds_total");
        assert_eq!(duration.instrument_type, InstrumentType::Counter);
        assert_eq!(duration.attributes, vec![Attribute::label("cmd")]);

        let lag = find("redis_connected_slave_lag_seconds");
        assert_eq!(lag.instrument_type, InstrumentType::Gauge);
        assert_eq!(lag.description, "Lag of connected slave");
        assert_eq!(lag.attributes.len(), 2);

        let clients = find("redis_connected_clients");
        assert_eq!(clients.instrument_type, InstrumentType::Gauge);
        assert_eq!(clients.description, "Redis connected_clients");

        assert_eq!(find("redis_expired_keys_total").instrument_type, InstrumentType::Counter);
    }
}
