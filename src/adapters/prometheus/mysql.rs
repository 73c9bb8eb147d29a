use super::scan_package;
use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::adapters::file_stem;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// `mysqld_exporter`, one scraper per file under `collector/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlExporterAdapter;

#[async_trait]
impl Adapter for MysqlExporterAdapter {
    identity!("prometheus-mysql", Prometheus, Ast, Derived, "https://github.com/prometheus/mysqld_exporter");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| {
            scan_package(&root, &root.join("collector"), |relative| file_stem(relative).to_string(), cancel)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{fetched, write_tree};
    use crate::model::{Attribute, InstrumentType};

    const GLOBAL_STATUS: &str = r#"
package collector

import "github.com/prometheus/client_golang/prometheus"

const namespace = "mysql"

var (
	globalStatusDesc = prometheus.NewDesc(
		prometheus.BuildFQName(namespace, "global_status", "uptime_seconds"),
		"Number of seconds since the server started.",
		nil, nil,
	)
	queriesDesc = prometheus.NewDesc(
		prometheus.BuildFQName(namespace, "global_status", "queries_total"),
		"Total number of queries executed by the server.",
		[]string{"type"}, nil,
	)
)
"#;

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_scrapers() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(
            dir.path(),
            &[
                ("collector/global_status.go", GLOBAL_STATUS),
                ("collector/global_status_test.go", GLOBAL_STATUS),
            ],
        );

        let metrics = MysqlExporterAdapter.extract(&CancellationToken::new(), &fetched(dir.path())).await.unwrap();
        assert_eq!(metrics.len(), 2);

        assert_eq!(metrics[0].name, "mysql_global_status_uptime_seconds");
        assert_eq!(metrics[0].instrument_type, InstrumentType::Gauge);

        let queries = &metrics[1];
        assert_eq!(queries.name, "mysql_global_status_queries_total");
        assert_eq!(queries.description, "Total number of queries executed by the server.");
        assert_eq!(queries.instrument_type, InstrumentType::Counter);
        assert_eq!(queries.attributes, vec![Attribute::label("type")]);
        assert_eq!(queries.component_name, "global_status");
    }
}
