//! Prometheus exporters, whose metrics are declared with `prometheus.NewDesc` or exporter-specific tables, and
//! ClickHouse's built-in endpoint.

mod clickhouse;
mod cockroachdb;
mod elasticsearch;
mod kafka;
mod memcached;
mod mongodb;
mod mysql;
mod node;
mod postgres;
mod redis;

pub use clickhouse::ClickHouseAdapter;
pub use cockroachdb::CockroachDbAdapter;
pub use elasticsearch::ElasticsearchExporterAdapter;
pub use kafka::KafkaExporterAdapter;
pub use memcached::MemcachedExporterAdapter;
pub use mongodb::MongoDbExporterAdapter;
pub use mysql::MysqlExporterAdapter;
pub use node::NodeExporterAdapter;
pub use postgres::PostgresExporterAdapter;
pub use redis::RedisExporterAdapter;

use crate::Error;
use crate::adapter::RawMetric;
use crate::model::ComponentType;
use crate::scan::go::{PrometheusScanner, string_constants};
use crate::scan::{WalkSpec, collect_files, dedup_by_name_and_component, read_source, scan_files};
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// The non-test Go files of one package directory.
const GO_PACKAGE: WalkSpec = WalkSpec {
    extensions: &[".go"],
    skip_dirs: &[],
    skip_file_suffixes: &["_test.go"],
    skip_path_fragments: &[],
    max_depth: Some(1),
};

/// Scan the `NewDesc` call sites of the Go package in `dir`, resolving names against the package's string
/// constants.
fn scan_package<F>(root: &Path, dir: &Path, component_of: F, cancel: &CancellationToken) -> Result<Vec<RawMetric>, Error>
where
    F: Fn(&str) -> String,
{
    let files = collect_files(root, dir, &GO_PACKAGE, cancel)?;

    // collectors share package-level constants such as `namespace`
    let mut constants = HashMap::new();
    for file in &files {
        if let Some(source) = read_source(&file.path) {
            constants.extend(string_constants(&source));
        }
    }

    let scanner = PrometheusScanner::with_constants(constants);
    let metrics = scan_files(dir, &files, &scanner, ComponentType::Platform, component_of, cancel)?;
    Ok(dedup_by_name_and_component(metrics))
}
