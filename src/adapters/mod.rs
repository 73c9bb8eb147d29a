//! The upstream sources shipped with the crate.
//!
//! Adapters are grouped by source category. Every adapter except the Claude Code catalogue uses the default
//! shallow-clone fetch and differs only in how it walks the snapshot.

/// Implements the identity half of [`Adapter`](crate::adapter::Adapter) inside an `impl` block.
macro_rules! identity {
    ($name:literal, $category:ident, $method:ident, $confidence:ident, $repo:literal) => {
        fn name(&self) -> &str {
            $name
        }

        fn source_category(&self) -> crate::model::SourceCategory {
            crate::model::SourceCategory::$category
        }

        fn confidence(&self) -> crate::model::ConfidenceLevel {
            crate::model::ConfidenceLevel::$confidence
        }

        fn extraction_method(&self) -> crate::model::ExtractionMethod {
            crate::model::ExtractionMethod::$method
        }

        fn repo_url(&self) -> &str {
            $repo
        }
    };
}

mod codingagent;
mod kubernetes;
mod otel;
mod prometheus;
mod vendor;

pub use codingagent::{ClaudeCodeAdapter, CodexAdapter, GeminiCliAdapter};
pub use kubernetes::{CadvisorAdapter, KubeStateMetricsAdapter};
pub use otel::{
    CollectorContribAdapter, OtelDotnetAdapter, OtelGoAdapter, OtelJavaAdapter, OtelJsAdapter, OtelPythonAdapter, OtelRustAdapter,
    SemconvAdapter,
};
pub use prometheus::{
    ClickHouseAdapter, CockroachDbAdapter, ElasticsearchExporterAdapter, KafkaExporterAdapter, MemcachedExporterAdapter,
    MongoDbExporterAdapter, MysqlExporterAdapter, NodeExporterAdapter, PostgresExporterAdapter, RedisExporterAdapter,
};
pub use vendor::{OpenLitAdapter, OpenLlmetryAdapter};

use crate::{Error, Result};
use crate::adapter::{Adapter, Registry};
use crate::config::Config;
use ohno::bail;
use std::path::Path;
use std::sync::Arc;

/// Every shipped adapter, keyed by name.
pub fn default_registry() -> Result<Registry> {
    let adapters: [Arc<dyn Adapter>; 25] = [
        Arc::new(CollectorContribAdapter),
        Arc::new(SemconvAdapter),
        Arc::new(OtelGoAdapter),
        Arc::new(OtelPythonAdapter),
        Arc::new(OtelDotnetAdapter),
        Arc::new(OtelJsAdapter),
        Arc::new(OtelRustAdapter),
        Arc::new(OtelJavaAdapter),
        Arc::new(NodeExporterAdapter),
        Arc::new(KafkaExporterAdapter),
        Arc::new(MemcachedExporterAdapter),
        Arc::new(ClickHouseAdapter),
        Arc::new(PostgresExporterAdapter),
        Arc::new(MysqlExporterAdapter),
        Arc::new(MongoDbExporterAdapter),
        Arc::new(RedisExporterAdapter),
        Arc::new(ElasticsearchExporterAdapter),
        Arc::new(CockroachDbAdapter),
        Arc::new(KubeStateMetricsAdapter),
        Arc::new(CadvisorAdapter),
        Arc::new(OpenLlmetryAdapter),
        Arc::new(OpenLitAdapter),
        Arc::new(ClaudeCodeAdapter),
        Arc::new(CodexAdapter),
        Arc::new(GeminiCliAdapter),
    ];

    let mut registry = Registry::new();
    for adapter in adapters {
        registry.register(adapter)?;
    }

    Ok(registry)
}

/// The shipped adapters selected by `config`. Naming an adapter that does not exist is an error.
pub fn configured_registry(config: &Config) -> Result<Registry> {
    let mut registry = default_registry()?;

    if let Some(unknown) = config.adapters.iter().find(|name| registry.get(name).is_none()) {
        bail!("unknown adapter '{unknown}' in configuration");
    }

    registry.retain(|name| config.is_adapter_enabled(name));
    Ok(registry)
}

fn file_stem(relative: &str) -> &str {
    let name = relative.rsplit('/').next().unwrap_or(relative);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// Adapters that read fixed files fail the whole extraction with a parse error when the snapshot root itself
/// is not a readable directory.
fn require_root(root: &Path) -> Result<(), Error> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(Error::parse(ohno::app_err!("repository root '{}' is not a readable directory", root.display())))
    }
}
