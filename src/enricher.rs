//! Classification of metrics against the OpenTelemetry semantic-conventions registry.
//!
//! Names are compared after replacing `_` with `.`, so `http_server_request_duration` matches the registry
//! entry `http.server.request.duration` exactly. A metric that extends a registry name with further
//! segments, such as a histogram's `http.server.request.duration.bucket`, is a prefix match against the
//! longest registry name it extends.

use crate::Error;
use crate::metadata::semconv;
use crate::model::{CanonicalMetric, SemconvMatch};
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "  enricher";

/// Stability assumed for registry entries recovered from stored metrics.
const DEFAULT_STABILITY: &str = "stable";

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemconvEntry {
    pub name: String,
    pub stability: String,
}

impl SemconvEntry {
    pub fn new(name: impl Into<String>, stability: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stability: stability.into(),
        }
    }
}

/// The registry, indexed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct SemconvIndex {
    entries: HashMap<String, SemconvEntry>,
}

impl SemconvIndex {
    /// Build an index. When two entries normalize to the same name the later one wins.
    pub fn new(entries: impl IntoIterator<Item = SemconvEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (normalize(&e.name), e)).collect(),
        }
    }

    /// Build an index from previously extracted `otel-semconv` metrics.
    #[must_use]
    pub fn from_metrics(metrics: &[CanonicalMetric]) -> Self {
        Self::new(metrics.iter().map(|m| {
            let stability = if m.semconv_stability.is_empty() {
                DEFAULT_STABILITY
            } else {
                m.semconv_stability.as_str()
            };
            SemconvEntry::new(m.metric_name.clone(), stability)
        }))
    }

    /// Build an index from a local semantic-conventions `model/` directory.
    pub fn load_model_dir(model_dir: &Path) -> Result<Self, Error> {
        let files = semconv::load_model(model_dir, model_dir, &CancellationToken::new())?;
        let index = Self::new(
            files
                .into_iter()
                .flat_map(|f| f.metrics)
                .filter(|m| !m.name.is_empty())
                .map(|m| SemconvEntry::new(m.name, m.stability)),
        );

        log::info!(target: LOG_TARGET, "Loaded {} semantic-convention metric(s) from '{}'", index.len(), model_dir.display());
        Ok(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classify `name`, returning the match kind and the matching entry.
    #[must_use]
    pub fn classify(&self, name: &str) -> (SemconvMatch, Option<&SemconvEntry>) {
        let normalized = normalize(name);
        if let Some(entry) = self.entries.get(&normalized) {
            return (SemconvMatch::Exact, Some(entry));
        }

        let mut candidate = normalized.as_str();
        while let Some((head, _)) = candidate.rsplit_once('.') {
            candidate = head;
            if let Some(entry) = self.entries.get(candidate) {
                return (SemconvMatch::Prefix, Some(entry));
            }
        }

        (SemconvMatch::None, None)
    }

    /// Set the semconv fields of one metric.
    pub fn enrich(&self, metric: &mut CanonicalMetric) {
        let (kind, entry) = self.classify(&metric.metric_name);
        metric.semconv_match = kind;
        match entry {
            Some(entry) => {
                metric.semconv_name.clone_from(&entry.name);
                metric.semconv_stability.clone_from(&entry.stability);
            }
            None => {
                metric.semconv_name.clear();
                metric.semconv_stability.clear();
            }
        }
    }

    pub fn enrich_all(&self, metrics: &mut [CanonicalMetric]) {
        for metric in metrics {
            self.enrich(metric);
        }
    }
}

fn normalize(name: &str) -> String {
    name.replace('_', ".")
}
