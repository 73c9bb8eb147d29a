use super::{resolve_labels, resolve_string, string_constants, string_slice_vars, string_literal};
use crate::model::Attribute;
use crate::scan::brackets::{self, Quotes};
use crate::scan::infer::prometheus_instrument_type;
use crate::scan::{MetricDef, SourceScanner};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static NEW_DESC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bprometheus\.NewDesc\s*\(").expect("valid regex"));

static BUILD_FQ_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:prometheus\.)?BuildFQName\s*\(").expect("valid regex"));

/// Go Prometheus `NewDesc` call sites.
///
/// Names come from a literal, a constant, or `BuildFQName(namespace, subsystem, name)`. Constants declared
/// in the scanned file take precedence over the package-level table supplied with
/// [`PrometheusScanner::with_constants`].
#[derive(Debug, Clone, Default)]
pub struct PrometheusScanner {
    package_constants: HashMap<String, String>,
}

impl PrometheusScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve identifiers that are declared elsewhere in the same Go package.
    #[must_use]
    pub fn with_constants(package_constants: HashMap<String, String>) -> Self {
        Self { package_constants }
    }
}

impl SourceScanner for PrometheusScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let mut constants = self.package_constants.clone();
        constants.extend(string_constants(source));
        let slice_vars = string_slice_vars(source);

        let mut defs = Vec::new();
        for m in NEW_DESC.find_iter(source) {
            let open = m.end() - 1;
            let Some(end) = brackets::find_closing(source, open, Quotes::GO) else {
                continue;
            };

            let args = brackets::split_top_level(&source[open + 1..end - 1], Quotes::GO);
            if args.len() < 2 {
                continue;
            }

            let name = metric_name(args[0], &constants);
            if name.is_empty() {
                continue;
            }

            let instrument_type = prometheus_instrument_type(&name);
            let mut def = MetricDef::new(name, instrument_type);
            def.description = string_literal(args[1]).unwrap_or_default();
            if let Some(labels) = args.get(2) {
                def.attributes = resolve_labels(labels, &slice_vars).into_iter().map(Attribute::label).collect();
            }
            defs.push(def);
        }

        defs
    }
}

/// The metric name an argument expression evaluates to, or empty when it cannot be resolved.
fn metric_name(expr: &str, constants: &HashMap<String, String>) -> String {
    if let Some(name) = resolve_string(expr, constants) {
        return name;
    }

    let expr = expr.trim();
    let Some(m) = BUILD_FQ_NAME.find(expr) else {
        return String::new();
    };

    let open = m.end() - 1;
    let Some(end) = brackets::find_closing(expr, open, Quotes::GO) else {
        return String::new();
    };

    let parts = brackets::split_top_level(&expr[open + 1..end - 1], Quotes::GO);
    if parts.len() != 3 {
        return String::new();
    }

    parts
        .into_iter()
        .map(|p| resolve_string(p, constants).unwrap_or_default())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
