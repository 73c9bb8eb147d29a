use super::{resolve_string, string_constants};
use crate::model::InstrumentType;
use crate::scan::brackets::{self, Quotes};
use crate::scan::{MetricDef, SourceScanner};
use regex::Regex;
use std::sync::LazyLock;

static FAMILY_GENERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bgenerator\.NewFamilyGeneratorWithStability\s*\(").expect("valid regex"));

/// kube-state-metrics family generators.
///
/// The first three arguments are the metric name, its help text, and the `metric.<Type>` constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct KsmScanner;

impl SourceScanner for KsmScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let constants = string_constants(source);
        let mut defs = Vec::new();

        for m in FAMILY_GENERATOR.find_iter(source) {
            let open = m.end() - 1;
            let Some(end) = brackets::find_closing(source, open, Quotes::GO) else {
                continue;
            };

            let args = brackets::split_top_level(&source[open + 1..end - 1], Quotes::GO);
            if args.len() < 3 {
                continue;
            }

            let Some(name) = resolve_string(args[0], &constants).filter(|n| !n.is_empty()) else {
                continue;
            };

            let mut def = MetricDef::new(name, instrument_type(args[2]));
            def.description = resolve_string(args[1], &constants).unwrap_or_default();
            defs.push(def);
        }

        defs
    }
}

fn instrument_type(expr: &str) -> InstrumentType {
    match expr.trim() {
        "metric.Counter" => InstrumentType::Counter,
        "metric.Histogram" => InstrumentType::Histogram,
        "metric.Summary" => InstrumentType::Summary,
        _ => InstrumentType::Gauge,
    }
}
