use super::{composite_fields, string_literal};
use crate::model::InstrumentType;
use crate::scan::brackets::{self, Quotes};
use crate::scan::{MetricDef, SourceScanner};
use regex::Regex;
use std::sync::LazyLock;

static METADATA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bmetric\.Metadata\s*\{").expect("valid regex"));

/// CockroachDB `metric.Metadata{Name: …, Help: …, Unit: metric.Unit_…}` literals.
///
/// Names are dotted (`sql.conn.latency`); `.count` marks a counter and `.latency` a histogram.
#[derive(Debug, Clone, Copy, Default)]
pub struct CockroachScanner;

impl SourceScanner for CockroachScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let mut defs = Vec::new();

        for m in METADATA.find_iter(source) {
            let open = m.end() - 1;
            let Some(end) = brackets::find_closing(source, open, Quotes::GO) else {
                continue;
            };

            let fields = composite_fields(&source[open + 1..end - 1]);
            let Some(name) = fields.get("Name").and_then(|v| string_literal(v)).filter(|n| !n.is_empty()) else {
                continue;
            };

            let instrument_type = instrument_type(&name);
            let mut def = MetricDef::new(name, instrument_type);
            def.description = fields.get("Help").and_then(|v| string_literal(v)).unwrap_or_default();
            def.unit = fields.get("Unit").map(|v| unit(v)).unwrap_or_default().to_string();
            defs.push(def);
        }

        defs
    }
}

fn instrument_type(name: &str) -> InstrumentType {
    if name.ends_with(".count") {
        InstrumentType::Counter
    } else if name.contains(".latency") {
        InstrumentType::Histogram
    } else {
        InstrumentType::Gauge
    }
}

/// The unit named by a `metric.Unit_*` constant; empty for units without a common spelling.
fn unit(expr: &str) -> &'static str {
    let constant = expr.trim().rsplit('.').next().unwrap_or_default();
    match constant {
        "Unit_BYTES" => "bytes",
        "Unit_COUNT" => "count",
        "Unit_NANOSECONDS" | "Unit_TIMESTAMP_NS" => "nanoseconds",
        "Unit_SECONDS" | "Unit_TIMESTAMP_SEC" => "seconds",
        "Unit_PERCENT" => "percent",
        _ => "",
    }
}
