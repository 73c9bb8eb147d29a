//! Java `Meter` instrument builders.

use super::brackets::{self, Quotes};
use super::{MetricDef, SourceScanner, capture};
use crate::model::InstrumentType;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static BUILDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b[mM]eter\s*\.\s*(counter|histogram|gauge|upDownCounter)Builder\s*\(\s*(?:"([^"]+)"|([A-Za-z_][\w.]*))\s*\)"#)
        .expect("valid regex")
});

static STRING_CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"static\s+final\s+String\s+(\w+)\s*=\s*"([^"]+)""#).expect("valid regex"));

static SET_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\.setDescription\s*\(\s*"([^"]+)""#).expect("valid regex"));

static SET_UNIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\.setUnit\s*\(\s*"([^"]+)""#).expect("valid regex"));

/// Java builder chains: `meter.histogramBuilder("name").setDescription("…").setUnit("…").build()`.
///
/// The chain runs to the end of its statement, so `.ofLongs()` and the `build*` variants need no special
/// handling.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScanner;

impl SourceScanner for JavaScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let constants: HashMap<_, _> = STRING_CONST
            .captures_iter(source)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect();

        let mut defs = Vec::new();
        for caps in BUILDER.captures_iter(source) {
            let (Some(whole), Some(kind)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let name = match (caps.get(2), caps.get(3)) {
                (Some(lit), _) => Some(lit.as_str().to_string()),
                (None, Some(ident)) => {
                    let ident = ident.as_str();
                    constants.get(ident.rsplit('.').next().unwrap_or(ident)).cloned()
                }
                _ => None,
            };
            let Some(name) = name else {
                continue;
            };

            let end = brackets::find_statement_end(source, whole.end(), Quotes::C_LIKE, None);
            let chain = &source[whole.start()..end];

            let mut def = MetricDef::new(name, instrument_type(kind.as_str()));
            def.description = capture(&SET_DESCRIPTION, chain).map(str::trim).unwrap_or_default().to_string();
            def.unit = capture(&SET_UNIT, chain).map(str::trim).unwrap_or_default().to_string();
            defs.push(def);
        }

        defs
    }
}

fn instrument_type(kind: &str) -> InstrumentType {
    match kind {
        "counter" => InstrumentType::Counter,
        "upDownCounter" => InstrumentType::UpDownCounter,
        "histogram" => InstrumentType::Histogram,
        _ => InstrumentType::Gauge,
    }
}

/// Component name for a file under `instrumentation/`: its first directory.
#[must_use]
pub fn component_name(relative: &str) -> String {
    relative.split('/').next().unwrap_or(relative).to_string()
}

/// Component name for a file under `instrumentation-api-incubator/`.
///
/// Helpers below a `semconv/<area>/` package are named `<area>-semconv`; anything else is `api`.
#[must_use]
pub fn api_component_name(relative: &str) -> String {
    let dirs: Vec<_> = relative.split('/').collect();
    let dirs = &dirs[..dirs.len().saturating_sub(1)];

    dirs.iter()
        .rposition(|d| *d == "semconv")
        .and_then(|i| dirs.get(i + 1))
        .map_or_else(|| "api".to_string(), |area| format!("{area}-semconv"))
}
