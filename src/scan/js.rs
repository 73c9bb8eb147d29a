//! JavaScript and TypeScript: semantic-convention modules and `meter.create*` call sites.
//!
//! Packages in the JS contrib repository declare their metric names in a `semconv.ts` module:
//!
//! ```text
//! /**
//!  * Total CPU seconds broken down by different states.
//!  *
//!  * @experimental This metric is experimental and is subject to breaking changes.
//!  */
//! export const METRIC_SYSTEM_CPU_TIME = 'system.cpu.time' as const;
//! ```
//!
//! Instrumentation code then refers to those constants when creating instruments. Scanning therefore runs in
//! two passes: [`semconv_exports`] reads the modules, and [`JsScanner`] resolves call sites against them.

use super::brackets::{self, Quotes};
use super::infer::{dotted_instrument_type, dotted_unit};
use super::{MetricDef, SourceScanner, capture};
use crate::model::InstrumentType;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static METRIC_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"export\s+const\s+(METRIC_\w+)\s*=\s*['"]([^'"]+)['"]\s*as\s+const"#).expect("valid regex")
});

static CREATE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:this\._?meter|\bmeter)\.(create\w+)\s*\(").expect("valid regex"));

static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"description:\s*['"`]([^'"`]+)['"`]"#).expect("valid regex"));

static UNIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"unit:\s*['"`]([^'"`]+)['"`]"#).expect("valid regex"));

/// One `export const METRIC_* = '…' as const;` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemconvExport {
    /// The exported identifier, such as `METRIC_SYSTEM_CPU_TIME`
    pub constant: String,

    /// The metric it names, with the type and unit inferred from the name and the JSDoc as description
    pub def: MetricDef,
}

/// Read the metric exports of a semantic-conventions module.
#[must_use]
pub fn semconv_exports(source: &str) -> Vec<SemconvExport> {
    METRIC_EXPORT
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = &caps[2];

            let mut def = MetricDef::new(name, dotted_instrument_type(name));
            def.unit = dotted_unit(name).to_string();
            def.description = preceding_jsdoc(&source[..whole.start()]).unwrap_or_default();

            Some(SemconvExport {
                constant: caps[1].to_string(),
                def,
            })
        })
        .collect()
}

/// The description carried by the JSDoc block that ends `before`, ignoring trailing whitespace.
fn preceding_jsdoc(before: &str) -> Option<String> {
    let trimmed = before.trim_end();
    let body_end = trimmed.strip_suffix("*/")?.len();
    let body_start = trimmed[..body_end].rfind("/**")? + 3;

    let description = trimmed[body_start..body_end]
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty() && !line.starts_with('@'))
        .collect::<Vec<_>>()
        .join(" ");

    Some(description)
}

/// JS/TS `meter.create*` call sites.
///
/// The first argument is a string literal or an identifier resolved against the exports of the scanned
/// file and the table supplied with [`JsScanner::with_constants`]. Options come from the `{ description,
/// unit }` object that follows.
#[derive(Debug, Clone, Default)]
pub struct JsScanner {
    constants: HashMap<String, String>,
}

impl JsScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve identifiers exported by other modules, keyed by constant name.
    #[must_use]
    pub fn with_constants(constants: HashMap<String, String>) -> Self {
        Self { constants }
    }
}

impl SourceScanner for JsScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let local: HashMap<_, _> = METRIC_EXPORT
            .captures_iter(source)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect();

        let mut defs = Vec::new();
        for caps in CREATE_CALL.captures_iter(source) {
            let (Some(whole), Some(method)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let Some(instrument_type) = instrument_type(method.as_str()) else {
                continue;
            };

            let open = whole.end() - 1;
            let Some(end) = brackets::find_closing(source, open, Quotes::JS) else {
                continue;
            };

            let args_text = &source[open + 1..end - 1];
            let args = brackets::split_top_level(args_text, Quotes::JS);
            let Some(first) = args.first() else {
                continue;
            };

            let name = brackets::string_value(first, Quotes::JS).or_else(|| {
                let ident = first.trim();
                local.get(ident).or_else(|| self.constants.get(ident)).cloned()
            });
            let Some(name) = name.filter(|n| !n.is_empty()) else {
                continue;
            };

            let options = args.get(1).copied().unwrap_or_default();
            let mut def = MetricDef::new(name, instrument_type);
            def.description = capture(&DESCRIPTION, options).unwrap_or_default().to_string();
            def.unit = capture(&UNIT, options).unwrap_or_default().to_string();
            defs.push(def);
        }

        defs
    }
}

fn instrument_type(method: &str) -> Option<InstrumentType> {
    let kind = method.strip_prefix("create")?;
    let kind = kind.strip_prefix("Observable").unwrap_or(kind);
    match kind {
        "Counter" => Some(InstrumentType::Counter),
        "UpDownCounter" => Some(InstrumentType::UpDownCounter),
        "Histogram" => Some(InstrumentType::Histogram),
        "Gauge" => Some(InstrumentType::Gauge),
        _ => None,
    }
}

/// Component name for a file under `packages/`: the package directory without its
/// `instrumentation-`/`opentelemetry-` prefix.
#[must_use]
pub fn component_name(relative: &str) -> String {
    let package = relative.split('/').next().unwrap_or(relative);
    package
        .strip_prefix("instrumentation-")
        .or_else(|| package.strip_prefix("opentelemetry-"))
        .unwrap_or(package)
        .to_string()
}
