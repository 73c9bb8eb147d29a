//! Rust `opentelemetry` instrument builders.

use super::brackets::{CodeIndices, Quotes};
use super::{MetricDef, SourceScanner, capture};
use crate::model::InstrumentType;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static BUILDER_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:\w+\.)?meter\s*\.\s*([uif]64_(?:observable_)?(?:counter|up_down_counter|histogram|gauge))\s*\(\s*(?:Cow::from\()?(?:"([^"]+)"|([A-Z_][A-Z0-9_]*))\)?"#,
    )
    .expect("valid regex")
});

static STRING_CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"const\s+([A-Z_][A-Z0-9_]*)\s*:\s*&(?:'static\s+)?str\s*=\s*"([^"]+)""#).expect("valid regex"));

static WITH_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\.with_description\s*\(\s*"([^"]+)""#).expect("valid regex"));

static WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\.with_unit\s*\(\s*"([^"]+)""#).expect("valid regex"));

/// Longest builder chain searched for options.
const MAX_CHAIN: usize = 500;

/// Rust meter builder chains: `meter.f64_histogram(NAME).with_description("…").with_unit("…").build()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustScanner;

impl SourceScanner for RustScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let constants: HashMap<_, _> = STRING_CONST
            .captures_iter(source)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect();

        let mut defs = Vec::new();
        for caps in BUILDER_CALL.captures_iter(source) {
            let (Some(whole), Some(method)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let name = match (caps.get(2), caps.get(3)) {
                (Some(lit), _) => Some(lit.as_str().to_string()),
                (None, Some(constant)) => constants.get(constant.as_str()).cloned(),
                _ => None,
            };
            let Some(name) = name else {
                continue;
            };

            let chain = &source[whole.start()..chain_end(source, whole.end())];
            let mut def = MetricDef::new(name, instrument_type(method.as_str()));
            def.description = capture(&WITH_DESCRIPTION, chain).map(str::trim).unwrap_or_default().to_string();
            def.unit = capture(&WITH_UNIT, chain).map(str::trim).unwrap_or_default().to_string();
            defs.push(def);
        }

        defs
    }
}

fn instrument_type(method: &str) -> InstrumentType {
    if method.ends_with("up_down_counter") {
        InstrumentType::UpDownCounter
    } else if method.ends_with("counter") {
        InstrumentType::Counter
    } else if method.ends_with("histogram") {
        InstrumentType::Histogram
    } else {
        InstrumentType::Gauge
    }
}

/// End of the builder chain that continues at `start`.
///
/// The chain ends just after `.build()`, or before a top-level `;`, or before a line that starts a new
/// `let`/`const` item, and never extends more than [`MAX_CHAIN`] bytes.
fn chain_end(source: &str, start: usize) -> usize {
    const BUILD: &[u8] = b".build()";

    let limit = super::window_end(source, start, MAX_CHAIN);
    let bytes = source.as_bytes();

    for i in CodeIndices::new(source, start, Quotes::RUST) {
        if i >= limit {
            break;
        }

        // offsets may fall inside multi-byte characters, so match on bytes
        let rest = &bytes[i..];
        if rest.starts_with(BUILD) {
            return i + BUILD.len();
        }

        if rest[0] == b';' {
            return i;
        }

        if rest.starts_with(b"let ") || rest.starts_with(b"const ") {
            let line_start = bytes[..i].iter().rposition(|&b| b == b'\n').map_or(0, |n| n + 1);
            if bytes[line_start..i].iter().all(u8::is_ascii_whitespace) {
                return i;
            }
        }
    }

    limit
}

/// Component name for a file in the contrib repository: the crate directory without its OpenTelemetry prefix.
#[must_use]
pub fn component_name(relative: &str) -> String {
    let krate = relative.split('/').next().unwrap_or(relative);
    krate
        .strip_prefix("opentelemetry-instrumentation-")
        .or_else(|| krate.strip_prefix("opentelemetry-"))
        .unwrap_or(krate)
        .to_lowercase()
}
