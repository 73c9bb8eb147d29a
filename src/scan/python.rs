//! Python `opentelemetry.metrics` instrument factories.

use super::brackets::{self, CodeIndices, Quotes};
use super::{MetricDef, SourceScanner};
use crate::model::InstrumentType;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static CREATE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:self\.)?\w*meter\.(create_\w+)\s*\(").expect("valid regex"));

/// `NAME = "value"` and `NAME: str = "value"`, at module or class level.
static STRING_CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*([A-Za-z_]\w*)[ \t]*(?::[ \t]*str[ \t]*)?=[ \t]*["']([^"'\n]+)["']"#).expect("valid regex"));

/// Python meter call sites.
///
/// Arguments may be named (`name=`, `unit=`, `description=`) or positional in that order. A name given as
/// an identifier or dotted reference (`Meters.LLM_TOKEN_USAGE`) resolves by its last segment, first against
/// the table supplied with [`PythonScanner::with_constants`] and then against assignments in the same file.
#[derive(Debug, Clone, Default)]
pub struct PythonScanner {
    constants: HashMap<String, String>,
}

impl PythonScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_constants(constants: HashMap<String, String>) -> Self {
        Self { constants }
    }

    fn resolve(&self, expr: &str, local: &HashMap<String, String>) -> Option<String> {
        if let Some(s) = python_string(expr) {
            return Some(s);
        }

        let expr = expr.trim();
        if expr.is_empty() || !expr.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            return None;
        }

        let ident = expr.rsplit('.').next().unwrap_or(expr);
        self.constants.get(ident).or_else(|| local.get(ident)).cloned()
    }
}

impl SourceScanner for PythonScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let local = string_constants(source);
        let mut defs = Vec::new();

        for caps in CREATE_CALL.captures_iter(source) {
            let (Some(whole), Some(method)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let Some(instrument_type) = instrument_type(method.as_str()) else {
                continue;
            };

            let open = whole.end() - 1;
            let Some(end) = brackets::find_closing(source, open, Quotes::PYTHON) else {
                continue;
            };

            let args = Arguments::parse(&source[open + 1..end - 1]);
            let name = args
                .named("name")
                .or_else(|| args.positional(0))
                .and_then(|expr| self.resolve(expr, &local))
                .filter(|n| !n.is_empty());
            let Some(name) = name else {
                continue;
            };

            let mut def = MetricDef::new(name, instrument_type);
            def.unit = args.named("unit").or_else(|| args.positional(1)).and_then(python_string).unwrap_or_default();
            def.description = args
                .named("description")
                .or_else(|| args.positional(2))
                .and_then(python_string)
                .unwrap_or_default();
            defs.push(def);
        }

        defs
    }
}

/// String assignments in a Python module, keyed by the assigned name.
#[must_use]
pub fn string_constants(source: &str) -> HashMap<String, String> {
    STRING_CONST
        .captures_iter(source)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// Component name for a file below a directory of instrumentation packages, given its path relative to that
/// directory.
///
/// `opentelemetry-instrumentation-flask/src/...` is `flask`; files outside such a package are named by their
/// parent directory.
#[must_use]
pub fn component_name(relative: &str) -> String {
    const PACKAGE_PREFIX: &str = "opentelemetry-instrumentation-";

    let mut dirs: Vec<_> = relative.split('/').collect();
    let _ = dirs.pop();

    if let Some(name) = dirs.first().and_then(|d| d.strip_prefix(PACKAGE_PREFIX)) {
        return name.to_string();
    }

    dirs.last().map_or_else(|| "unknown".to_string(), |d| (*d).to_string())
}

fn instrument_type(method: &str) -> Option<InstrumentType> {
    let kind = method.strip_prefix("create_")?;
    let kind = kind.strip_prefix("observable_").unwrap_or(kind);
    match kind {
        "counter" => Some(InstrumentType::Counter),
        "up_down_counter" => Some(InstrumentType::UpDownCounter),
        "histogram" => Some(InstrumentType::Histogram),
        "gauge" => Some(InstrumentType::Gauge),
        _ => None,
    }
}

/// The split argument list of one call.
struct Arguments<'a> {
    positional: Vec<&'a str>,
    named: Vec<(&'a str, &'a str)>,
}

impl<'a> Arguments<'a> {
    fn parse(args: &'a str) -> Self {
        let mut positional = Vec::new();
        let mut named = Vec::new();

        for arg in brackets::split_top_level(args, Quotes::PYTHON) {
            match keyword(arg) {
                Some((key, value)) => named.push((key, value)),
                None => positional.push(arg),
            }
        }

        Self { positional, named }
    }

    fn named(&self, key: &str) -> Option<&'a str> {
        self.named.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    fn positional(&self, index: usize) -> Option<&'a str> {
        self.positional.get(index).copied()
    }
}

/// Split `key=value`, rejecting comparisons and anything whose key is not an identifier.
fn keyword(arg: &str) -> Option<(&str, &str)> {
    let (key, value) = arg.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || value.starts_with('=') || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    Some((key, value.trim()))
}

/// The value of a Python string expression: one literal, or adjacent literals (optionally parenthesized)
/// that the language concatenates.
fn python_string(expr: &str) -> Option<String> {
    let mut expr = expr.trim();
    while expr.starts_with('(') && expr.ends_with(')') {
        expr = expr[1..expr.len() - 1].trim();
    }

    if let Some(value) = brackets::string_value(expr, Quotes::PYTHON) {
        return Some(value);
    }

    let bytes = expr.as_bytes();
    let mut value = String::new();
    let mut piece_start = 0;
    let mut pieces = 0;
    for i in CodeIndices::new(expr, 0, Quotes::PYTHON) {
        if !bytes[i].is_ascii_whitespace() {
            return None;
        }
        if i > piece_start {
            value.push_str(&brackets::string_value(&expr[piece_start..i], Quotes::PYTHON)?);
            pieces += 1;
        }
        piece_start = i + 1;
    }

    if piece_start < expr.len() {
        value.push_str(&brackets::string_value(&expr[piece_start..], Quotes::PYTHON)?);
        pieces += 1;
    }

    (pieces > 1).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_arguments() {
        let src = r#"
        self._duration_histogram = meter.create_histogram(
            name="http.client.request.duration",
            unit="s",
            description="Duration of HTTP client requests.",
        )
"#;
        let defs = PythonScanner::new().scan(src);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "http.client.request.duration");
        assert_eq!(defs[0].instrument_type, InstrumentType::Histogram);
        assert_eq!(defs[0].unit, "s");
        assert_eq!(defs[0].description, "Duration of HTTP client requests.");
    }

    #[test]
    fn test_constant_names() {
        let src = r#"
class MetricNames:
    ACTIVE_REQUESTS: str = "http.server.active_requests"

def _instrument(meter):
    active = meter.create_up_down_counter(
        name=MetricNames.ACTIVE_REQUESTS,
        unit="{request}",
        description=(
            "Number of active HTTP server requests "
            'currently in flight.'
        ),
    )
    missing = meter.create_counter(name=Unknown.NAME)
"#;
        let defs = PythonScanner::new().scan(src);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "http.server.active_requests");
        assert_eq!(defs[0].instrument_type, InstrumentType::UpDownCounter);
        assert_eq!(defs[0].description, "Number of active HTTP server requests currently in flight.");
    }

    #[test]
    fn test_positional_with_supplied_constants() {
        let constants = HashMap::from([("LLM_TOKEN_USAGE".to_string(), "gen_ai.client.token.usage".to_string())]);
        let src = r#"
token_histogram = meter.create_histogram(
    Meters.LLM_TOKEN_USAGE,
    "token",
    "Measures number of input and output tokens used",
)
duration = self._meter.create_observable_gauge("llm.duration", "s")
"#;
        let defs = PythonScanner::with_constants(constants).scan(src);
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "gen_ai.client.token.usage");
        assert_eq!(defs[0].unit, "token");
        assert_eq!(defs[0].description, "Measures number of input and output tokens used");
        assert_eq!(defs[1].name, "llm.duration");
        assert_eq!(defs[1].instrument_type, InstrumentType::Gauge);
        assert_eq!(defs[1].unit, "s");
        assert!(defs[1].description.is_empty());
    }

    #[test]
    fn test_unknown_factory_is_ignored() {
        let src = r#"meter.create_resource(name="x")"#;
        assert!(PythonScanner::new().scan(src).is_empty());
    }

    #[test]
    fn test_python_string() {
        assert_eq!(python_string(r#"("a" "b")"#).as_deref(), Some("ab"));
        assert_eq!(python_string("'''x'''").as_deref(), Some("x"));
        assert_eq!(python_string(r#"f"{x}""#), None);
        assert_eq!(python_string(r#""a" + "b""#), None);
    }

    #[test]
    fn test_component_name() {
        assert_eq!(
            component_name("opentelemetry-instrumentation-flask/src/opentelemetry/instrumentation/flask/__init__.py"),
            "flask"
        );
        assert_eq!(component_name("shared/metrics/util.py"), "metrics");
        assert_eq!(component_name("setup.py"), "unknown");
    }
}
