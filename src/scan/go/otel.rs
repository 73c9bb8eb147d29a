use super::{resolve_string, string_constants};
use crate::model::InstrumentType;
use crate::scan::brackets::{self, Quotes};
use crate::scan::{MetricDef, SourceScanner, capture, window_end};
use regex::Regex;
use std::sync::LazyLock;

/// `meter.Int64Counter("name"` and friends; the name is either a literal or an identifier.
static METER_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:\w+\.)?[mM]eter\s*\.\s*((?:Int64|Float64)(?:Observable)?(?:Counter|UpDownCounter|Histogram|Gauge))\s*\(\s*(?:"([^"]+)"|([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?))"#,
    )
    .expect("valid regex")
});

static WITH_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"metric\.WithDescription\s*\(\s*[`"]([^"`]+)[`"]"#).expect("valid regex"));

static WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"metric\.WithUnit\s*\(\s*[`"]([^"`]+)[`"]"#).expect("valid regex"));

/// Bytes searched for options when a call has no matching close.
const FALLBACK_WINDOW: usize = 500;

/// Go OpenTelemetry meter call sites.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoOtelScanner;

impl SourceScanner for GoOtelScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let constants = string_constants(source);
        let mut defs = Vec::new();

        for caps in METER_CALL.captures_iter(source) {
            let (Some(whole), Some(method)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let name = match (caps.get(2), caps.get(3)) {
                (Some(lit), _) => Some(lit.as_str().to_string()),
                (None, Some(ident)) => resolve_string(ident.as_str(), &constants),
                _ => None,
            };
            let Some(name) = name else {
                continue;
            };

            let Some(open) = source[method.end()..].find('(').map(|i| method.end() + i) else {
                continue;
            };
            let end = brackets::find_closing(source, open, Quotes::GO)
                .unwrap_or_else(|| window_end(source, whole.end(), FALLBACK_WINDOW));
            let call = &source[whole.start()..end];

            let mut def = MetricDef::new(name, instrument_type(method.as_str()));
            def.description = capture(&WITH_DESCRIPTION, call).map(str::trim).unwrap_or_default().to_string();
            def.unit = capture(&WITH_UNIT, call).map(str::trim).unwrap_or_default().to_string();
            defs.push(def);
        }

        defs
    }
}

fn instrument_type(method: &str) -> InstrumentType {
    if method.ends_with("UpDownCounter") {
        InstrumentType::UpDownCounter
    } else if method.ends_with("Counter") {
        InstrumentType::Counter
    } else if method.ends_with("Histogram") {
        InstrumentType::Histogram
    } else {
        InstrumentType::Gauge
    }
}

/// Component name for a file under `instrumentation/`, given its path relative to that directory.
///
/// The first path segment carrying an `otel` prefix names the component with the prefix removed
/// (`.../otelhttp/...` is `http`). Otherwise the first segment is used; when that is a module host such as
/// `google.golang.org`, the segment after it names the component instead.
#[must_use]
pub fn component_name(relative: &str) -> String {
    let mut segments = relative.split('/').collect::<Vec<_>>();
    let _ = segments.pop();

    if let Some(name) = segments.iter().find_map(|s| s.strip_prefix("otel").filter(|rest| !rest.is_empty())) {
        return name.to_lowercase();
    }

    match segments.as_slice() {
        [] => "unknown".to_string(),
        [host, next, ..] if host.contains('.') => next.to_lowercase(),
        [first, ..] => first.rsplit('.').next().unwrap_or(first).to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_with_options() {
        let src = r#"
package otelhttp

func (h *handler) createMeasures() {
    var err error
    h.requestBytesCounter, err = h.meter.Int64Counter(
        "http.server.request_content_length",
        metric.WithUnit("By"),
        metric.WithDescription("Measures the size of HTTP request content length (uncompressed)"),
    )
    h.latency, err = meter.Float64Histogram("http.server.duration", metric.WithUnit("ms"))
}
"#;
        let defs = GoOtelScanner.scan(src);
        assert_eq!(defs.len(), 2);

        assert_eq!(defs[0].name, "http.server.request_content_length");
        assert_eq!(defs[0].instrument_type, InstrumentType::Counter);
        assert_eq!(defs[0].unit, "By");
        assert_eq!(defs[0].description, "Measures the size of HTTP request content length (uncompressed)");

        assert_eq!(defs[1].name, "http.server.duration");
        assert_eq!(defs[1].instrument_type, InstrumentType::Histogram);
        assert_eq!(defs[1].unit, "ms");
        assert!(defs[1].description.is_empty());
    }

    #[test]
    fn test_options_do_not_leak_between_calls() {
        let src = r#"a, _ := meter.Int64UpDownCounter("a.active")
b, _ := meter.Int64ObservableGauge("b.value", metric.WithDescription("B"))"#;
        let defs = GoOtelScanner.scan(src);
        assert_eq!(defs[0].instrument_type, InstrumentType::UpDownCounter);
        assert!(defs[0].description.is_empty());
        assert_eq!(defs[1].instrument_type, InstrumentType::Gauge);
        assert_eq!(defs[1].description, "B");
    }

    #[test]
    fn test_constant_names() {
        let src = r#"
const (
    RPCServerDuration = "rpc.server.duration"
)

func f(m metric.Meter) {
    meter.Float64Histogram(RPCServerDuration)
    otelMeter.Int64Counter(semconv.RPCServerDuration)
    meter.Int64Counter(unknownName)
}
"#;
        let defs = GoOtelScanner.scan(src);
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["rpc.server.duration", "rpc.server.duration"]);
    }

    #[test]
    fn test_qualified_meter() {
        let src = r#"x, _ := otelMeter.Int64Counter(semconv.Unresolved)
y, _ := s.meter.Float64ObservableCounter("process.cpu.time", metric.WithUnit("s"))"#;
        let defs = GoOtelScanner.scan(src);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "process.cpu.time");
        assert_eq!(defs[0].instrument_type, InstrumentType::Counter);
    }

    #[test]
    fn test_unterminated_call_uses_window() {
        let src = r#"meter.Int64Counter("truncated", metric.WithUnit("1")"#;
        let defs = GoOtelScanner.scan(src);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].unit, "1");
    }

    #[test]
    fn test_component_name() {
        assert_eq!(component_name("net/http/otelhttp/handler.go"), "http");
        assert_eq!(component_name("github.com/gin-gonic/gin/otelgin/gin.go"), "gin");
        assert_eq!(component_name("host/host.go"), "host");
        assert_eq!(component_name("runtime/internal/x/x.go"), "runtime");
        assert_eq!(component_name("google.golang.org/grpc/x.go"), "grpc");
        assert_eq!(component_name("go.mongodb.org/x.go"), "org");
        assert_eq!(component_name("root.go"), "unknown");
    }
}
