use super::{composite_fields, resolve_labels, string_literal};
use crate::model::{Attribute, InstrumentType};
use crate::scan::brackets::{self, CodeIndices, Quotes};
use crate::scan::{MetricDef, SourceScanner};
use std::collections::HashMap;

/// Composite-literal types that describe one cadvisor metric.
const METRIC_TYPES: [&str; 2] = ["containerMetric", "machineMetric"];

/// cadvisor metric tables.
///
/// A metric is a `containerMetric{…}` / `machineMetric{…}` literal, or an untyped element of a slice of
/// them that sets both `name` and `valueType`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CadvisorScanner;

impl SourceScanner for CadvisorScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let bytes = source.as_bytes();
        let no_vars = HashMap::new();
        let mut defs = Vec::new();

        for open in CodeIndices::new(source, 0, Quotes::GO).filter(|&i| bytes[i] == b'{') {
            let typed = match literal_kind(&source[..open]) {
                LiteralKind::Typed => true,
                LiteralKind::Untyped => false,
                LiteralKind::Other => continue,
            };

            let Some(end) = brackets::find_closing(source, open, Quotes::GO) else {
                continue;
            };

            let fields = composite_fields(&source[open + 1..end - 1]);
            if !typed && !(fields.contains_key("name") && fields.contains_key("valueType")) {
                continue;
            }

            let Some(name) = fields.get("name").and_then(|v| string_literal(v)).filter(|n| !n.is_empty()) else {
                continue;
            };

            let instrument_type = match fields.get("valueType").map(|v| v.trim()) {
                Some("prometheus.CounterValue") => InstrumentType::Counter,
                _ => InstrumentType::Gauge,
            };

            let mut def = MetricDef::new(name, instrument_type);
            def.description = fields.get("help").and_then(|v| string_literal(v)).unwrap_or_default();
            if let Some(labels) = fields.get("extraLabels") {
                def.attributes = resolve_labels(labels, &no_vars).into_iter().map(Attribute::label).collect();
            }
            defs.push(def);
        }

        defs
    }
}

enum LiteralKind {
    Typed,
    Untyped,
    Other,
}

/// Classify the `{` that follows `before`.
fn literal_kind(before: &str) -> LiteralKind {
    let trimmed = before.trim_end();
    if METRIC_TYPES.iter().any(|t| {
        trimmed
            .strip_suffix(t)
            .is_some_and(|rest| !rest.ends_with(|c: char| c.is_alphanumeric() || c == '_'))
    }) {
        return LiteralKind::Typed;
    }

    // elements of a slice literal follow `{` or `,`
    if trimmed.ends_with('{') || trimmed.ends_with(',') {
        LiteralKind::Untyped
    } else {
        LiteralKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
func NewPrometheusCollector() *PrometheusCollector {
    c := &PrometheusCollector{
        containerMetrics: []containerMetric{
            {
                name:      "container_last_seen",
                help:      "Last time a container was seen by the exporter",
                valueType: prometheus.GaugeValue,
                getValues: func(s *info.ContainerStats) metricValues {
                    return metricValues{{value: float64(time.Now().Unix()), timestamp: time.Now()}}
                },
            },
        },
    }
    if includedMetrics.Has(container.CpuUsageMetrics) {
        c.containerMetrics = append(c.containerMetrics, []containerMetric{
            {
                name:        "container_cpu_usage_seconds_total",
                help:        "Cumulative cpu time consumed in seconds.",
                valueType:   prometheus.CounterValue,
                extraLabels: []string{"cpu"},
                getValues: func(s *info.ContainerStats) metricValues {
                    return nil
                },
            },
        }...)
    }
    m := machineMetric{
        name: "machine_cpu_cores",
        help: "Number of logical CPU cores.",
    }
}
"#;

    #[test]
    fn test_container_and_machine_metrics() {
        let defs = CadvisorScanner.scan(SOURCE);
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["container_last_seen", "container_cpu_usage_seconds_total", "machine_cpu_cores"]);

        assert_eq!(defs[0].instrument_type, InstrumentType::Gauge);
        assert_eq!(defs[0].description, "Last time a container was seen by the exporter");

        assert_eq!(defs[1].instrument_type, InstrumentType::Counter);
        assert_eq!(defs[1].attributes, vec![Attribute::label("cpu")]);

        assert_eq!(defs[2].instrument_type, InstrumentType::Gauge);
        assert_eq!(defs[2].description, "Number of logical CPU cores.");
    }

    #[test]
    fn test_untyped_literal_needs_value_type() {
        let src = r#"x := []thing{
    {name: "not_a_metric"},
}"#;
        assert!(CadvisorScanner.scan(src).is_empty());
    }
}
