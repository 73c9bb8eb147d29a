use super::{composite_fields, resolve_labels, string_keyed_entries, string_literal, string_slice_vars};
use crate::model::{Attribute, InstrumentType};
use crate::scan::brackets::{self, Quotes};
use crate::scan::infer::prometheus_instrument_type;
use crate::scan::{MetricDef, SourceScanner};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `metricMapGauges: map[string]string{`, also as `=` or `:=` assignments.
static TYPED_MAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(metricMapGauges|metricMapCounters)\s*(?::=|=|:)\s*map\[string\]string\s*\{").expect("valid regex")
});

static STRUCT_MAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bmap\[string\]struct\s*\{").expect("valid regex"));

/// redis_exporter metric tables.
///
/// `metricMapGauges` and `metricMapCounters` map INFO fields to metrics and fix the instrument type. Maps whose
/// values are `struct { txt string; lbls []string }`, whether the `metricDescriptions` table or an inline map
/// ranged over, carry a description and labels; their type is inferred from the name.
///
/// Names are the map keys, without the exporter's `redis_` namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisScanner;

impl SourceScanner for RedisScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let mut defs = Vec::new();

        for caps in TYPED_MAP.captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };

            let instrument_type = if &caps[1] == "metricMapCounters" {
                InstrumentType::Counter
            } else {
                InstrumentType::Gauge
            };

            let open = whole.end() - 1;
            let Some(end) = brackets::find_closing(source, open, Quotes::GO) else {
                continue;
            };

            for (key, _) in string_keyed_entries(&source[open + 1..end - 1]) {
                let mut def = MetricDef::new(key.as_str(), instrument_type);
                def.description = format!("Redis {key}");
                defs.push(def);
            }
        }

        let slice_vars = string_slice_vars(source);
        for m in STRUCT_MAP.find_iter(source) {
            let type_open = m.end() - 1;
            let Some(type_end) = brackets::find_closing(source, type_open, Quotes::GO) else {
                continue;
            };

            if !describes_metrics(&source[type_open + 1..type_end - 1]) {
                continue;
            }

            let rest = &source[type_end..];
            let open = type_end + (rest.len() - rest.trim_start().len());
            let Some(end) = brackets::find_closing(source, open, Quotes::GO) else {
                continue;
            };

            for (key, value) in string_keyed_entries(&source[open + 1..end - 1]) {
                defs.push(description_entry(key, value, &slice_vars));
            }
        }

        defs
    }
}

/// Whether a struct type body declares both `txt` and `lbls`.
fn describes_metrics(fields: &str) -> bool {
    let words: Vec<_> = fields.split(|c: char| !(c.is_alphanumeric() || c == '_')).collect();
    words.contains(&"txt") && words.contains(&"lbls")
}

fn description_entry(key: String, value: &str, slice_vars: &HashMap<String, Vec<String>>) -> MetricDef {
    let instrument_type = prometheus_instrument_type(&key);
    let mut def = MetricDef::new(key, instrument_type);

    let Some(body) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) else {
        return def;
    };

    let fields = composite_fields(body);
    def.description = fields.get("txt").and_then(|v| string_literal(v)).unwrap_or_default();
    if let Some(labels) = fields.get("lbls") {
        def.attributes = resolve_labels(labels, slice_vars).into_iter().map(Attribute::label).collect();
    }

    def
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_maps() {
        let src = r#"
func NewRedisExporter(uri string, opts Options) (*Exporter, error) {
    e := &Exporter{
        metricMapGauges: map[string]string{
            // # Server
            "uptime_in_seconds": "uptime_in_seconds",
            "connected_clients": "connected_clients",
        },

        metricMapCounters: map[string]string{
            "total_connections_received": "connections_received_total",
        },
    }
    return e, nil
}
"#;
        let defs = RedisScanner.scan(src);
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["uptime_in_seconds", "connected_clients", "total_connections_received"]);

        assert_eq!(defs[0].instrument_type, InstrumentType::Gauge);
        assert_eq!(defs[0].description, "Redis uptime_in_seconds");
        assert_eq!(defs[2].instrument_type, InstrumentType::Counter);
        assert!(defs[2].attributes.is_empty());
    }

    #[test]
    fn test_description_tables() {
        let src = r#"
var metricDescriptions = map[string]struct {
	txt  string
	lbls []string
}{
	"commands_duration_seconds_total": {
		txt:  "Total amount of time in seconds spent per command",
		lbls: []string{"cmd"},
	},
	"db_keys": {txt: "Total number of keys by DB", lbls: dbLabels},
}

func (e *Exporter) initDescs() {
	for k, desc := range map[string]struct {
		txt  string
		lbls []string
	}{
		"latency_percentiles_usec": {txt: `A summary of latency percentile distribution per command`, lbls: []string{"cmd"}},
	} {
		e.metricDescriptions[k] = newMetricDescr(e.options.Namespace, k, desc.txt, desc.lbls)
	}
}

var dbLabels = []string{"db"}
var options = map[string]struct{ enabled bool }{"x": {enabled: true}}
"#;
        let defs = RedisScanner.scan(src);
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["commands_duration_seconds_total", "db_keys", "latency_percentiles_usec"]);

        assert_eq!(defs[0].instrument_type, InstrumentType::Counter);
        assert_eq!(defs[0].description, "Total amount of time in seconds spent per command");
        assert_eq!(defs[0].attributes, vec![Attribute::label("cmd")]);

        assert_eq!(defs[1].instrument_type, InstrumentType::Gauge);
        assert_eq!(defs[1].attributes, vec![Attribute::label("db")]);

        assert_eq!(defs[2].description, "A summary of latency percentile distribution per command");
    }
}
