//! ClickHouse's macro-driven metric tables.
//!
//! ClickHouse exposes three families through its Prometheus endpoint, each declared in C++ as a table:
//!
//! - `src/Common/CurrentMetrics.cpp`: `M(Query, "Number of executing queries")`, exported as gauges named
//!   `ClickHouseMetrics_<Name>`,
//! - `src/Common/ProfileEvents.cpp`: `M(ReadBytes, "…", ValueType::Bytes)`, exported as counters named
//!   `ClickHouseProfileEvents_<Name>`,
//! - the asynchronous metrics assigned as `new_values["Uptime"] = { value, "…" }`, exported as gauges named
//!   `ClickHouseAsyncMetrics_<Name>`. Keys computed at run time (`new_values[fmt::format(…)]`) cannot be
//!   recovered and are skipped.

use super::{MetricDef, SourceScanner};
use crate::model::InstrumentType;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static CURRENT_METRIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"M\((\w+),\s*"([^"]+)"\)"#).expect("valid regex"));

static PROFILE_EVENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"M\((\w+),\s*"([^"]+)",\s*ValueType::(\w+)\)"#).expect("valid regex"));

static ASYNC_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"new_values\["(\w+)"\]"#).expect("valid regex"));

static ASYNC_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"new_values\["(\w+)"\]\s*=\s*\{[^}]*?"([^"]+)"\s*\}"#).expect("valid regex"));

pub const CURRENT_METRICS_PREFIX: &str = "ClickHouseMetrics_";
pub const PROFILE_EVENTS_PREFIX: &str = "ClickHouseProfileEvents_";
pub const ASYNC_METRICS_PREFIX: &str = "ClickHouseAsyncMetrics_";

/// `CurrentMetrics.cpp` entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentMetricsScanner;

impl SourceScanner for CurrentMetricsScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        CURRENT_METRIC
            .captures_iter(source)
            .map(|c| {
                let mut def = MetricDef::new(format!("{CURRENT_METRICS_PREFIX}{}", &c[1]), InstrumentType::Gauge);
                def.description = c[2].to_string();
                def
            })
            .collect()
    }
}

/// `ProfileEvents.cpp` entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileEventsScanner;

impl SourceScanner for ProfileEventsScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        PROFILE_EVENT
            .captures_iter(source)
            .map(|c| {
                let mut def = MetricDef::new(format!("{PROFILE_EVENTS_PREFIX}{}", &c[1]), InstrumentType::Counter);
                def.description = c[2].to_string();
                def.unit = value_type_unit(&c[3]).to_string();
                def
            })
            .collect()
    }
}

/// Asynchronous metrics with static keys, once each, in order of first appearance.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncMetricsScanner;

impl SourceScanner for AsyncMetricsScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let mut descriptions = HashMap::new();
        for c in ASYNC_ASSIGNMENT.captures_iter(source) {
            let _ = descriptions.entry(c[1].to_string()).or_insert_with(|| c[2].to_string());
        }

        let mut seen = HashSet::new();
        ASYNC_KEY
            .captures_iter(source)
            .filter(|c| seen.insert(c[1].to_string()))
            .map(|c| {
                let mut def = MetricDef::new(format!("{ASYNC_METRICS_PREFIX}{}", &c[1]), InstrumentType::Gauge);
                def.description = descriptions.get(&c[1]).cloned().unwrap_or_default();
                def
            })
            .collect()
    }
}

fn value_type_unit(value_type: &str) -> &'static str {
    match value_type.trim() {
        "Bytes" => "bytes",
        "Microseconds" => "microseconds",
        "Milliseconds" => "milliseconds",
        "Nanoseconds" => "nanoseconds",
        _ => "",
    }
}
