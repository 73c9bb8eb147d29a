//! Instrument-type and unit inference for sources that do not encode them in the call shape.

use crate::model::InstrumentType;

/// Infer the instrument type of a Prometheus-style (`snake_case`) metric name.
#[must_use]
pub fn prometheus_instrument_type(name: &str) -> InstrumentType {
    if name.ends_with("_total") {
        InstrumentType::Counter
    } else if name.ends_with("_bucket") {
        InstrumentType::Histogram
    } else if name.ends_with("_count") || (name.ends_with("_sum") && !name.contains("checksum")) {
        InstrumentType::Counter
    } else {
        InstrumentType::Gauge
    }
}

/// Infer the instrument type of a dotted semantic-conventions name.
///
/// `.time` and `.duration` map to counters, matching how the upstream JS semantic conventions are consumed
/// even though durations are usually recorded as histograms.
#[must_use]
pub fn dotted_instrument_type(name: &str) -> InstrumentType {
    const COUNTER_SUFFIXES: [&str; 6] = [".time", ".duration", ".count", ".total", ".errors", ".io"];

    if COUNTER_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        InstrumentType::Counter
    } else {
        // `.usage`, `.used`, `.utilization`, `.limit`, `.size` and everything else
        InstrumentType::Gauge
    }
}

/// Infer the unit of a dotted semantic-conventions name from its family.
#[must_use]
pub fn dotted_unit(name: &str) -> &'static str {
    if name.ends_with(".time") || name.contains(".duration") || name.contains(".delay.") {
        "s"
    } else if (name.ends_with(".usage") && name.contains("memory")) || name.ends_with(".io") {
        "By"
    } else {
        ""
    }
}
