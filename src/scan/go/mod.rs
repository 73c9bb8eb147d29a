//! Go scanners: OpenTelemetry meters, Prometheus descriptors, kube-state-metrics family generators, and
//! the metric tables of cadvisor, redis_exporter and CockroachDB.

mod cadvisor;
mod cockroach;
mod ksm;
mod otel;
mod prometheus;
mod redis;

pub use cadvisor::CadvisorScanner;
pub use cockroach::CockroachScanner;
pub use ksm::KsmScanner;
pub use otel::{GoOtelScanner, component_name as otel_component_name};
pub use prometheus::PrometheusScanner;
pub use redis::RedisScanner;

use super::brackets::{self, CodeIndices, Quotes};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `name = "value"` with an optional `const`/`var` keyword and `string` type, covering single declarations,
/// `;`-separated declarations, and the members of `const ( … )` / `var ( … )` blocks.
static STRING_CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)(?:^|;)[ \t]*(?:(?:const|var)[ \t]+)?([A-Za-z_]\w*)[ \t]*(?:string[ \t]*)?=[ \t]*("(?:[^"\\\n]|\\.)*")"#).expect("valid regex"));

/// `name := []string{` or `name = []string{`
static STRING_SLICE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_]\w*)\s*:?=\s*\[\]string\s*\{").expect("valid regex"));

/// String constants declared in a Go file.
#[must_use]
pub fn string_constants(source: &str) -> HashMap<String, String> {
    STRING_CONST
        .captures_iter(source)
        .filter_map(|c| Some((c[1].to_string(), string_literal(&c[2])?)))
        .collect()
}

/// Variables assigned a `[]string{…}` literal in a Go file.
#[must_use]
pub fn string_slice_vars(source: &str) -> HashMap<String, Vec<String>> {
    let mut vars = HashMap::new();
    for c in STRING_SLICE_VAR.captures_iter(source) {
        let Some(whole) = c.get(0) else {
            continue;
        };

        let open = whole.end() - 1;
        if let Some(end) = brackets::find_closing(source, open, Quotes::GO) {
            let _ = vars.insert(c[1].to_string(), string_literals(&source[open + 1..end - 1]));
        }
    }

    vars
}

/// If `expr` is exactly one Go string literal, its value.
#[must_use]
pub fn string_literal(expr: &str) -> Option<String> {
    let expr = expr.trim();
    if let Some(raw) = expr.strip_prefix('`').and_then(|e| e.strip_suffix('`')).filter(|raw| !raw.contains('`')) {
        return Some(raw.to_string());
    }

    if expr.starts_with('"') {
        brackets::string_value(expr, Quotes::GO)
    } else {
        None
    }
}

/// Resolve `expr` as a string literal or a known constant (optionally package-qualified).
#[must_use]
pub fn resolve_string(expr: &str, constants: &HashMap<String, String>) -> Option<String> {
    if let Some(s) = string_literal(expr) {
        return Some(s);
    }

    let expr = expr.trim();
    if !expr.is_empty() && expr.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        let ident = expr.rsplit('.').next().unwrap_or(expr);
        return constants.get(ident).cloned();
    }

    None
}

/// Every string literal inside `text`, in order.
#[must_use]
pub fn string_literals(text: &str) -> Vec<String> {
    brackets::split_top_level(text, Quotes::GO).into_iter().filter_map(string_literal).collect()
}

/// Labels given as a `[]string{…}` literal or as a variable holding one.
#[must_use]
pub fn resolve_labels(expr: &str, slice_vars: &HashMap<String, Vec<String>>) -> Vec<String> {
    let expr = expr.trim();
    if let Some(open) = expr.find('{')
        && expr[..open].trim_end().ends_with("[]string")
        && let Some(end) = brackets::find_closing(expr, open, Quotes::GO)
    {
        return string_literals(&expr[open + 1..end - 1]);
    }

    slice_vars.get(expr).cloned().unwrap_or_default()
}

/// `key: value` fields of a composite literal body, keyed by field name.
pub(crate) fn composite_fields(body: &str) -> HashMap<&str, &str> {
    brackets::split_top_level(body, Quotes::GO)
        .into_iter()
        .filter_map(|element| {
            let (key, value) = element.split_once(':')?;
            let key = key.trim();
            key.chars().all(|c| c.is_alphanumeric() || c == '_').then_some((key, value.trim()))
        })
        .collect()
}

/// `"key": value` entries of a map literal body whose keys are string literals, in order.
///
/// Line comments ahead of an entry are skipped.
pub(crate) fn string_keyed_entries(body: &str) -> Vec<(String, &str)> {
    brackets::split_top_level(body, Quotes::GO)
        .into_iter()
        .filter_map(|entry| {
            let mut entry = entry.trim_start();
            while entry.starts_with("//") {
                entry = entry.split_once('\n').map_or("", |(_, rest)| rest).trim_start();
            }

            let bytes = entry.as_bytes();
            let colon = CodeIndices::new(entry, 0, Quotes::GO).find(|&i| bytes[i] == b':')?;
            Some((string_literal(&entry[..colon])?, entry[colon + 1..].trim()))
        })
        .collect()
}
