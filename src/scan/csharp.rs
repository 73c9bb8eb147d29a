//! C# `System.Diagnostics.Metrics` instrument factories.

use super::brackets::{self, Quotes};
use super::{MetricDef, SourceScanner, capture, window_end};
use crate::model::InstrumentType;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `meter.CreateCounter<long>(` with the receiver spelled as any `*meter`/`*Meter` identifier, optionally
/// suffixed `Instance` and null-forgiven, or `this`.
static CREATE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:\w*[mM]eter(?:Instance)?!?|this)\s*\.\s*(Create(?:Observable)?(?:Counter|UpDownCounter|Histogram|Gauge))(?:<[^>]+>)?\s*(?P<open>\()\s*(?:name:\s*)?(?:"(?P<lit>[^"]+)"|(?P<ident>[A-Za-z_][\w.]*))"#,
    )
    .expect("valid regex")
});

static STRING_CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:const|static\s+readonly)\s+string\s+(\w+)\s*=\s*"([^"]+)""#).expect("valid regex"));

static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bdescription:\s*"([^"]+)""#).expect("valid regex"));

static UNIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bunit:\s*"([^"]+)""#).expect("valid regex"));

const FALLBACK_WINDOW: usize = 500;

/// C# `Meter.Create*` call sites.
///
/// Names are literals or `const`/`static readonly` strings declared in the same file. Unit and description
/// come from named arguments, or else from the positional string arguments that follow the name (after the
/// callback, for observable instruments).
#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpScanner;

impl SourceScanner for CSharpScanner {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        let constants = string_constants(source);
        let mut defs = Vec::new();

        for caps in CREATE_CALL.captures_iter(source) {
            let (Some(whole), Some(method), Some(open)) = (caps.get(0), caps.get(1), caps.name("open")) else {
                continue;
            };

            let name = match (caps.name("lit"), caps.name("ident")) {
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

            let method = method.as_str();
            let mut def = MetricDef::new(name, instrument_type(method));

            let open = open.start();
            match brackets::find_closing(source, open, Quotes::C_LIKE) {
                Some(end) => {
                    let args_text = &source[open + 1..end - 1];
                    fill_options(&mut def, args_text, method.starts_with("CreateObservable"));
                }
                None => {
                    let call = &source[whole.start()..window_end(source, whole.end(), FALLBACK_WINDOW)];
                    def.description = capture(&DESCRIPTION, call).map(str::trim).unwrap_or_default().to_string();
                    def.unit = capture(&UNIT, call).map(str::trim).unwrap_or_default().to_string();
                }
            }

            defs.push(def);
        }

        defs
    }
}

fn string_constants(source: &str) -> HashMap<String, String> {
    STRING_CONST
        .captures_iter(source)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
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

/// Read `unit` and `description` from the argument list of a factory call.
fn fill_options(def: &mut MetricDef, args_text: &str, observable: bool) {
    let args = brackets::split_top_level(args_text, Quotes::C_LIKE);

    // positional arguments after the name, skipping the observable callback
    let positional: Vec<&str> = args
        .iter()
        .skip(if observable { 2 } else { 1 })
        .copied()
        .take_while(|a| !is_named(a))
        .collect();

    def.unit = named(&args, "unit")
        .or_else(|| positional.first().and_then(|a| brackets::string_value(a, Quotes::C_LIKE)))
        .unwrap_or_default()
        .trim()
        .to_string();
    def.description = named(&args, "description")
        .or_else(|| positional.get(1).and_then(|a| brackets::string_value(a, Quotes::C_LIKE)))
        .unwrap_or_default()
        .trim()
        .to_string();
}

fn is_named(arg: &str) -> bool {
    arg.split_once(':')
        .is_some_and(|(key, _)| !key.is_empty() && key.trim().chars().all(|c| c.is_alphanumeric() || c == '_'))
}

fn named(args: &[&str], key: &str) -> Option<String> {
    args.iter().find_map(|a| {
        let (k, v) = a.split_once(':')?;
        (k.trim() == key).then(|| brackets::string_value(v, Quotes::C_LIKE)).flatten()
    })
}

/// Component name for a file under `src/`: the project directory without its OpenTelemetry prefix.
#[must_use]
pub fn component_name(relative: &str) -> String {
    const PREFIXES: [&str; 4] = [
        "OpenTelemetry.Instrumentation.",
        "OpenTelemetry.Extensions.",
        "OpenTelemetry.ResourceDetectors.",
        "OpenTelemetry.",
    ];

    let project = relative.split('/').next().unwrap_or(relative);
    let trimmed = PREFIXES.iter().find_map(|p| project.strip_prefix(p)).unwrap_or(project);
    trimmed.to_lowercase()
}
