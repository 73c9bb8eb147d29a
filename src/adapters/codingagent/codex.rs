use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::{ComponentType, InstrumentType};
use crate::scan::{MetricDef, SourceFile, SourceScanner, relative_path, scan_files};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;

/// The module declaring every metric name the Codex CLI records.
const NAMES_FILE: &str = "codex-rs/otel/src/metrics/names.rs";

static NAME_CONST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"pub\s+const\s+\w+\s*:\s*&(?:'static\s+)?str\s*=\s*"([^"]+)""#).expect("valid regex"));

/// The Codex CLI, whose metric names are constants in one Rust module.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodexAdapter;

#[async_trait]
impl Adapter for CodexAdapter {
    identity!("codingagent-codex", CodingAgent, Ast, Authoritative, "https://github.com/openai/codex");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| extract_names(&root, cancel)).await
    }
}

fn extract_names(root: &Path, cancel: &CancellationToken) -> Result<Vec<RawMetric>, Error> {
    let path = root.join(NAMES_FILE);
    if !path.is_file() {
        return Err(Error::extract(ohno::app_err!("required file '{}' does not exist", path.display())));
    }

    let file = SourceFile {
        relative: relative_path(root, &path),
        path,
    };
    scan_files(root, &[file], &NameConstants, ComponentType::Platform, |_| "codex".to_string(), cancel)
}

/// `pub const NAME: &str = "…";` declarations; type, unit and description follow from the name.
#[derive(Debug, Clone, Copy, Default)]
struct NameConstants;

impl SourceScanner for NameConstants {
    fn scan(&self, source: &str) -> Vec<MetricDef> {
        NAME_CONST
            .captures_iter(source)
            .map(|caps| {
                let name = &caps[1];
                let (instrument_type, unit) = instrument_type(name);
                let mut def = MetricDef::new(name, instrument_type);
                def.unit = unit.to_string();
                def.description = description(name);
                def
            })
            .collect()
    }
}

/// Durations are recorded in milliseconds; everything else counts events.
fn instrument_type(name: &str) -> (InstrumentType, &'static str) {
    if name.ends_with("_ms") {
        (InstrumentType::Histogram, "ms")
    } else {
        (InstrumentType::Counter, "count")
    }
}

/// `codex.turn.e2e_duration_ms` reads as `Turn E2e Duration Ms`.
fn description(name: &str) -> String {
    let Some((_, rest)) = name.split_once('.') else {
        return name.to_string();
    };

    rest.split(['.', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
