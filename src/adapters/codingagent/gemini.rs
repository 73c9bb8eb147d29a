use crate::Error;
use crate::adapter::{Adapter, FetchResult, RawMetric, run_blocking};
use crate::model::ComponentType;
use crate::scan::js::JsScanner;
use crate::scan::{WalkSpec, collect_files, dedup_by_name, read_source, scan_files};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;

const TELEMETRY_DIR: &str = "packages/core/src/telemetry";

const TELEMETRY: WalkSpec = WalkSpec {
    extensions: &[".ts"],
    skip_dirs: &[],
    skip_file_suffixes: &[".test.ts", ".spec.ts"],
    skip_path_fragments: &[],
    max_depth: Some(1),
};

/// `const TOOL_CALL_COUNT = 'gemini_cli.tool.call.count';`
static NAME_CONST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*(?:export[ \t]+)?const[ \t]+([A-Z][A-Z0-9_]*)[ \t]*=[ \t]*['"]([^'"]+)['"]"#).expect("valid regex")
});

/// Gemini CLI, which creates its instruments in the core package's telemetry module.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiCliAdapter;

#[async_trait]
impl Adapter for GeminiCliAdapter {
    identity!("codingagent-gemini", CodingAgent, Ast, Authoritative, "https://github.com/google-gemini/gemini-cli");

    async fn extract(&self, cancel: &CancellationToken, fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        let root = fetched.repo_path.clone();
        run_blocking(cancel, move |cancel| extract_telemetry(&root, cancel)).await
    }
}

fn extract_telemetry(root: &Path, cancel: &CancellationToken) -> Result<Vec<RawMetric>, Error> {
    let dir = root.join(TELEMETRY_DIR);
    let files = collect_files(root, &dir, &TELEMETRY, cancel)?;

    // instrument names are module-level constants shared across the telemetry files
    let mut constants = HashMap::new();
    for file in &files {
        if let Some(source) = read_source(&file.path) {
            constants.extend(NAME_CONST.captures_iter(&source).map(|c| (c[1].to_string(), c[2].to_string())));
        }
    }

    let scanner = JsScanner::with_constants(constants);
    let mut metrics = scan_files(&dir, &files, &scanner, ComponentType::Platform, |_| "gemini-cli".to_string(), cancel)?;
    for metric in metrics.iter_mut().filter(|m| m.unit.is_empty()) {
        metric.unit = "count".to_string();
    }

    Ok(dedup_by_name(metrics))
}
