use crate::Error;
use crate::adapter::{Adapter, FetchOptions, FetchResult, RawMetric};
use crate::model::{Attribute, ComponentType, InstrumentType};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

const COMPONENT: &str = "claude-code";

#[derive(Debug)]
struct Entry {
    name: &'static str,
    description: &'static str,
    unit: &'static str,
    attributes: &'static [(&'static str, &'static str)],
}

macro_rules! entry {
    ($name:literal, $description:literal, $unit:literal $(, ($attr:literal, $attr_description:literal))*) => {
        Entry {
            name: $name,
            description: $description,
            unit: $unit,
            attributes: &[$(($attr, $attr_description)),*],
        }
    };
}

/// The published metrics, all counters.
const METRICS: &[Entry] = &[
    entry!("claude_code.session.count", "Number of Claude Code sessions started", "count"),
    entry!(
        "claude_code.lines_of_code.count",
        "Number of lines of code added or removed",
        "count",
        ("type", "Type of change (added, removed)")
    ),
    entry!("claude_code.pull_request.count", "Number of pull requests created", "count"),
    entry!("claude_code.commit.count", "Number of commits created", "count"),
    entry!("claude_code.cost.usage", "Cost of API usage in USD", "USD", ("model", "Model used for the request")),
    entry!(
        "claude_code.token.usage",
        "Number of tokens consumed",
        "tokens",
        ("type", "Token type (input, output)"),
        ("model", "Model used for the request")
    ),
    entry!(
        "claude_code.code_edit_tool.decision",
        "Tool invocation decisions made during coding",
        "count",
        ("tool", "Tool name"),
        ("decision", "Decision outcome (accepted, rejected)"),
        ("language", "Programming language")
    ),
    entry!("claude_code.active_time.total", "Total active time spent in sessions", "s"),
];

/// Claude Code's documented metrics.
///
/// The catalogue is published as prose rather than code, so it ships with the crate. Fetching clones nothing
/// and stamps the run with the current date.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeCodeAdapter;

#[async_trait]
impl Adapter for ClaudeCodeAdapter {
    identity!(
        "codingagent-claude-code",
        CodingAgent,
        Metadata,
        Documented,
        "https://github.com/anthropics/claude-code-monitoring-guide"
    );

    async fn fetch(&self, cancel: &CancellationToken, _options: &FetchOptions) -> Result<FetchResult, Error> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        let now = Utc::now();
        Ok(FetchResult {
            repo_path: PathBuf::new(),
            commit: now.format("%Y-%m-%d").to_string(),
            timestamp: now,
        })
    }

    async fn extract(&self, _cancel: &CancellationToken, _fetched: &FetchResult) -> Result<Vec<RawMetric>, Error> {
        Ok(METRICS.iter().map(|entry| self.raw_metric(entry)).collect())
    }
}

impl ClaudeCodeAdapter {
    fn raw_metric(&self, entry: &Entry) -> RawMetric {
        RawMetric {
            name: entry.name.to_string(),
            description: entry.description.to_string(),
            unit: entry.unit.to_string(),
            instrument_type: InstrumentType::Counter,
            attributes: entry
                .attributes
                .iter()
                .map(|&(name, description)| Attribute {
                    description: description.to_string(),
                    ..Attribute::label(name)
                })
                .collect(),
            enabled_by_default: true,
            component_type: ComponentType::Platform,
            component_name: COMPONENT.to_string(),
            source_location: self.repo_url().to_string(),
            path: String::new(),
        }
    }
}
