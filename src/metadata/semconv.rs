//! The semantic-conventions model: `metrics.yaml` files holding `groups` of `type: metric`.
//!
//! ```yaml
//! groups:
//!   - id: metric.http.server.request.duration
//!     type: metric
//!     metric_name: http.server.request.duration
//!     stability: stable
//!     brief: "Duration of HTTP server requests."
//!     instrument: histogram
//!     unit: "s"
//!     attributes:
//!       - ref: http.request.method
//!         requirement_level: required
//!       - ref: http.response.status_code
//!         requirement_level:
//!           conditionally_required: If and only if one was received/sent.
//! ```

use super::LOG_TARGET;
use crate::model::{Attribute, InstrumentType, parse_tag};
use crate::scan::{self, SourceFile, WalkSpec};
use crate::{Error, Result};
use ohno::IntoAppError;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const MODEL_FILE_NAME: &str = "metrics.yaml";

/// One metric group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemconvMetric {
    pub name: String,
    pub brief: String,
    pub instrument: String,
    pub unit: String,
    pub stability: String,
    pub attributes: Vec<AttributeRef>,
}

/// A group's reference to a registry attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRef {
    pub id: String,

    /// `required`, `recommended`, `opt_in`, `conditionally_required`, …
    pub requirement_level: String,
}

impl SemconvMetric {
    /// The group's `instrument`; anything unrecognized is reported as a gauge.
    #[must_use]
    pub fn instrument_type(&self) -> InstrumentType {
        parse_tag("instrument", &self.instrument).unwrap_or_else(|e| {
            log::debug!(target: LOG_TARGET, "Metric '{}' has {e}; treating it as a gauge", self.name);
            InstrumentType::Gauge
        })
    }

    /// Attribute references as `string`-typed attributes, `required` when the requirement level says so.
    #[must_use]
    pub fn attributes(&self) -> Vec<Attribute> {
        self.attributes
            .iter()
            .map(|a| Attribute {
                required: a.requirement_level == "required",
                ..Attribute::label(a.id.clone())
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ModelDocument {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
struct Group {
    #[serde(rename = "type", default)]
    group_type: String,
    #[serde(default)]
    metric_name: String,
    #[serde(default)]
    brief: String,
    #[serde(default)]
    instrument: String,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    stability: String,
    #[serde(default)]
    attributes: Vec<GroupAttribute>,
}

#[derive(Debug, Deserialize)]
struct GroupAttribute {
    #[serde(rename = "ref", default)]
    id: String,
    #[serde(default)]
    requirement_level: Value,
}

/// Parse the metric groups of one model document, in document order.
pub fn parse(content: &str) -> Result<Vec<SemconvMetric>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc: ModelDocument = serde_yaml::from_str(content).into_app_err("parsing semantic-conventions model")?;

    Ok(doc
        .groups
        .into_iter()
        .filter(|g| g.group_type == "metric")
        .map(|g| SemconvMetric {
            name: g.metric_name,
            brief: g.brief.trim().to_string(),
            instrument: g.instrument,
            unit: g.unit,
            stability: g.stability,
            attributes: g
                .attributes
                .into_iter()
                .filter(|a| !a.id.is_empty())
                .map(|a| AttributeRef {
                    id: a.id,
                    requirement_level: requirement_level(&a.requirement_level),
                })
                .collect(),
        })
        .collect())
}

/// A requirement level is either a bare tag or a one-entry map from the tag to its condition.
fn requirement_level(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Mapping(m) => m.iter().next().and_then(|(k, _)| k.as_str()).unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

/// The metric groups of one model file and where they came from.
#[derive(Debug, Clone)]
pub struct ModelFile {
    pub file: SourceFile,

    /// Directory of the file relative to the model root, joined with `.`, or `general` at the root
    pub component: String,

    pub metrics: Vec<SemconvMetric>,
}

/// Read every `metrics.yaml` below `model_dir`.
///
/// `repo_root` anchors the relative paths. Files that fail to parse are skipped; a missing `model_dir` is
/// an extraction error.
pub fn load_model(repo_root: &Path, model_dir: &Path, cancel: &CancellationToken) -> Result<Vec<ModelFile>, Error> {
    let spec = WalkSpec {
        extensions: &[MODEL_FILE_NAME],
        ..WalkSpec::default()
    };

    let mut files = Vec::new();
    for file in scan::collect_files(repo_root, model_dir, &spec, cancel)? {
        if file.path.file_name().is_none_or(|n| n != MODEL_FILE_NAME) {
            continue;
        }

        let content = match fs::read_to_string(&file.path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Skipping '{}': {e}", file.relative);
                continue;
            }
        };

        let metrics = match parse(&content) {
            Ok(metrics) => metrics,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Skipping '{}': {e}", file.relative);
                continue;
            }
        };

        let component = component_name(&scan::relative_path(model_dir, &file.path));
        files.push(ModelFile { file, component, metrics });
    }

    Ok(files)
}

fn component_name(relative: &str) -> String {
    match relative.rsplit_once('/') {
        Some((dir, _)) => dir.replace('/', "."),
        None => "general".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTP: &str = r#"
groups:
  - id: metric_attributes.http.server
    type: attribute_group
    brief: "HTTP server attributes"
  - id: metric.http.server.request.duration
    type: metric
    metric_name: http.server.request.duration
    stability: stable
    brief: "Duration of HTTP server requests."
    instrument: histogram
    unit: "s"
    attributes:
      - ref: http.request.method
        requirement_level: required
      - ref: http.response.status_code
        requirement_level:
          conditionally_required: If and only if one was received/sent.
      - ref: server.port
  - id: metric.http.server.active_requests
    type: metric
    metric_name: http.server.active_requests
    stability: development
    brief: >
      Number of active HTTP server requests.
    instrument: updowncounter
    unit: "{request}"
"#;

    #[test]
    fn test_parse_metric_groups() {
        let metrics = parse(HTTP).unwrap();
        assert_eq!(metrics.len(), 2);

        let duration = &metrics[0];
        assert_eq!(duration.name, "http.server.request.duration");
        assert_eq!(duration.stability, "stable");
        assert_eq!(duration.instrument_type(), InstrumentType::Histogram);
        assert_eq!(duration.attributes[0].requirement_level, "required");
        assert_eq!(duration.attributes[1].requirement_level, "conditionally_required");
        assert_eq!(duration.attributes[2].requirement_level, "");

        let attrs = duration.attributes();
        assert!(attrs[0].required);
        assert!(!attrs[1].required);
        assert_eq!(attrs[0].attr_type, "string");

        let active = &metrics[1];
        assert_eq!(active.instrument_type(), InstrumentType::UpDownCounter);
        assert_eq!(active.brief, "Number of active HTTP server requests.");
    }

    #[test]
    fn test_instrument_tags() {
        let metric = |instrument: &str| SemconvMetric {
            name: "m".to_string(),
            brief: String::new(),
            instrument: instrument.to_string(),
            unit: String::new(),
            stability: String::new(),
            attributes: Vec::new(),
        };

        assert_eq!(metric("counter").instrument_type(), InstrumentType::Counter);
        assert_eq!(metric("gauge").instrument_type(), InstrumentType::Gauge);
        assert_eq!(metric("updowncounter").instrument_type(), InstrumentType::UpDownCounter);
        assert_eq!(metric("up-down-counter").instrument_type(), InstrumentType::UpDownCounter);
        assert_eq!(metric("meter").instrument_type(), InstrumentType::Gauge);
        assert_eq!(metric("").instrument_type(), InstrumentType::Gauge);
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("groups: []").unwrap().is_empty());
        assert!(parse("groups: [ {").is_err());
    }

    #[test]
    fn test_component_name() {
        assert_eq!(component_name("metrics.yaml"), "general");
        assert_eq!(component_name("http/metrics.yaml"), "http");
        assert_eq!(component_name("system/cpu/metrics.yaml"), "system.cpu");
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    fn test_load_model() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model");
        fs::create_dir_all(model.join("http")).unwrap();
        fs::create_dir_all(model.join("db")).unwrap();
        fs::write(model.join("http/metrics.yaml"), HTTP).unwrap();
        fs::write(model.join("http/registry.yaml"), HTTP).unwrap();
        fs::write(model.join("http/other_metrics.yaml"), HTTP).unwrap();
        fs::write(model.join("db/metrics.yaml"), "groups: [ {").unwrap();

        let files = load_model(dir.path(), &model, &CancellationToken::new()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].component, "http");
        assert_eq!(files[0].file.relative, "model/http/metrics.yaml");
        assert_eq!(files[0].metrics.len(), 2);
    }
}
