use crate::adapter::RawMetric;
use crate::model::{Attribute, ComponentType, InstrumentType};
use crate::{Error, Result};
use ohno::IntoAppError;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// A component's `metadata.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(rename = "type", default)]
    pub component_type: String,

    #[serde(default)]
    pub status: Status,

    /// The attribute dictionary, keyed by attribute id
    #[serde(default)]
    pub attributes: HashMap<String, AttributeDefinition>,

    /// Metrics in document order
    #[serde(default)]
    metrics: Option<Mapping>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub class: String,

    /// Signals listed under each stability level
    #[serde(default)]
    pub stability: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeDefinition {
    #[serde(default)]
    pub description: String,

    #[serde(rename = "type", default)]
    pub attr_type: String,

    /// Emitted name when it differs from the dictionary key
    #[serde(default)]
    pub name_override: String,

    #[serde(rename = "enum", default)]
    pub enum_values: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricDefinition {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub sum: Option<SumDefinition>,

    #[serde(default)]
    pub gauge: Option<ValueTypeDefinition>,

    #[serde(default)]
    pub histogram: Option<ValueTypeDefinition>,

    /// Attribute ids, resolved against [`Manifest::attributes`]
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SumDefinition {
    #[serde(default)]
    pub value_type: String,

    #[serde(default)]
    pub monotonic: bool,

    #[serde(default)]
    pub aggregation_temporality: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueTypeDefinition {
    #[serde(default)]
    pub value_type: String,
}

impl MetricDefinition {
    #[must_use]
    pub fn instrument_type(&self) -> InstrumentType {
        match (&self.sum, &self.gauge, &self.histogram) {
            (Some(sum), _, _) if sum.monotonic => InstrumentType::Counter,
            (Some(_), _, _) => InstrumentType::UpDownCounter,
            (None, Some(_), _) => InstrumentType::Gauge,
            (None, None, Some(_)) => InstrumentType::Histogram,
            (None, None, None) => InstrumentType::Gauge,
        }
    }

    #[must_use]
    pub fn value_type(&self) -> &str {
        if let Some(sum) = &self.sum {
            &sum.value_type
        } else if let Some(gauge) = &self.gauge {
            &gauge.value_type
        } else if let Some(histogram) = &self.histogram {
            &histogram.value_type
        } else {
            ""
        }
    }
}

impl Manifest {
    /// Parse a manifest. An empty document is an empty manifest.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).into_app_err("parsing metadata manifest")
    }

    /// Read and parse a manifest file, failing with a parse error.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)
            .into_app_err_with(|| format!("reading '{}'", path.display()))
            .map_err(Error::parse)?;

        Self::parse(&content).map_err(|e| Error::parse(ohno::app_err!("'{}': {e}", path.display())))
    }

    /// The metrics in document order.
    ///
    /// Entries whose key is not a string or whose body does not have the expected shape are skipped.
    #[must_use]
    pub fn metrics(&self) -> Vec<(String, MetricDefinition)> {
        let Some(metrics) = &self.metrics else {
            return Vec::new();
        };

        metrics
            .iter()
            .filter_map(|(key, value)| {
                let name = key.as_str()?.to_string();
                let def = if value.is_null() {
                    MetricDefinition::default()
                } else {
                    serde_yaml::from_value(value.clone()).ok()?
                };
                Some((name, def))
            })
            .collect()
    }

    /// Resolve a metric's attribute ids against the dictionary.
    ///
    /// An id with no dictionary entry yields a name-only attribute.
    #[must_use]
    pub fn resolve_attributes(&self, ids: &[String]) -> Vec<Attribute> {
        ids.iter()
            .map(|id| match self.attributes.get(id) {
                Some(def) => Attribute {
                    name: if def.name_override.is_empty() { id.clone() } else { def.name_override.clone() },
                    attr_type: def.attr_type.clone(),
                    description: def.description.clone(),
                    required: false,
                    enum_values: def.enum_values.iter().filter_map(scalar_text).collect(),
                },
                None => Attribute::named(id.clone()),
            })
            .collect()
    }

    /// Every metric of this manifest as a raw record of the given component.
    #[must_use]
    pub fn raw_metrics(&self, component_type: ComponentType, component_name: &str, path: &Path, relative: &str) -> Vec<RawMetric> {
        self.metrics()
            .into_iter()
            .map(|(name, def)| RawMetric {
                instrument_type: def.instrument_type(),
                attributes: self.resolve_attributes(&def.attributes),
                name,
                description: def.description.trim().to_string(),
                unit: def.unit,
                enabled_by_default: def.enabled,
                component_type,
                component_name: component_name.to_string(),
                source_location: path.display().to_string(),
                path: relative.to_string(),
            })
            .collect()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
