use super::{ComponentType, ConfidenceLevel, ExtractionMethod, InstrumentType, SemconvMatch, SourceCategory};
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A dimension attached to a metric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,

    /// Free-form type tag such as `string`, `int` or `bool`
    #[serde(rename = "type", default)]
    pub attr_type: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub required: bool,

    /// Enumerated values, in declaration order
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl Attribute {
    /// An attribute carrying only its name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A `string`-typed label, as emitted by Prometheus-style sources.
    #[must_use]
    pub fn label(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_type: "string".to_string(),
            ..Self::default()
        }
    }
}

/// The normalized metric record kept in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalMetric {
    pub id: String,
    pub metric_name: String,
    pub instrument_type: InstrumentType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub enabled_by_default: bool,

    pub component_type: ComponentType,
    pub component_name: String,

    pub source_category: SourceCategory,
    pub source_name: String,
    #[serde(default)]
    pub source_location: String,
    pub extraction_method: ExtractionMethod,
    pub source_confidence: ConfidenceLevel,

    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub commit: String,
    pub extracted_at: DateTime<Utc>,

    #[serde(default)]
    pub semconv_match: SemconvMatch,
    #[serde(default)]
    pub semconv_name: String,
    #[serde(default)]
    pub semconv_stability: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Compute the stable identity of a metric.
///
/// The identity is the lowercase hex rendering of the first 16 bytes of
/// `SHA-256("{category}:{source}:{component}:{metric}")`.
#[must_use]
pub fn generate_id(source_category: SourceCategory, source_name: &str, component_name: &str, metric_name: &str) -> String {
    let key = format!("{source_category}:{source_name}:{component_name}:{metric_name}");
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..16])
}

impl CanonicalMetric {
    /// The identity this record should carry given its current fields.
    #[must_use]
    pub fn compute_id(&self) -> String {
        generate_id(self.source_category, &self.source_name, &self.component_name, &self.metric_name)
    }

    /// Assign the identity if it has not been set yet.
    pub fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = self.compute_id();
        }
    }

    /// Check the required fields.
    ///
    /// Enum-valued fields are typed and are validated when they are parsed from their string tags.
    pub fn validate(&self) -> Result<(), Error> {
        if self.metric_name.is_empty() {
            return Err(Error::validation(ohno::app_err!("metric_name is required")));
        }

        if self.component_name.is_empty() {
            return Err(Error::validation(ohno::app_err!(
                "component_name is required for metric '{}'",
                self.metric_name
            )));
        }

        if self.source_name.is_empty() {
            return Err(Error::validation(ohno::app_err!("source_name is required for metric '{}'", self.metric_name)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn sample() -> CanonicalMetric {
        CanonicalMetric {
            id: String::new(),
            metric_name: "http.server.request.duration".to_string(),
            instrument_type: InstrumentType::Histogram,
            description: "Duration of HTTP server requests.".to_string(),
            unit: "s".to_string(),
            attributes: vec![Attribute::label("http.request.method"), Attribute::named("url.scheme")],
            enabled_by_default: true,
            component_type: ComponentType::Instrumentation,
            component_name: "http".to_string(),
            source_category: SourceCategory::Otel,
            source_name: "otel-go".to_string(),
            source_location: "/cache/otelhttp/handler.go".to_string(),
            extraction_method: ExtractionMethod::Ast,
            source_confidence: ConfidenceLevel::Derived,
            repo: "https://github.com/open-telemetry/opentelemetry-go-contrib".to_string(),
            path: "instrumentation/net/http/otelhttp/handler.go".to_string(),
            commit: "abc123".to_string(),
            extracted_at: DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z").unwrap().with_timezone(&Utc),
            semconv_match: SemconvMatch::None,
            semconv_name: String::new(),
            semconv_stability: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id(SourceCategory::Otel, "otel-go", "http", "http.server.request.duration");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_generate_id_matches_digest_prefix() {
        let digest = Sha256::digest(b"prometheus:prometheus-node:cpu:node_cpu_seconds_total");
        let expected = hex::encode(&digest[..16]);
        assert_eq!(
            generate_id(SourceCategory::Prometheus, "prometheus-node", "cpu", "node_cpu_seconds_total"),
            expected
        );
    }

    #[test]
    fn test_generate_id_is_sensitive_to_every_part() {
        let base = generate_id(SourceCategory::Otel, "a", "b", "c");
        assert_ne!(base, generate_id(SourceCategory::Vendor, "a", "b", "c"));
        assert_ne!(base, generate_id(SourceCategory::Otel, "x", "b", "c"));
        assert_ne!(base, generate_id(SourceCategory::Otel, "a", "x", "c"));
        assert_ne!(base, generate_id(SourceCategory::Otel, "a", "b", "x"));
        assert_eq!(base, generate_id(SourceCategory::Otel, "a", "b", "c"));
    }

    #[test]
    fn test_ensure_id_keeps_existing() {
        let mut m = sample();
        m.ensure_id();
        assert_eq!(m.id, m.compute_id());

        m.id = "preset".to_string();
        m.ensure_id();
        assert_eq!(m.id, "preset");
    }

    #[test]
    fn test_validate_required_fields() {
        sample().validate().unwrap();

        let mut m = sample();
        m.metric_name.clear();
        let err = m.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("metric_name"));

        let mut m = sample();
        m.component_name.clear();
        assert!(m.validate().unwrap_err().to_string().contains("component_name"));

        let mut m = sample();
        m.source_name.clear();
        assert!(m.validate().unwrap_err().to_string().contains("source_name"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["instrument_type"], "histogram");
        assert_eq!(json["semconv_match"], "none");
        assert_eq!(json["attributes"][0]["type"], "string");
        assert!(json.get("created_at").is_none());
        assert!(json["attributes"][1].get("enum").is_none());
    }
}
