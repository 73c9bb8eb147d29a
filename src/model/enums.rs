//! Closed enumerations carried by canonical metrics.
//!
//! Each enum renders with the kebab-case tag used on the wire and in the store. Parsing also accepts the
//! compact legacy spellings (`updowncounter`, `codingagent`, `vendor_claimed`) so catalogs written by older
//! tooling keep loading.

use crate::Error;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum InstrumentType {
    Counter,
    #[serde(alias = "updowncounter")]
    #[strum(to_string = "up-down-counter", serialize = "updowncounter")]
    UpDownCounter,
    Gauge,
    Histogram,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ComponentType {
    Receiver,
    Exporter,
    Processor,
    Extension,
    Connector,
    Instrumentation,
    Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SourceCategory {
    Otel,
    Prometheus,
    Kubernetes,
    Cloud,
    Vendor,
    #[serde(alias = "codingagent")]
    #[strum(to_string = "coding-agent", serialize = "codingagent")]
    CodingAgent,
}

/// How metrics were recovered from their source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Declarative manifests
    Metadata,
    /// Source-code scanning
    Ast,
    /// Documentation scraping
    Scrape,
    Hybrid,
}

/// Epistemic weight of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ConfidenceLevel {
    Authoritative,
    Derived,
    Documented,
    #[serde(alias = "vendor_claimed")]
    #[strum(to_string = "vendor-claimed", serialize = "vendor_claimed")]
    VendorClaimed,
}

/// Outcome of classifying a metric against the semantic-conventions registry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SemconvMatch {
    Exact,
    Prefix,
    #[default]
    None,
}

/// Parse a string tag into one of the closed enumerations, failing with a validation error.
pub fn parse_tag<T>(field: &str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: core::fmt::Debug,
{
    T::from_str(value).map_err(|e| Error::validation(ohno::app_err!("invalid {field} '{value}': {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_display_uses_kebab_case() {
        assert_eq!(InstrumentType::UpDownCounter.to_string(), "up-down-counter");
        assert_eq!(SourceCategory::CodingAgent.to_string(), "coding-agent");
        assert_eq!(ConfidenceLevel::VendorClaimed.to_string(), "vendor-claimed");
        assert_eq!(ComponentType::Receiver.to_string(), "receiver");
        assert_eq!(SemconvMatch::None.to_string(), "none");
    }

    #[test]
    fn test_legacy_spellings_accepted() {
        assert_eq!("updowncounter".parse::<InstrumentType>().unwrap(), InstrumentType::UpDownCounter);
        assert_eq!("codingagent".parse::<SourceCategory>().unwrap(), SourceCategory::CodingAgent);
        assert_eq!("vendor_claimed".parse::<ConfidenceLevel>().unwrap(), ConfidenceLevel::VendorClaimed);

        let parsed: InstrumentType = serde_json::from_str("\"updowncounter\"").unwrap();
        assert_eq!(parsed, InstrumentType::UpDownCounter);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"up-down-counter\"");
    }

    #[test]
    fn test_parse_tag_rejects_unknown_value() {
        let err = parse_tag::<InstrumentType>("instrument_type", "meter").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("invalid instrument_type 'meter'"));

        assert!(parse_tag::<ComponentType>("component_type", "plugin").is_err());
        assert!(parse_tag::<ExtractionMethod>("extraction_method", "guess").is_err());
    }

    #[test]
    fn test_serde_rejects_unknown_value() {
        assert!(serde_json::from_str::<SemconvMatch>("\"partial\"").is_err());
        assert!(serde_json::from_str::<SourceCategory>("\"saas\"").is_err());
    }

    #[test]
    fn test_default_semconv_match() {
        assert_eq!(SemconvMatch::default(), SemconvMatch::None);
    }
}
