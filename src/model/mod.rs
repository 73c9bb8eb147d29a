//! The canonical metric data model.
//!
//! Every upstream source is normalized into [`CanonicalMetric`] records. A record's identity is derived from
//! `(source_category, source_name, component_name, metric_name)` so re-extracting the same metric replaces the
//! prior record instead of duplicating it.

mod enums;
mod metric;

pub use enums::{ComponentType, ConfidenceLevel, ExtractionMethod, InstrumentType, SemconvMatch, SourceCategory, parse_tag};
pub use metric::{Attribute, CanonicalMetric, generate_id};
