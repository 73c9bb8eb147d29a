//! Structured-metadata extraction.
//!
//! Some upstream projects declare their metrics in YAML instead of code. The collector-contrib repository
//! keeps one `metadata.yaml` per component, found by [`discover`] and read by [`Manifest`]; the
//! semantic-conventions repository keeps `metrics.yaml` groups under `model/`, read by [`semconv`].

mod discovery;
mod manifest;
pub mod semconv;

pub use discovery::{COMPONENT_DIRS, MetadataFile, component_type_from_path, discover};
pub use manifest::{AttributeDefinition, Manifest, MetricDefinition, Status, SumDefinition, ValueTypeDefinition};

pub(crate) const LOG_TARGET: &str = "  metadata";
