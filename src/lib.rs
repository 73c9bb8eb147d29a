//! metric-library
//!
//! Discovers observability metric definitions across upstream projects (OpenTelemetry contrib repositories,
//! Prometheus exporters, Kubernetes components, LLM instrumentation libraries), normalizes them into
//! [`model::CanonicalMetric`] records, classifies each record against the OpenTelemetry semantic conventions,
//! and keeps them in a [`store::Store`] that answers faceted queries.
//!
//! # Pipeline
//!
//! An [`orchestrator::Orchestrator`] drives one [`adapter::Adapter`] at a time:
//!
//! 1. the adapter fetches a snapshot of its upstream repository through the [`fetcher`],
//! 2. the adapter extracts [`adapter::RawMetric`] records, either from declarative manifests
//!    ([`metadata`]) or by scanning source code ([`scan`]),
//! 3. the orchestrator stamps, validates, deduplicates and enriches ([`enricher`]) the records,
//! 4. the surviving batch is upserted into the store together with an auditable extraction run.
//!
//! The adapters shipped with the crate are registered by [`adapters::default_registry`].

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

mod error;

pub use error::{Error, ErrorKind};

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod enricher;
pub mod fetcher;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
#[expect(clippy::string_slice, reason = "scanners slice at regex match bounds and ASCII delimiter offsets, which are always char boundaries")]
pub mod scan;
pub mod store;
