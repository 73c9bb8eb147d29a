//! OpenTelemetry sources: the collector's component manifests, the semantic-conventions registry, and the
//! per-language contrib repositories.

mod collector;
mod dotnet;
mod go;
mod java;
mod js;
mod python;
mod rust;
mod semconv;

pub use collector::CollectorContribAdapter;
pub use dotnet::OtelDotnetAdapter;
pub use go::OtelGoAdapter;
pub use java::OtelJavaAdapter;
pub use js::OtelJsAdapter;
pub use python::OtelPythonAdapter;
pub use rust::OtelRustAdapter;
pub use semconv::SemconvAdapter;
