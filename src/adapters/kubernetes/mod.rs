//! Kubernetes metric sources.

mod cadvisor;
mod ksm;

pub use cadvisor::CadvisorAdapter;
pub use ksm::KubeStateMetricsAdapter;
