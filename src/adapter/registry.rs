use super::Adapter;
use crate::Result;
use ohno::bail;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Adapters keyed by their stable name.
///
/// Iteration is in name order, so batch runs are reproducible.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    adapters: BTreeMap<String, Arc<dyn Adapter>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an adapter. Names must be unique.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> Result<()> {
        let name = adapter.name().to_string();
        if name.is_empty() {
            bail!("adapter name must not be empty");
        }

        if self.adapters.contains_key(&name) {
            bail!("adapter '{name}' is already registered");
        }

        let _ = self.adapters.insert(name, adapter);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).map(Arc::clone)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Adapter>> {
        self.adapters.values()
    }

    /// Keep only the adapters for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.adapters.retain(|name, _| keep(name));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
