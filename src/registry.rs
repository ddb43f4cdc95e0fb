//! Ordered model registry. Populated single-threaded during configuration,
//! read-only once the server starts; shared via `Arc` without locking.

use crate::model::Model;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<Arc<Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a model. Names are expected to be unique; on a duplicate the
    /// first registration wins at lookup time and the duplicate is logged.
    pub fn register(&mut self, model: Model) {
        if self.lookup(model.name()).is_some() {
            tracing::warn!(model = %model.name(), "duplicate model name; first registration wins");
        }
        self.models.push(Arc::new(model));
    }

    /// Linear scan by name, first match in registration order. Model counts
    /// are small and lookup is not the hot path.
    pub fn lookup(&self, name: &str) -> Option<&Arc<Model>> {
        self.models.iter().find(|m| m.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Model>> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Default, Serialize)]
    struct Empty {}

    #[test]
    fn lookup_returns_first_registration() {
        let mut registry = ModelRegistry::new();
        registry.register(Model::of::<Empty>("user"));
        registry.register(Model::of::<Empty>("book"));
        registry.register(Model::of::<Empty>("user"));
        assert_eq!(registry.len(), 3);
        let found = registry.lookup("user").unwrap();
        assert!(Arc::ptr_eq(found, registry.iter().next().unwrap()));
    }

    #[test]
    fn lookup_unknown_is_none() {
        let registry = ModelRegistry::new();
        assert!(registry.lookup("missing").is_none());
    }
}
