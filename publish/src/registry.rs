use std::sync::Arc;

use models::storage::StorageBackend;

/// The backends that take part in a run, fixed when the process starts.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn StorageBackend>>,
}

impl BackendRegistry {
    /// Keeps the candidates that report they can save. `can_save` is not
    /// consulted again for the rest of the run.
    pub fn new(candidates: Vec<Arc<dyn StorageBackend>>) -> Self {
        let backends = candidates
            .into_iter()
            .filter(|backend| {
                let enabled = backend.can_save();
                tracing::info!(backend = backend.name(), enabled, "Registering storage backend");
                enabled
            })
            .collect();
        Self { backends }
    }

    pub fn backends(&self) -> &[Arc<dyn StorageBackend>] {
        &self.backends
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
