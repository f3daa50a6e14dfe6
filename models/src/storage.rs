use async_trait::async_trait;

use crate::error::Error;
use crate::progress::Progress;
use crate::transactions::TransactionRow;

/// A named subset of the saved transactions worth showing in the report,
/// e.g. the rows a backend actually added.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub label: String,
    pub transactions: Vec<TransactionRow>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveStats {
    pub name: String,
    pub added: usize,
    pub existing: usize,
    pub other_skipped: usize,
    pub highlights: Vec<Highlight>,
}

impl SaveStats {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn highlight(&mut self, label: &str, transactions: Vec<TransactionRow>) {
        if !transactions.is_empty() {
            self.highlights.push(Highlight { label: label.to_string(), transactions });
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.existing + self.other_skipped
    }
}

/// Capability every storage backend exposes to the orchestrator.
///
/// `can_save` is asked once, when the registry is built. `save_transactions`
/// gets read-only access to the canonical rows; a backend that needs to attach
/// derived fields works on its own clones.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn name(&self) -> &str;
    fn can_save(&self) -> bool;
    async fn save_transactions(&self, transactions: &[TransactionRow], progress: &mut Progress) -> Result<SaveStats, Error>;
}
