use async_trait::async_trait;
use models::{error::Error, progress::Progress, storage::{SaveStats, StorageBackend}, transactions::{DedupKey, TransactionRow}};
use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

/// Keeps saved transactions in memory, keyed by their dedup key. Clones share
/// the same storage.
#[derive(Debug, Clone)]
pub struct MemStore {
    name: String,
    enabled: bool,
    dedup_key: DedupKey,
    transactions: Arc<RwLock<HashMap<String, TransactionRow>>>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new("memory", true)
    }
}

impl MemStore {
    pub fn new(name: &str, enabled: bool) -> Self {
        Self {
            name: name.to_string(),
            enabled,
            dedup_key: DedupKey::default(),
            transactions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_dedup_key(mut self, dedup_key: DedupKey) -> Self {
        dedup_key.warn_if_deprecated(&self.name);
        self.dedup_key = dedup_key;
        self
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.transactions.read().await.contains_key(key)
    }

    /// Every stored row, ordered by unique id.
    pub async fn all_transactions(&self) -> Vec<TransactionRow> {
        let result = self
            .transactions
            .read().await;

        let mut rows: Vec<TransactionRow> = result.values().cloned().collect();
        rows.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        rows
    }
}

#[async_trait]
impl StorageBackend for MemStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_save(&self) -> bool {
        self.enabled
    }

    async fn save_transactions(&self, transactions: &[TransactionRow], progress: &mut Progress) -> Result<SaveStats, Error> {
        let mut stats = SaveStats::new(&self.name);
        let mut added = Vec::new();

        progress.step("lock store").await;
        let mut result = self
            .transactions
            .write().await;

        progress.step("insert rows").await;
        for transaction in transactions {
            if transaction.is_pending() {
                stats.other_skipped += 1;
                continue;
            }
            match result.entry(self.dedup_key.of(transaction).to_string()) {
                std::collections::hash_map::Entry::Occupied(_) => stats.existing += 1,
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(transaction.clone());
                    added.push(transaction.clone());
                }
            }
        }

        tracing::debug!(backend = %self.name, stored = result.len(), "Memory store updated");
        stats.added = added.len();
        stats.highlight("Added", added);
        Ok(stats)
    }
}
