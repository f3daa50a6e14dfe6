use std::{collections::HashSet, path::{Path, PathBuf}};

use async_trait::async_trait;
use models::{error::Error, progress::Progress, storage::{SaveStats, StorageBackend}, transactions::{DedupKey, TransactionRow}};
use tokio::fs::{File, OpenOptions};
use tokio_stream::StreamExt;

use crate::{reader::read_csv, transaction::CsvRow, writer::write_csv};

/// Appends new transactions to a CSV file, skipping rows whose dedup key is
/// already in the file.
#[derive(Debug, Clone)]
pub struct CsvStore {
    name: String,
    path: Option<PathBuf>,
    dedup_key: DedupKey,
}

impl CsvStore {
    pub fn new(path: Option<PathBuf>, dedup_key: DedupKey) -> Self {
        let name = "csv".to_string();
        dedup_key.warn_if_deprecated(&name);
        Self { name, path, dedup_key }
    }

    async fn existing_keys(&self, path: &Path) -> Result<HashSet<String>, anyhow::Error> {
        let mut keys = HashSet::new();
        let mut file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };

        let rows = read_csv(&mut file).await;
        tokio::pin!(rows);
        while let Some(row) = rows.next().await {
            let row = row?;
            let key = match self.dedup_key {
                DedupKey::UniqueId => row.unique_id,
                DedupKey::Hash => row.hash,
            };
            keys.insert(key);
        }
        Ok(keys)
    }

    async fn append(&self, path: &Path, rows: Vec<CsvRow>) -> Result<usize, anyhow::Error> {
        let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
        let is_new = file.metadata().await?.len() == 0;
        write_csv(&mut file, is_new, futures::stream::iter(rows)).await
    }
}

#[async_trait]
impl StorageBackend for CsvStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_save(&self) -> bool {
        self.path.is_some()
    }

    async fn save_transactions(&self, transactions: &[TransactionRow], progress: &mut Progress) -> Result<SaveStats, Error> {
        let path = self.path.as_ref().ok_or_else(|| Error::config("csv storage has no path"))?;
        let mut stats = SaveStats::new(&self.name);

        progress.step("read existing rows").await;
        let mut seen = self
            .existing_keys(path)
            .await
            .map_err(|e| Error::backend(format!("reading {}: {:#}", path.display(), e)))?;

        let mut added = Vec::new();
        for transaction in transactions {
            if transaction.is_pending() {
                stats.other_skipped += 1;
            } else if !seen.insert(self.dedup_key.of(transaction).to_string()) {
                stats.existing += 1;
            } else {
                added.push(transaction.clone());
            }
        }

        if !added.is_empty() {
            progress.step("append rows").await;
            let rows = added.iter().map(CsvRow::from).collect();
            self.append(path, rows)
                .await
                .map_err(|e| Error::backend(format!("writing {}: {:#}", path.display(), e)))?;
        }

        tracing::debug!(path = %path.display(), added = added.len(), "CSV store updated");
        stats.added = added.len();
        stats.highlight("Added", added);
        Ok(stats)
    }
}
