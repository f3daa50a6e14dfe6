use models::{error::Error, infra::SpannedRuntime, notify::Notifier, storage::StorageBackend, transactions::RawAccountResult};
use std::sync::Arc;

use csv_store::csv_store::CsvStore;
use mem_store::mem_store::MemStore;
use publish::{publish::{Publisher, RunSummary}, registry::BackendRegistry};
use tokio::io::AsyncReadExt;

use crate::config::StorageConfig;

pub type Reader = dyn tokio::io::AsyncRead + Send + Sync + Unpin;

pub async fn read_results(reader: &mut Reader) -> Result<Vec<RawAccountResult>, Error> {
    let mut text = String::new();
    reader.read_to_string(&mut text).await?;
    let results: Vec<RawAccountResult> = serde_json::from_str(&text)?;
    tracing::info!(
        results = results.len(),
        succeeded = results.iter().filter(|r| r.success).count(),
        "Loaded scrape results"
    );
    Ok(results)
}

// Every known backend is a candidate; the registry keeps the configured ones.
pub fn build_registry(storage: &StorageConfig) -> BackendRegistry {
    let memory_enabled = storage.memory.as_ref().map(|m| m.enabled).unwrap_or(false);
    let csv = storage.csv.as_ref();

    let candidates: Vec<Arc<dyn StorageBackend>> = vec![
        Arc::new(MemStore::new("memory", memory_enabled)),
        Arc::new(CsvStore::new(csv.map(|c| c.path.clone()), csv.map(|c| c.dedup_key).unwrap_or_default())),
    ];
    BackendRegistry::new(candidates)
}

pub async fn process_results(results: &[RawAccountResult], registry: &BackendRegistry, notifier: Arc<dyn Notifier>, rt: Arc<SpannedRuntime>) -> RunSummary {
    let publisher = Publisher::new(notifier, rt);
    let summary = publisher.run(results, registry).await;

    match &summary {
        RunSummary::NoBackends => tracing::info!("Run finished without backends"),
        RunSummary::NothingToSave { normalize_failures } => {
            tracing::info!(dropped = normalize_failures.len(), "Run finished with nothing to save")
        }
        RunSummary::Completed { outcomes, normalize_failures } => {
            for outcome in outcomes {
                match &outcome.result {
                    Ok(stats) => tracing::info!(backend = %outcome.name, added = stats.added, existing = stats.existing, "Backend finished"),
                    Err(e) => tracing::warn!(backend = %outcome.name, error = %e, "Backend failed"),
                }
            }
            tracing::info!(backends = outcomes.len(), dropped = normalize_failures.len(), "Run finished");
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use models::{logger::create_span, transactions::DedupKey};

    use super::*;
    use crate::{config::{CsvConfig, MemoryConfig}, notifier::ConsoleNotifier};

    const INPUT: &str = r#"[
        {"companyId": "leumi", "success": true, "accounts": [
            {"accountNumber": "100", "txns": [
                {"date": "2024-09-01T00:00:00.000Z", "chargedAmount": -12.5, "description": "Bakery", "identifier": "r1"},
                {"date": "2024-09-02T00:00:00.000Z", "chargedAmount": -40, "description": "Fuel"},
                {"chargedAmount": -3, "description": "No date"},
                {"date": "2024-09-03T00:00:00.000Z", "chargedAmount": -7, "description": "Pending coffee", "status": "pending"}
            ]}
        ]},
        {"companyId": "max", "success": false, "errorType": "TIMEOUT", "errorMessage": "timed out"}
    ]"#;

    fn storage(memory: bool, csv: Option<PathBuf>) -> StorageConfig {
        StorageConfig {
            memory: Some(MemoryConfig { enabled: memory }),
            csv: csv.map(|path| CsvConfig { path, dedup_key: DedupKey::UniqueId }),
        }
    }

    #[test]
    fn test_registry_follows_config() {
        assert!(build_registry(&StorageConfig::default()).is_empty());
        assert_eq!(build_registry(&storage(true, None)).names(), vec!["memory"]);
        assert_eq!(build_registry(&storage(false, Some(PathBuf::from("x.csv")))).names(), vec!["csv"]);
    }

    #[test]
    fn test_read_results() {
        let rt = models::infra::init_runtime(1, 1).unwrap();
        let results = rt.block_on(async { read_results(&mut INPUT.as_bytes()).await }).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].transaction_count(), 4);

        let err = rt.block_on(async { read_results(&mut "{not json".as_bytes()).await }).unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON"));
    }

    #[test]
    fn test_wrongly_typed_field_only_drops_its_record() {
        let input = r#"[{"companyId": "leumi", "success": true, "accounts": [{"accountNumber": "100", "txns": [
            {"date": "2024-09-01", "chargedAmount": -12.5, "description": "Bakery"},
            {"date": "2024-09-01", "chargedAmount": "-40", "description": "Fuel"},
            {"date": "2024-09-02", "chargedAmount": -3, "description": "Parking"}
        ]}]}]"#;
        let rt = Arc::new(models::infra::get_runtime(2, 1, create_span()).unwrap());
        let registry = build_registry(&storage(true, None));
        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(tokio::io::sink()));

        let results = rt.block_on(async { read_results(&mut input.as_bytes()).await }).unwrap();
        let summary = rt.block_on(process_results(&results, &registry, notifier, rt.clone()));

        assert_eq!(summary.normalize_failures().len(), 1);
        assert_eq!(summary.outcomes()[0].result.as_ref().unwrap().added, 2);
    }

    #[test]
    fn test_end_to_end_run_is_idempotent() {
        let rt = Arc::new(models::infra::get_runtime(2, 1, create_span()).unwrap());
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("transactions.csv");
        let registry = build_registry(&storage(true, Some(csv_path.clone())));
        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new(tokio::io::sink()));
        let results = rt.block_on(async { read_results(&mut INPUT.as_bytes()).await }).unwrap();

        let first = rt.block_on(process_results(&results, &registry, notifier.clone(), rt.clone()));
        assert_eq!(first.normalize_failures().len(), 1);
        for outcome in first.outcomes() {
            let stats = outcome.result.as_ref().unwrap();
            assert_eq!((stats.added, stats.existing, stats.other_skipped), (2, 0, 1), "{}", outcome.name);
        }

        let second = rt.block_on(process_results(&results, &registry, notifier, rt.clone()));
        for outcome in second.outcomes() {
            let stats = outcome.result.as_ref().unwrap();
            assert_eq!((stats.added, stats.existing), (0, 2), "{}", outcome.name);
        }
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap().lines().count(), 3);
    }
}
