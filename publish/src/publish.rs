use models::{
    error::Error,
    infra::SpannedRuntime,
    notify::{edit_best_effort, report_error_best_effort, send_best_effort, Notifier},
    progress::{Progress, StepTimeline},
    storage::{SaveStats, StorageBackend},
    transactions::{RawAccountResult, TransactionRow},
};
use std::{sync::Arc, time::{Duration, Instant}};

use engine::normalize::{normalize, NormalizeFailure};
use tokio::task::JoinHandle;

use crate::{registry::BackendRegistry, report};

/// Final state of one backend's save.
#[derive(Debug, Clone)]
pub struct BackendOutcome {
    pub name: String,
    pub result: Result<SaveStats, Error>,
    pub duration: Duration,
    pub timeline: StepTimeline,
}

impl BackendOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub enum RunSummary {
    NoBackends,
    NothingToSave { normalize_failures: Vec<NormalizeFailure> },
    Completed { outcomes: Vec<BackendOutcome>, normalize_failures: Vec<NormalizeFailure> },
}

impl RunSummary {
    pub fn outcomes(&self) -> &[BackendOutcome] {
        match self {
            RunSummary::Completed { outcomes, .. } => outcomes,
            _ => &[],
        }
    }

    pub fn normalize_failures(&self) -> &[NormalizeFailure] {
        match self {
            RunSummary::NoBackends => &[],
            RunSummary::NothingToSave { normalize_failures } => normalize_failures,
            RunSummary::Completed { normalize_failures, .. } => normalize_failures,
        }
    }
}

pub struct Publisher {
    notifier: Arc<dyn Notifier>,
    rt: Arc<SpannedRuntime>,
}

impl Publisher {
    pub fn new(notifier: Arc<dyn Notifier>, rt: Arc<SpannedRuntime>) -> Self {
        Self { notifier, rt }
    }

    // Normalizes the scrape results and fans the rows out to every backend in
    // the registry. Neither a malformed transaction nor a failing backend ends
    // the run early.
    pub async fn run(&self, results: &[RawAccountResult], registry: &BackendRegistry) -> RunSummary {
        if registry.is_empty() {
            return self.no_backends().await;
        }

        let normalized = normalize(results);
        for failure in &normalized.failures {
            report_error_best_effort(self.notifier.as_ref(), &failure.diagnostic(), &failure.context()).await;
        }

        match self.publish(normalized.transactions.into(), registry).await {
            RunSummary::NothingToSave { .. } => RunSummary::NothingToSave { normalize_failures: normalized.failures },
            RunSummary::Completed { outcomes, .. } => RunSummary::Completed { outcomes, normalize_failures: normalized.failures },
            RunSummary::NoBackends => RunSummary::NoBackends,
        }
    }

    pub async fn publish(&self, transactions: Arc<[TransactionRow]>, registry: &BackendRegistry) -> RunSummary {
        if registry.is_empty() {
            return self.no_backends().await;
        }
        if transactions.is_empty() {
            tracing::info!("No transactions to save");
            send_best_effort(self.notifier.as_ref(), report::NOTHING_TO_SAVE).await;
            return RunSummary::NothingToSave { normalize_failures: Vec::new() };
        }

        tracing::info!(transactions = transactions.len(), backends = ?registry.names(), "Saving transactions");
        let outcomes = self.fan_out(transactions, registry).await;
        RunSummary::Completed { outcomes, normalize_failures: Vec::new() }
    }

    async fn no_backends(&self) -> RunSummary {
        tracing::warn!("No storage backends configured");
        send_best_effort(self.notifier.as_ref(), report::NO_BACKENDS).await;
        RunSummary::NoBackends
    }

    // One task per backend. Every task is awaited, a failed or panicked
    // backend only shows up in its own outcome.
    async fn fan_out(&self, transactions: Arc<[TransactionRow]>, registry: &BackendRegistry) -> Vec<BackendOutcome> {
        let workers: Vec<(String, JoinHandle<BackendOutcome>)> = registry
            .backends()
            .iter()
            .map(|backend| {
                let name = backend.name().to_string();
                let task = save_with(backend.clone(), transactions.clone(), self.notifier.clone());
                (name.clone(), self.rt.spawn_worker(&name, task))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(workers.len());
        for (name, worker) in workers {
            match worker.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!(backend = %name, error = %e, "Storage backend task aborted");
                    let error = Error::from(e);
                    report_error_best_effort(self.notifier.as_ref(), &error, &name).await;
                    outcomes.push(BackendOutcome { name, result: Err(error), duration: Duration::ZERO, timeline: StepTimeline::new() });
                }
            }
        }
        tracing::info!(
            succeeded = outcomes.iter().filter(|o| o.is_success()).count(),
            failed = outcomes.iter().filter(|o| !o.is_success()).count(),
            "Finished saving to all backends"
        );
        outcomes
    }
}

async fn save_with(backend: Arc<dyn StorageBackend>, transactions: Arc<[TransactionRow]>, notifier: Arc<dyn Notifier>) -> BackendOutcome {
    let name = backend.name().to_string();
    let handle = send_best_effort(notifier.as_ref(), &report::saving(&name)).await;
    let mut progress = Progress::new(&name, notifier.clone(), handle);

    let started = Instant::now();
    let result = backend.save_transactions(&transactions, &mut progress).await;
    let duration = started.elapsed();
    let timeline = progress.finish();

    match &result {
        Ok(stats) => {
            tracing::info!(added = stats.added, existing = stats.existing, skipped = stats.other_skipped, ?duration, "Saved transactions");
            edit_best_effort(notifier.as_ref(), handle.as_ref(), &report::render_success(&name, stats, duration, &timeline)).await;
        }
        Err(e) => {
            tracing::error!(error = %e, ?duration, "Failed to save transactions");
            report_error_best_effort(notifier.as_ref(), e, &name).await;
            edit_best_effort(notifier.as_ref(), handle.as_ref(), &report::render_failure(&name, e, duration, &timeline)).await;
        }
    }

    BackendOutcome { name, result, duration, timeline }
}
