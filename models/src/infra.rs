use std::sync::Arc;

use futures::Future;
use tokio::{runtime::Runtime, task::JoinHandle};
use tracing::{Instrument, Span};

/// Multi-thread runtime for one run. Everything it executes is traced under
/// the run span, spawned workers each get a child span of their own.
#[derive(Clone)]
pub struct SpannedRuntime {
    runtime: Arc<Runtime>,
    span: Span,
}

impl SpannedRuntime {
    fn new(runtime: Arc<Runtime>, span: Span) -> Self {
        Self { runtime, span }
    }

    /// Spawns a worker named after what it works on, e.g. a storage backend.
    pub fn spawn_worker<T>(&self, worker: &str, future: T) -> JoinHandle<T::Output>
    where
        T: Future + Send + 'static,
        T::Output: Send + 'static,
    {
        let span = tracing::info_span!(parent: &self.span, "worker", name = %worker);
        self.runtime.spawn(future.instrument(span))
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future.instrument(self.span.clone()))
    }
}

pub fn get_runtime(worker_threads: usize, blocking_threads: usize, span: Span) -> Result<SpannedRuntime, std::io::Error> {
    let rt = init_runtime(worker_threads, blocking_threads)?;
    Ok(SpannedRuntime::new(rt, span))
}

// A thread count of zero comes from config and would make tokio panic.
pub fn init_runtime(worker_threads: usize, blocking_threads: usize) -> Result<Arc<Runtime>, std::io::Error> {
    let (worker_threads, blocking_threads) = (worker_threads.max(1), blocking_threads.max(1));
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(worker_threads)
        .max_blocking_threads(blocking_threads)
        .thread_name("fanout-rt")
        .build()?;

    tracing::debug!(worker_threads, blocking_threads, "Runtime started");
    Ok(Arc::new(rt))
}
