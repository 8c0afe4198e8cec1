use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use indicatif::ProgressStyle;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::Level;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::error::ResolveError;

/// A named unit of work submitted to an [`OperationQueue`].
pub struct Operation {
    name: String,
    run: Box<dyn FnOnce() + Send>,
}

impl Operation {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(self) {
        (self.run)()
    }
}

impl Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation({})", self.name)
    }
}

/// Accepts units of work for potentially parallel execution.
///
/// No ordering is guaranteed between operations. Callers that need results
/// must either wait for the queue or make reading the result idempotent with
/// running the work, as transformation nodes do.
pub trait OperationQueue: Sync {
    fn add(&self, operation: Operation);

    /// Blocks until every operation added so far has finished.
    fn wait_for_completion(&self) {}
}

/// Runs every operation right away on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineQueue;

impl OperationQueue for InlineQueue {
    fn add(&self, operation: Operation) {
        operation.run();
    }
}

/// Collects operations and runs them on a rayon thread pool once
/// [`wait_for_completion`](OperationQueue::wait_for_completion) is called.
#[derive(Default)]
pub struct ParallelQueue {
    pending: Mutex<Vec<Operation>>,
    pool: Option<rayon::ThreadPool>,
}

impl ParallelQueue {
    /// Creates a queue running on the global rayon pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue with a dedicated pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, ResolveError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("henka-worker-{i}"))
            .build()?;

        Ok(Self {
            pending: Mutex::default(),
            pool: Some(pool),
        })
    }

    /// Number of operations waiting to be run.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn take_pending(&self) -> Vec<Operation> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn run_batch(&self, batch: Vec<Operation>) {
        let span = tracing::span!(Level::INFO, "operations", count = batch.len());
        span.pb_set_length(batch.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            span.pb_set_style(&style.progress_chars("=>-"));
        }
        span.pb_set_message("Running transforms...");

        let start = Instant::now();
        let len = batch.len();

        let run = || {
            batch.into_par_iter().for_each(|operation| {
                span.in_scope(|| {
                    tracing::trace!("running {}", operation.name());
                    operation.run();
                });
                span.pb_inc(1);
            })
        };

        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }

        tracing::info!("ran {} operation(s) in {:.2?}", len, start.elapsed());
    }
}

impl OperationQueue for ParallelQueue {
    fn add(&self, operation: Operation) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation);
    }

    fn wait_for_completion(&self) {
        // Operations may add more operations while running.
        loop {
            let batch = self.take_pending();
            if batch.is_empty() {
                break;
            }
            self.run_batch(batch);
        }
    }
}
