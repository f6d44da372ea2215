use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use super::TaskEvent;
use crate::error::{KsiegiError, Result, TaskError};

/// Shared cooperative-cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Slot holding the worker pool of the running task, if any.
pub(crate) type PoolSlot = Arc<Mutex<Option<Arc<ThreadPool>>>>;

/// Handle given to the work function of a task.
///
/// All communication with the caller goes through the two queues; the
/// context itself holds no state the caller reads.
pub struct TaskContext {
    cancel: CancelToken,
    progress: Sender<String>,
    results: Sender<TaskEvent>,
    pool: PoolSlot,
    terminal_sent: AtomicBool,
}

impl TaskContext {
    pub(crate) fn new(
        cancel: CancelToken,
        progress: Sender<String>,
        results: Sender<TaskEvent>,
        pool: PoolSlot,
    ) -> Self {
        Self {
            cancel,
            progress,
            results,
            pool,
            terminal_sent: AtomicBool::new(false),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(KsiegiError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Clone of the cancellation flag, for jobs running on the pool.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Queue a progress line.
    pub fn progress(&self, message: impl Into<String>) {
        // the receiver lives in the runner; a send can only fail after it is dropped
        let _ = self.progress.send(message.into());
    }

    /// Queue a result event.
    pub fn emit(&self, event: TaskEvent) {
        if event.is_terminal() {
            self.terminal_sent.store(true, Ordering::SeqCst);
        }
        let _ = self.results.send(event);
    }

    pub(crate) fn terminal_sent(&self) -> bool {
        self.terminal_sent.load(Ordering::SeqCst)
    }

    /// Build the task's bounded worker pool and register it for cancellation.
    pub fn install_pool(&self, threads: usize) -> Result<Arc<ThreadPool>> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ksiegi-ocr-{}", i))
            .build()
            .map_err(|e| TaskError::Pool(e.to_string()))?;
        let pool = Arc::new(pool);

        if let Ok(mut slot) = self.pool.lock() {
            *slot = Some(Arc::clone(&pool));
        }

        debug!("Worker pool started with {} threads", threads);
        Ok(pool)
    }

    /// Forget the registered pool; it shuts down once the last handle drops.
    pub(crate) fn release_pool(&self) {
        if let Ok(mut slot) = self.pool.lock() {
            slot.take();
        }
    }
}
