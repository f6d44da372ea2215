use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, info};

use super::context::PoolSlot;
use super::{CancelToken, TaskContext, TaskEvent};
use crate::error::{Result, TaskError};

/// Runs one long operation at a time on a dedicated worker thread.
///
/// The caller polls [`TaskRunner::drain_progress`] and
/// [`TaskRunner::drain_results`] until a terminal event arrives. A runner
/// can be reused for another task once the previous one finished.
pub struct TaskRunner {
    cancel: CancelToken,
    progress_tx: Sender<String>,
    progress_rx: Receiver<String>,
    results_tx: Sender<TaskEvent>,
    results_rx: Receiver<TaskEvent>,
    pool: PoolSlot,
    worker: Option<JoinHandle<()>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        let (progress_tx, progress_rx) = unbounded();
        let (results_tx, results_rx) = unbounded();
        Self {
            cancel: CancelToken::new(),
            progress_tx,
            progress_rx,
            results_tx,
            results_rx,
            pool: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    /// Launch `work` on a new worker thread and return immediately.
    ///
    /// Fails with [`TaskError::AlreadyActive`] while a previous task is
    /// still running. Whatever `work` returns is turned into the terminal
    /// event: `Err(Cancelled)` becomes [`TaskEvent::Cancelled`], any other
    /// error or a panic becomes [`TaskEvent::Error`].
    pub fn start<F>(&mut self, name: &str, work: F) -> Result<()>
    where
        F: FnOnce(&TaskContext) -> Result<()> + Send + 'static,
    {
        if self.is_active() {
            return Err(TaskError::AlreadyActive.into());
        }
        if let Some(previous) = self.worker.take() {
            let _ = previous.join();
        }

        let stale = self.progress_rx.try_iter().count() + self.results_rx.try_iter().count();
        if stale > 0 {
            debug!("Discarded {} undrained events of the previous task", stale);
        }

        self.cancel.reset();
        let ctx = TaskContext::new(
            self.cancel.clone(),
            self.progress_tx.clone(),
            self.results_tx.clone(),
            Arc::clone(&self.pool),
        );

        let task_name = name.to_string();
        let handle = thread::Builder::new()
            .name(format!("ksiegi-{}", name))
            .spawn(move || run_worker(&task_name, ctx, work))
            .map_err(|e| TaskError::Spawn(e.to_string()))?;

        info!("Started task {}", name);
        self.worker = Some(handle);
        Ok(())
    }

    /// Request cancellation and let go of the task's worker pool.
    ///
    /// Jobs already running on the pool finish on their own; nothing waits
    /// for them.
    pub fn cancel(&self) {
        self.cancel.cancel();
        if let Ok(mut slot) = self.pool.lock() {
            if slot.take().is_some() {
                debug!("Released worker pool on cancel");
            }
        }
        info!("Cancellation requested");
    }

    /// True while the worker thread is alive.
    pub fn is_active(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Remove and return every queued progress line.
    pub fn drain_progress(&self) -> Vec<String> {
        self.progress_rx.try_iter().collect()
    }

    /// Remove and return every queued result event.
    pub fn drain_results(&self) -> Vec<TaskEvent> {
        self.results_rx.try_iter().collect()
    }

    /// Block until the worker thread has exited.
    pub fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.worker.take() {
            handle
                .join()
                .map_err(|p| TaskError::Panicked(panic_message(p.as_ref())))?;
        }
        Ok(())
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        if self.is_active() {
            self.cancel();
        }
    }
}

fn run_worker<F>(name: &str, ctx: TaskContext, work: F)
where
    F: FnOnce(&TaskContext) -> Result<()>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&ctx)));
    ctx.release_pool();

    match outcome {
        Ok(Ok(())) => {
            if ctx.is_cancelled() && !ctx.terminal_sent() {
                ctx.emit(TaskEvent::Cancelled);
            }
            debug!("Task {} finished", name);
        }
        Ok(Err(e)) if e.is_cancelled() => {
            info!("Task {} cancelled", name);
            ctx.emit(TaskEvent::Cancelled);
        }
        Ok(Err(e)) => {
            error!("Task {} failed: {}", name, e);
            ctx.progress(format!("Error: {}", e));
            ctx.emit(TaskEvent::Error {
                message: e.to_string(),
            });
        }
        Err(panic) => {
            let message = TaskError::Panicked(panic_message(panic.as_ref())).to_string();
            error!("Task {}: {}", name, message);
            ctx.emit(TaskEvent::Error { message });
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
