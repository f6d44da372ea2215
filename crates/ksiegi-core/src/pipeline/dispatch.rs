//! Fan-out of OCR calls over a bounded pool, with batch preference.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, unbounded};
use image::DynamicImage;
use rayon::ThreadPool;
use tracing::{debug, trace, warn};

use crate::error::{OcrError, Result};
use crate::models::config::OcrConfig;
use crate::ocr::{self, OcrEngine};
use crate::task::TaskContext;

/// How long the collector waits for a result before re-checking cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Sends images to the engine for one task.
///
/// Lives on the task's worker thread. Per-image calls run on a pool of
/// `min(max_workers, units)` threads created on first use; results are
/// handed back in completion order. When the engine offers a batch form it
/// is used instead, in chunks of that same size, and after the first batch
/// failure every later chunk of the task goes one image at a time.
pub(crate) struct OcrDispatcher<'a> {
    ctx: &'a TaskContext,
    engine: Arc<dyn OcrEngine>,
    language: String,
    use_batch: bool,
    workers: usize,
    pool: RefCell<Option<Arc<ThreadPool>>>,
    batch_failed: Cell<bool>,
}

impl<'a> OcrDispatcher<'a> {
    pub(crate) fn new(
        ctx: &'a TaskContext,
        engine: Arc<dyn OcrEngine>,
        language: &str,
        config: &OcrConfig,
        units: usize,
    ) -> Self {
        Self {
            ctx,
            engine,
            language: language.to_string(),
            use_batch: config.use_batch,
            workers: config.max_workers.max(1).min(units.max(1)),
            pool: RefCell::new(None),
            batch_failed: Cell::new(false),
        }
    }

    /// Recognize `images`, calling `on_result(index, outcome)` for each.
    ///
    /// Returns `Err(Cancelled)` as soon as cancellation is observed; results
    /// that arrive after that are dropped.
    pub(crate) fn run<F>(&self, images: Vec<DynamicImage>, mut on_result: F) -> Result<()>
    where
        F: FnMut(usize, ocr::Result<String>) -> Result<()>,
    {
        if images.is_empty() {
            return Ok(());
        }
        self.ctx.check_cancelled()?;

        if self.use_batch && self.engine.supports_batch() {
            return self.run_batches(&images, on_result);
        }

        self.run_pooled(images, on_result)
    }

    /// Batch form over chunks of `workers` images, so results are reported
    /// chunk by chunk and cancellation is seen between chunks.
    fn run_batches<F>(&self, images: &[DynamicImage], mut on_result: F) -> Result<()>
    where
        F: FnMut(usize, ocr::Result<String>) -> Result<()>,
    {
        for (n, chunk) in images.chunks(self.workers).enumerate() {
            let offset = n * self.workers;
            self.ctx.check_cancelled()?;

            if !self.batch_failed.get() {
                match self.run_batch(chunk) {
                    Ok(texts) => {
                        for (i, text) in texts.into_iter().enumerate() {
                            self.ctx.check_cancelled()?;
                            on_result(offset + i, Ok(text))?;
                        }
                        continue;
                    }
                    Err(e) => {
                        warn!(
                            "Batch OCR with {} failed, falling back to single calls: {}",
                            self.engine.name(),
                            e
                        );
                        self.batch_failed.set(true);
                        self.ctx
                            .progress("Batch OCR failed, continuing one image at a time");
                    }
                }
            }

            self.run_sequential(chunk, offset, &mut on_result)?;
        }
        Ok(())
    }

    fn run_batch(&self, images: &[DynamicImage]) -> ocr::Result<Vec<String>> {
        let mut report = |done: usize, total: usize| trace!("Batch OCR {}/{}", done + 1, total);
        let texts = self
            .engine
            .recognize_batch(images, &self.language, &mut report)?;

        if texts.len() != images.len() {
            return Err(OcrError::Batch(format!(
                "engine returned {} texts for {} images",
                texts.len(),
                images.len()
            )));
        }
        Ok(texts)
    }

    fn run_sequential<F>(
        &self,
        images: &[DynamicImage],
        offset: usize,
        on_result: &mut F,
    ) -> Result<()>
    where
        F: FnMut(usize, ocr::Result<String>) -> Result<()>,
    {
        for (i, image) in images.iter().enumerate() {
            self.ctx.check_cancelled()?;
            let outcome = recognize_guarded(self.engine.as_ref(), image, &self.language);
            on_result(offset + i, outcome)?;
        }
        Ok(())
    }

    fn run_pooled<F>(&self, images: Vec<DynamicImage>, mut on_result: F) -> Result<()>
    where
        F: FnMut(usize, ocr::Result<String>) -> Result<()>,
    {
        let pool = self.pool()?;
        let (tx, rx) = unbounded();

        for (i, image) in images.into_iter().enumerate() {
            self.ctx.check_cancelled()?;

            let tx = tx.clone();
            let engine = Arc::clone(&self.engine);
            let language = self.language.clone();
            let cancel = self.ctx.cancel_token();

            pool.spawn(move || {
                if cancel.is_cancelled() {
                    return;
                }
                let outcome = recognize_guarded(engine.as_ref(), &image, &language);
                let _ = tx.send((i, outcome));
            });
        }
        drop(tx);

        loop {
            self.ctx.check_cancelled()?;
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok((i, outcome)) => on_result(i, outcome)?,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        Ok(())
    }

    fn pool(&self) -> Result<Arc<ThreadPool>> {
        if let Some(pool) = self.pool.borrow().as_ref() {
            return Ok(Arc::clone(pool));
        }

        let pool = self.ctx.install_pool(self.workers)?;
        debug!(
            "Dispatching to {} workers ({})",
            self.workers,
            self.engine.name()
        );
        *self.pool.borrow_mut() = Some(Arc::clone(&pool));
        Ok(pool)
    }
}

/// Call the engine, turning a panic into a per-image error.
fn recognize_guarded(engine: &dyn OcrEngine, image: &DynamicImage, language: &str) -> ocr::Result<String> {
    panic::catch_unwind(AssertUnwindSafe(|| engine.recognize(image, language)))
        .unwrap_or_else(|_| Err(OcrError::Recognition("engine panicked".to_string())))
}
