//! Polling loop shared by the OCR subcommands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use ksiegi_core::models::config::KsiegiConfig;
use ksiegi_core::{OcrEngine, PureOcrEngine, TaskEvent, TaskRunner};

/// How often both task queues are drained.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a polled task ended.
pub enum Outcome {
    /// The task's completion event.
    Finished(TaskEvent),
    /// The user interrupted the task.
    Cancelled,
}

/// Spinner showing the latest progress line.
pub fn spinner() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Load the OCR engine once for the whole run.
pub fn load_engine(
    config: &KsiegiConfig,
    model_dir: Option<&Path>,
) -> anyhow::Result<Arc<dyn OcrEngine>> {
    let dir = model_dir.unwrap_or(&config.models.model_dir);
    let engine = PureOcrEngine::from_dir(dir, &config.models, &config.ocr)?;
    info!("Loaded {} models from {}", engine.name(), dir.display());
    Ok(Arc::new(engine))
}

/// Drain `runner` every 50ms until a terminal event arrives.
///
/// Non-terminal events go to `on_event`. Ctrl-C cancels the task and
/// polling continues until the worker acknowledges with `Cancelled`.
/// An `Error` event becomes the returned error.
pub async fn poll<F>(runner: &mut TaskRunner, pb: &ProgressBar, mut on_event: F) -> anyhow::Result<Outcome>
where
    F: FnMut(&TaskEvent),
{
    let mut interval = time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancelling = false;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            signal = &mut ctrl_c, if !cancelling => {
                signal?;
                warn!("Interrupted, cancelling task");
                cancelling = true;
                runner.cancel();
                pb.set_message("Cancelling...");
                continue;
            }
        }

        // Checked before draining so a finished worker's last events are seen.
        let stopped = !runner.is_active();

        for message in runner.drain_progress() {
            debug!("{}", message);
            pb.set_message(message);
        }

        for event in runner.drain_results() {
            match event {
                TaskEvent::Cancelled => {
                    runner.join()?;
                    return Ok(Outcome::Cancelled);
                }
                TaskEvent::Error { message } => {
                    runner.join()?;
                    anyhow::bail!(message);
                }
                event if event.is_terminal() => {
                    runner.join()?;
                    return Ok(Outcome::Finished(event));
                }
                event => on_event(&event),
            }
        }

        if stopped {
            runner.join()?;
            anyhow::bail!("Task stopped without reporting a result");
        }
    }
}
