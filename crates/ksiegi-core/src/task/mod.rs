//! Background task execution with polled progress and result queues.

mod context;
mod event;
mod runner;

pub use context::{CancelToken, TaskContext};
pub use event::TaskEvent;
pub use runner::TaskRunner;
