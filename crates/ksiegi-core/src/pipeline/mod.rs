//! OCR pipelines run under a [`crate::task::TaskRunner`].

mod cells;
mod dispatch;
mod pages;

pub use cells::CellOcrBatcher;
pub use pages::PageOcrCoordinator;
