//! Core library for reading invoice numbers out of scanned ledger PDFs.
//!
//! This crate provides:
//! - Page images from scanned PDFs (lopdf)
//! - Table cell segmentation with morphological line extraction
//! - Cancellable background tasks with polled progress/result queues
//! - Parallel page OCR and batched cell OCR over a shared engine
//! - Invoice-number validation and CSV output/comparison

pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod task;

pub use error::{KsiegiError, Result};
pub use invoice::{RecordValidator, ValidationMode, extract_records};
pub use models::{
    Cell, CellResult, ComparisonRow, ComparisonStatus, KsiegiConfig, PageLine, PageResult, Record,
};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use ocr::{CellSegmenter, OcrEngine};
pub use output::{CompareOptions, ResultPersister};
pub use pdf::{PdfRasterizer, RasterSource};
pub use pipeline::{CellOcrBatcher, PageOcrCoordinator};
pub use task::{CancelToken, TaskContext, TaskEvent, TaskRunner};
