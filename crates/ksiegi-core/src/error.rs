//! Error types for the ksiegi-core library.

use thiserror::Error;

/// Main error type for the ksiegi library.
#[derive(Error, Debug)]
pub enum KsiegiError {
    /// Document rasterization error.
    #[error("rasterization error: {0}")]
    Raster(#[from] RasterError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Result file error.
    #[error("output error: {0}")]
    Persist(#[from] PersistError),

    /// Background task error.
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operation observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors related to turning a document into page images.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Failed to open/parse the document.
    #[error("failed to open document: {0}")]
    Open(String),

    /// The document is encrypted and cannot be processed.
    #[error("document is encrypted")]
    Encrypted,

    /// The document has no pages.
    #[error("document has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The page carries no scanned image that could be decoded.
    #[error("no decodable scan image on page {0}")]
    NoImage(u32),

    /// The embedded image stream could not be decoded.
    #[error("failed to decode page image: {0}")]
    Decode(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The batch form of the engine failed as a whole.
    #[error("batch recognition failed: {0}")]
    Batch(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to writing and comparing result files.
#[derive(Error, Debug)]
pub enum PersistError {
    /// The file exists but holds nothing.
    #[error("file is empty: {0}")]
    EmptyFile(String),

    /// The file holds text but not a single parseable row.
    #[error("no parseable rows in {0}")]
    NoRows(String),

    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No row of the file reaches the compared column.
    #[error("column {column} not found in {path}")]
    MissingColumn { path: String, column: usize },

    /// CSV encoding/decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Writing the output file failed.
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the task runner itself.
#[derive(Error, Debug)]
pub enum TaskError {
    /// A task is still running under this runner.
    #[error("a task is already active")]
    AlreadyActive,

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    /// The bounded worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    Pool(String),

    /// The worker panicked.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl KsiegiError {
    /// Whether this error is the cooperative-cancellation marker.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KsiegiError::Cancelled)
    }
}

/// Result type for the ksiegi library.
pub type Result<T> = std::result::Result<T, KsiegiError>;
