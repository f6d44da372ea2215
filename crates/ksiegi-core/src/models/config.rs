//! Configuration structures for the OCR pipelines.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::invoice::ValidationMode;

/// Main configuration for the ksiegi pipelines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KsiegiConfig {
    /// OCR engine usage.
    pub ocr: OcrConfig,

    /// Document rasterization.
    pub pdf: PdfConfig,

    /// Whole-page OCR.
    pub pages: PageConfig,

    /// Per-cell OCR.
    pub cells: CellConfig,

    /// Table cell segmentation.
    pub segmentation: SegmenterConfig,

    /// Validator mode per call site.
    pub validation: ValidationConfig,

    /// Output file names.
    pub output: OutputConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Language hint for whole-page OCR.
    pub page_language: String,

    /// Language hint for single-cell OCR.
    pub cell_language: String,

    /// Prefer the engine's batch form when it offers one.
    pub use_batch: bool,

    /// Upper bound on simultaneous engine invocations.
    pub max_workers: usize,

    /// Engine copies loaded by the bundled engine; bounds how many
    /// recognitions actually run at once.
    pub engine_instances: usize,

    /// Keep `[UNK]` tokens produced by the recognizer.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            page_language: "pol+eng".to_string(),
            cell_language: "pol".to_string(),
            use_batch: true,
            max_workers: 4,
            engine_instances: 2,
            keep_unk: false,
        }
    }
}

/// Document rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for whole-page OCR.
    pub page_dpi: u32,

    /// DPI for table segmentation of a single page.
    pub table_dpi: u32,

    /// Maximum pages to rasterize (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_dpi: 300,
            table_dpi: 400,
            max_pages: 0,
        }
    }
}

/// Rectangle in page pixels, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Whole-page OCR configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Region cut out of every page before OCR (`None` = whole page).
    pub crop: Option<CropRegion>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            // Invoice-number column of the ledger layout at 300 dpi.
            crop: Some(CropRegion {
                left: 503,
                top: 332,
                right: 771,
                bottom: 2377,
            }),
        }
    }
}

/// Per-cell OCR configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    /// Cells per batch; bounds peak memory of extracted regions.
    pub batch_size: usize,

    /// Leftmost accepted cell origin (inclusive).
    pub x_min: u32,

    /// Rightmost accepted cell origin (inclusive).
    pub x_max: u32,

    /// Shortest recognized text worth validating.
    pub min_text_len: usize,

    /// Regions with fewer pixels are skipped.
    pub min_region_pixels: u64,

    /// Emit a progress line every N processed cells.
    pub progress_every: usize,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            x_min: 100,
            x_max: 400,
            min_text_len: 5,
            min_region_pixels: 16,
            progress_every: 5,
        }
    }
}

/// Table grid detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Inverse binarization cutoff; darker pixels become ink.
    pub threshold: u8,

    /// Length of the line structuring elements in pixels (at most 511).
    pub line_length: u32,

    /// Minimum enclosed contour area for a box to count as a cell.
    pub min_area: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            threshold: 180,
            line_length: 30,
            min_area: 800.0,
        }
    }
}

/// Validator mode bound to each call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Mode used when filtering whole-page OCR lines into records.
    pub page_mode: ValidationMode,

    /// Mode used when filtering single-cell OCR results.
    pub cell_mode: ValidationMode,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            page_mode: ValidationMode::Loose,
            cell_mode: ValidationMode::Strict,
        }
    }
}

/// Output file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving all output files.
    pub dir: PathBuf,

    /// Records extracted from whole-page OCR.
    pub records_file: String,

    /// Row-by-row comparison of two result files.
    pub comparison_file: String,

    /// Raw OCR lines of the last document run.
    pub ocr_log_file: String,

    /// Accepted cells of the last table run.
    pub cells_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("odczyty"),
            records_file: "zakupy.csv".to_string(),
            comparison_file: "porownanie.csv".to_string(),
            ocr_log_file: "ocr_log.txt".to_string(),
            cells_file: "komorki.txt".to_string(),
        }
    }
}

/// Model file paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl KsiegiConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Get full path to an output file.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output.dir.join(file_name)
    }
}
