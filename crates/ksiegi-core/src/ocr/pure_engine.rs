//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, trace};

use super::instances::InstancePool;
use super::{OcrEngine, Result};
use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

/// Height in pixels of the band used to group detected boxes into rows.
const ROW_BAND: f64 = 20.0;

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// The underlying engine caches models per input shape and is not `Sync`,
/// so `ocr.engine_instances` copies are loaded, each behind its own lock.
/// That count bounds how many workers recognize at the same time.
pub struct PureOcrEngine {
    engines: InstancePool<pure_onnx_ocr::engine::OcrEngine>,
    keep_unk: bool,
}

impl PureOcrEngine {
    /// Create an engine from the model files named in `models`.
    pub fn from_dir(model_dir: &Path, models: &ModelConfig, config: &OcrConfig) -> Result<Self> {
        let det_path = model_dir.join(&models.detection_model);
        let rec_path = model_dir.join(&models.recognition_model);
        let dict_path = model_dir.join(&models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "missing model file: {}",
                    path.display()
                )));
            }
        }

        let count = config.engine_instances.max(1);
        let engines = (0..count)
            .map(|_| {
                pure_onnx_ocr::engine::OcrEngineBuilder::new()
                    .det_model_path(&det_path)
                    .rec_model_path(&rec_path)
                    .dictionary_path(&dict_path)
                    .build()
                    .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded {} pure-onnx-ocr engine(s) from {}",
            count,
            model_dir.display()
        );

        Ok(Self {
            engines: InstancePool::new(engines),
            keep_unk: config.keep_unk,
        })
    }

    /// Run detection and recognition, returning region texts in reading order.
    fn read_regions(&self, image: &DynamicImage) -> Result<Vec<String>> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("{}x{}", width, height)));
        }

        let results = self
            .engines
            .with(|engine| engine.run_from_image(image))
            .ok_or_else(|| OcrError::Recognition("engine lock poisoned".to_string()))?
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut regions: Vec<(f64, f64, String)> = results
            .iter()
            .map(|r| {
                let (x, y) = top_left(&r.bounding_box);
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                (x, y, text)
            })
            .collect();

        // Sort by reading order
        regions.sort_by(|a, b| {
            let row_a = (a.1 / ROW_BAND) as i64;
            let row_b = (b.1 / ROW_BAND) as i64;
            row_a
                .cmp(&row_b)
                .then(a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        });

        debug!(
            "OCR {}x{}: {} text regions in {}ms",
            width,
            height,
            regions.len(),
            start.elapsed().as_millis()
        );

        Ok(regions.into_iter().map(|(_, _, text)| text).collect())
    }
}

impl OcrEngine for PureOcrEngine {
    fn name(&self) -> &'static str {
        "pure-onnx-ocr"
    }

    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String> {
        // The latin recognition model covers both Polish and English.
        trace!("recognize ({})", language);
        Ok(self.read_regions(image)?.join("\n"))
    }
}

/// Smallest x and y over the first four polygon corners.
fn top_left(polygon: &pure_onnx_ocr::Polygon<f64>) -> (f64, f64) {
    polygon
        .exterior()
        .coords()
        .take(4)
        .fold((f64::MAX, f64::MAX), |(x, y), c| (x.min(c.x), y.min(c.y)))
}
