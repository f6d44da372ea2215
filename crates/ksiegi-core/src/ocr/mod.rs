//! OCR collaborators: the engine contract, image preprocessing and table cell segmentation.

mod instances;
mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;
mod segmenter;

pub use instances::InstancePool;
pub use preprocessing::{Axis, binarize_inverse, blur_3x3, crop_region, line_opening, union};
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;
pub use segmenter::CellSegmenter;

use image::DynamicImage;

use crate::error::OcrError;

/// Result type for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;

/// Trait that all OCR engines must implement.
///
/// One instance is built at startup and shared as `Arc<dyn OcrEngine>`
/// by every pipeline, so implementations must be usable from several
/// worker threads at once.
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier.
    fn name(&self) -> &'static str;

    /// Recognize text in an image region.
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String>;

    /// Whether [`OcrEngine::recognize_batch`] is worth preferring over
    /// per-image calls.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Recognize several images in one call.
    ///
    /// `on_progress(done, total)` is called before each image. Output is
    /// index-aligned with `images`. The default runs [`OcrEngine::recognize`]
    /// for each image in turn, so the batch and per-image paths produce the
    /// same text.
    fn recognize_batch(
        &self,
        images: &[DynamicImage],
        language: &str,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<String>> {
        let total = images.len();
        images
            .iter()
            .enumerate()
            .map(|(i, image)| {
                on_progress(i, total);
                self.recognize(image, language)
            })
            .collect()
    }
}
