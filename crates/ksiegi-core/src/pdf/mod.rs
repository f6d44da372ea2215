//! Turning scanned documents into page images.

mod rasterizer;

pub use rasterizer::PdfRasterizer;

use std::path::Path;

use image::DynamicImage;

use crate::error::RasterError;

/// Result type for rasterization.
pub type Result<T> = std::result::Result<T, RasterError>;

/// Extensions accepted as single-page documents.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Trait for sources of page images.
pub trait RasterSource: Send + Sync {
    /// Rasterize every page of a document at `dpi`, in page order.
    fn rasterize(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>>;

    /// Rasterize a single page (1-based).
    fn rasterize_page(&self, path: &Path, page: u32, dpi: u32) -> Result<DynamicImage> {
        if page == 0 {
            return Err(RasterError::InvalidPage(page));
        }
        self.rasterize(path, dpi)?
            .into_iter()
            .nth(page as usize - 1)
            .ok_or(RasterError::InvalidPage(page))
    }
}

/// Whether the path names a plain image file rather than a PDF.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pages(u32);

    impl RasterSource for Pages {
        fn rasterize(&self, _path: &Path, dpi: u32) -> Result<Vec<DynamicImage>> {
            Ok((1..=self.0).map(|p| DynamicImage::new_luma8(p, dpi)).collect())
        }
    }

    #[test]
    fn test_rasterize_page_default() {
        let source = Pages(3);
        let page = source.rasterize_page(Path::new("x.pdf"), 2, 10).unwrap();
        assert_eq!(page.width(), 2);
        assert!(matches!(
            source.rasterize_page(Path::new("x.pdf"), 4, 10),
            Err(RasterError::InvalidPage(4))
        ));
        assert!(matches!(
            source.rasterize_page(Path::new("x.pdf"), 0, 10),
            Err(RasterError::InvalidPage(0))
        ));
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("scan.PNG")));
        assert!(is_image_file(Path::new("a/b/scan.tiff")));
        assert!(!is_image_file(Path::new("ledger.pdf")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
