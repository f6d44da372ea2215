//! Whole-document OCR, one page per unit of work.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info, warn};

use super::dispatch::OcrDispatcher;
use crate::error::Result;
use crate::models::config::{CropRegion, KsiegiConfig, OcrConfig};
use crate::models::{PageLine, PageResult};
use crate::ocr::{OcrEngine, crop_region};
use crate::pdf::RasterSource;
use crate::task::{TaskContext, TaskEvent, TaskRunner};

/// Runs OCR over every page of a document in parallel.
///
/// Emits a [`TaskEvent::PageComplete`] per page as pages finish, then a
/// single [`TaskEvent::TaskComplete`] with all lines in page order.
#[derive(Clone)]
pub struct PageOcrCoordinator {
    engine: Arc<dyn OcrEngine>,
    ocr: OcrConfig,
    crop: Option<CropRegion>,
}

impl PageOcrCoordinator {
    pub fn new(engine: Arc<dyn OcrEngine>, config: &KsiegiConfig) -> Self {
        Self::with_settings(engine, config.ocr.clone(), config.pages.crop)
    }

    pub fn with_settings(engine: Arc<dyn OcrEngine>, ocr: OcrConfig, crop: Option<CropRegion>) -> Self {
        Self { engine, ocr, crop }
    }

    /// Start [`PageOcrCoordinator::process_document`] on `runner`.
    pub fn spawn(&self, runner: &mut TaskRunner, pages: Vec<DynamicImage>) -> Result<()> {
        let coordinator = self.clone();
        runner.start("pages", move |ctx| coordinator.process_document(ctx, pages))
    }

    /// Start [`PageOcrCoordinator::process_file`] on `runner`.
    pub fn spawn_file<R>(&self, runner: &mut TaskRunner, raster: R, path: &Path, dpi: u32) -> Result<()>
    where
        R: RasterSource + 'static,
    {
        let coordinator = self.clone();
        let path = path.to_path_buf();
        runner.start("pages", move |ctx| {
            coordinator.process_file(ctx, &raster, &path, dpi)
        })
    }

    /// Rasterize a document, then process its pages.
    pub fn process_file(
        &self,
        ctx: &TaskContext,
        raster: &dyn RasterSource,
        path: &Path,
        dpi: u32,
    ) -> Result<()> {
        ctx.progress("Loading document pages...");
        let pages = raster.rasterize(path, dpi)?;
        info!("Loaded {} pages from {}", pages.len(), path.display());
        ctx.check_cancelled()?;
        self.process_document(ctx, pages)
    }

    /// OCR every page, reporting pages in completion order.
    pub fn process_document(&self, ctx: &TaskContext, pages: Vec<DynamicImage>) -> Result<()> {
        let total = pages.len();
        ctx.progress(format!("Processing {} pages...", total));

        let images: Vec<DynamicImage> = pages.into_iter().map(|p| self.prepare(p)).collect();
        let dispatcher = OcrDispatcher::new(
            ctx,
            Arc::clone(&self.engine),
            &self.ocr.page_language,
            &self.ocr,
            total,
        );

        let mut results: Vec<PageResult> = Vec::with_capacity(total);
        let mut failed_pages = Vec::new();
        let mut completed = 0;

        dispatcher.run(images, |i, outcome| {
            ctx.check_cancelled()?;
            completed += 1;
            let page = i + 1;

            match outcome {
                Ok(text) => {
                    let result = PageResult::from_text(page, text);
                    debug!("Page {}: {} lines", page, result.line_count());
                    ctx.emit(TaskEvent::PageComplete(result.clone()));
                    ctx.progress(format!("Completed OCR of page {}/{}", completed, total));
                    results.push(result);
                }
                Err(e) => {
                    warn!("OCR failed for page {}: {}", page, e);
                    ctx.progress(format!("Page {} failed: {}", page, e));
                    failed_pages.push(page);
                }
            }
            Ok(())
        })?;

        ctx.check_cancelled()?;

        results.sort_by_key(|r| r.page);
        failed_pages.sort_unstable();
        let lines: Vec<PageLine> = results.into_iter().flat_map(|r| r.lines).collect();

        info!(
            "OCR finished: {} lines from {} pages ({} failed)",
            lines.len(),
            total,
            failed_pages.len()
        );
        ctx.progress(format!("OCR finished: {} lines from {} pages", lines.len(), total));
        ctx.emit(TaskEvent::TaskComplete {
            total_lines: lines.len(),
            total_pages: total,
            failed_pages,
            lines,
        });
        Ok(())
    }

    /// Cut the configured region out of a page.
    fn prepare(&self, page: DynamicImage) -> DynamicImage {
        let Some(crop) = self.crop else {
            return page;
        };

        let width = crop.right.saturating_sub(crop.left);
        let height = crop.bottom.saturating_sub(crop.top);
        match crop_region(&page, crop.left, crop.top, width, height) {
            Some(region) => region,
            None => {
                debug!(
                    "Crop region outside {}x{} page, using whole page",
                    page.width(),
                    page.height()
                );
                page
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr;
    use pretty_assertions::assert_eq;

    struct WidthEngine;

    impl OcrEngine for WidthEngine {
        fn name(&self) -> &'static str {
            "width"
        }

        fn recognize(&self, image: &DynamicImage, _language: &str) -> ocr::Result<String> {
            Ok(format!("w={}", image.width()))
        }
    }

    #[test]
    fn test_crop_applied_and_clamped() {
        let coordinator = PageOcrCoordinator::with_settings(
            Arc::new(WidthEngine),
            OcrConfig::default(),
            Some(CropRegion {
                left: 10,
                top: 0,
                right: 30,
                bottom: 10,
            }),
        );

        assert_eq!(coordinator.prepare(DynamicImage::new_luma8(100, 50)).width(), 20);
        assert_eq!(coordinator.prepare(DynamicImage::new_luma8(25, 50)).width(), 15);
        assert_eq!(coordinator.prepare(DynamicImage::new_luma8(5, 50)).width(), 5);
    }

    #[test]
    fn test_no_crop_keeps_page() {
        let coordinator =
            PageOcrCoordinator::with_settings(Arc::new(WidthEngine), OcrConfig::default(), None);
        assert_eq!(coordinator.prepare(DynamicImage::new_luma8(100, 50)).width(), 100);
    }

    #[test]
    fn test_zero_pages_completes_empty() {
        let coordinator =
            PageOcrCoordinator::with_settings(Arc::new(WidthEngine), OcrConfig::default(), None);
        let mut runner = TaskRunner::new();
        coordinator.spawn(&mut runner, Vec::new()).unwrap();
        runner.join().unwrap();

        assert_eq!(
            runner.drain_results(),
            vec![TaskEvent::TaskComplete {
                lines: Vec::new(),
                total_lines: 0,
                total_pages: 0,
                failed_pages: Vec::new(),
            }]
        );
        assert_eq!(runner.drain_progress()[0], "Processing 0 pages...");
    }
}
