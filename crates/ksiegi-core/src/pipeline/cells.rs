//! Per-cell OCR of one segmented page.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, trace, warn};

use super::dispatch::OcrDispatcher;
use crate::error::Result;
use crate::invoice::RecordValidator;
use crate::models::config::{CellConfig, KsiegiConfig, OcrConfig};
use crate::models::{Cell, CellResult};
use crate::ocr::{CellSegmenter, OcrEngine, crop_region};
use crate::task::{TaskContext, TaskEvent, TaskRunner};

/// Runs OCR over the cells of a page in fixed-size batches.
///
/// Accepted cells are reported as they are recognized; the run ends with
/// [`TaskEvent::AllCellsComplete`].
#[derive(Clone)]
pub struct CellOcrBatcher {
    engine: Arc<dyn OcrEngine>,
    ocr: OcrConfig,
    cells: CellConfig,
    validator: RecordValidator,
}

impl CellOcrBatcher {
    pub fn new(engine: Arc<dyn OcrEngine>, config: &KsiegiConfig) -> Self {
        Self::with_settings(
            engine,
            config.ocr.clone(),
            config.cells.clone(),
            RecordValidator::new(config.validation.cell_mode),
        )
    }

    pub fn with_settings(
        engine: Arc<dyn OcrEngine>,
        ocr: OcrConfig,
        cells: CellConfig,
        validator: RecordValidator,
    ) -> Self {
        Self {
            engine,
            ocr,
            cells,
            validator,
        }
    }

    /// Start [`CellOcrBatcher::process_cells`] on `runner`.
    pub fn spawn(&self, runner: &mut TaskRunner, cells: Vec<Cell>, page: DynamicImage) -> Result<()> {
        let batcher = self.clone();
        runner.start("cells", move |ctx| batcher.process_cells(ctx, &cells, &page))
    }

    /// Start [`CellOcrBatcher::process_page`] on `runner`.
    pub fn spawn_page(
        &self,
        runner: &mut TaskRunner,
        segmenter: CellSegmenter,
        page: DynamicImage,
    ) -> Result<()> {
        let batcher = self.clone();
        runner.start("cells", move |ctx| batcher.process_page(ctx, &segmenter, &page))
    }

    /// Segment a page, then OCR its cells.
    pub fn process_page(
        &self,
        ctx: &TaskContext,
        segmenter: &CellSegmenter,
        page: &DynamicImage,
    ) -> Result<()> {
        ctx.progress("Detecting table cells...");
        let cells = segmenter.segment(page);
        info!("Detected {} cells", cells.len());
        ctx.check_cancelled()?;
        self.process_cells(ctx, &cells, page)
    }

    /// OCR every cell inside the column window and report the accepted ones.
    pub fn process_cells(&self, ctx: &TaskContext, cells: &[Cell], page: &DynamicImage) -> Result<()> {
        let total = cells.len();
        let batch_size = self.cells.batch_size.max(1);
        ctx.progress(format!("Processing {} cells...", total));

        let dispatcher = OcrDispatcher::new(
            ctx,
            Arc::clone(&self.engine),
            &self.ocr.cell_language,
            &self.ocr,
            total.min(batch_size),
        );

        let mut processed = 0;
        let mut accepted = 0;

        for batch in cells.chunks(batch_size) {
            ctx.check_cancelled()?;

            let mut regions = Vec::with_capacity(batch.len());
            let mut owners = Vec::with_capacity(batch.len());
            for cell in batch {
                match self.extract(cell, page) {
                    Some(region) => {
                        regions.push(region);
                        owners.push(*cell);
                    }
                    None => {
                        processed += 1;
                        self.report(ctx, processed, total);
                    }
                }
            }

            dispatcher.run(regions, |i, outcome| {
                ctx.check_cancelled()?;
                processed += 1;
                let cell = &owners[i];

                match outcome {
                    Ok(text) => {
                        if let Some(result) = self.accept(cell, &text) {
                            accepted += 1;
                            ctx.emit(TaskEvent::CellResult(result));
                        }
                    }
                    Err(e) => warn!("OCR failed for cell at ({}, {}): {}", cell.x, cell.y, e),
                }

                self.report(ctx, processed, total);
                Ok(())
            })?;
        }

        ctx.check_cancelled()?;

        info!("Processed {} cells, {} accepted", processed, accepted);
        ctx.emit(TaskEvent::AllCellsComplete { processed });
        Ok(())
    }

    /// Region of a cell worth sending to the engine.
    fn extract(&self, cell: &Cell, page: &DynamicImage) -> Option<DynamicImage> {
        if cell.x < self.cells.x_min || cell.x > self.cells.x_max {
            trace!("Cell at x={} outside column window", cell.x);
            return None;
        }
        if cell.area() < self.cells.min_region_pixels {
            return None;
        }

        let region = crop_region(page, cell.x, cell.y, cell.width, cell.height)?;
        let (w, h) = region.dimensions();
        if (w as u64 * h as u64) < self.cells.min_region_pixels {
            debug!("Cell at ({}, {}) degenerate after clamping", cell.x, cell.y);
            return None;
        }
        Some(region)
    }

    /// Trim, apply the length floor, then validate.
    fn accept(&self, cell: &Cell, text: &str) -> Option<CellResult> {
        let text = text.trim();
        if text.chars().count() < self.cells.min_text_len {
            return None;
        }
        CellResult::accept(cell, text, &self.validator)
    }

    fn report(&self, ctx: &TaskContext, processed: usize, total: usize) {
        let every = self.cells.progress_every.max(1);
        if processed % every == 0 || processed == total {
            ctx.progress(format!("Processed {}/{} cells", processed, total));
        }
    }
}
