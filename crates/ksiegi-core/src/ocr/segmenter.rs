//! Table cell segmentation from ruling lines.
//!
//! Finds the grid of a scanned ledger table with morphological line
//! extraction and returns the bounding boxes of its outer contours in
//! reading order. Segmentation is a pure function of the page image; OCR
//! happens afterwards on the returned cells.

use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::geometry::contour_area;
use tracing::debug;

use super::preprocessing::{Axis, binarize_inverse, blur_3x3, line_opening, union};
use crate::models::Cell;
use crate::models::config::SegmenterConfig;

/// Detects candidate table cells in a page image.
#[derive(Debug, Clone, Default)]
pub struct CellSegmenter {
    config: SegmenterConfig,
}

impl CellSegmenter {
    /// Create a segmenter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a segmenter with explicit settings.
    pub fn with_config(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Detect cells on a page.
    ///
    /// A page without grid lines yields an empty list.
    pub fn segment(&self, page: &DynamicImage) -> Vec<Cell> {
        let mask = self.grid_mask(&page.to_luma8());
        let contours: Vec<Contour<i32>> = find_contours(&mask);

        let mut cells: Vec<Cell> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| contour_area(&c.points) > self.config.min_area)
            .filter_map(bounding_box)
            .collect();

        cells.sort_by_key(|c| (c.y, c.x));

        debug!(
            "Segmented {} cells from {} contours",
            cells.len(),
            contours.len()
        );

        cells
    }

    /// Binary mask holding only the horizontal and vertical rulings.
    pub fn grid_mask(&self, gray: &GrayImage) -> GrayImage {
        let blurred = blur_3x3(gray);
        let ink = binarize_inverse(&blurred, self.config.threshold);

        let vertical = line_opening(&ink, self.config.line_length, Axis::Vertical);
        let horizontal = line_opening(&ink, self.config.line_length, Axis::Horizontal);

        union(&vertical, &horizontal)
    }
}

/// Axis-aligned pixel bounding box of a contour.
fn bounding_box(contour: &Contour<i32>) -> Option<Cell> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(Cell::new(
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}
