//! Data carried between the segmenter, the OCR pipelines and the output files.

use serde::{Deserialize, Serialize};

use crate::invoice::RecordValidator;

/// One non-empty, trimmed line of OCR output tied to the page it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLine {
    /// Page index (1-based).
    pub page: usize,
    /// Trimmed line text.
    pub text: String,
}

/// OCR output for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// Page index (1-based).
    pub page: usize,
    /// Raw text as returned by the engine.
    pub text: String,
    /// Non-empty trimmed lines, in engine order.
    pub lines: Vec<PageLine>,
}

impl PageResult {
    /// Build a page result from raw engine output.
    pub fn from_text(page: usize, text: String) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| PageLine {
                page,
                text: l.to_string(),
            })
            .collect();

        Self { page, text, lines }
    }

    /// Number of derived lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// A candidate table cell in page-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Cell {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Pixel count of the box.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A cell whose recognized text passed validation.
///
/// Only constructible through [`CellResult::accept`], so a value of this
/// type always carries validated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellResult {
    x: u32,
    y: u32,
    text: String,
}

impl CellResult {
    /// Validate `text` and wrap it with the cell origin on acceptance.
    pub fn accept(cell: &Cell, text: &str, validator: &RecordValidator) -> Option<Self> {
        validator.is_plausible_record(text).then(|| Self {
            x: cell.x,
            y: cell.y,
            text: text.to_string(),
        })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A line accepted as a plausible invoice/document number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    page: usize,
    index: usize,
    text: String,
}

impl Record {
    /// Create a record, re-validating `text` with `validator`.
    ///
    /// Returns `None` when the text is not a plausible record number,
    /// regardless of where it came from.
    pub fn new(
        page: usize,
        index: usize,
        text: impl Into<String>,
        validator: &RecordValidator,
    ) -> Option<Self> {
        let text = text.into();
        validator.is_plausible_record(&text).then_some(Self { page, index, text })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Running 1-based line number across the whole document.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Outcome of comparing one row position of two result files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonStatus {
    Identical,
    Different,
    MissingInA,
    MissingInB,
}

impl ComparisonStatus {
    /// Label written to the comparison file.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonStatus::Identical => "identical",
            ComparisonStatus::Different => "different",
            ComparisonStatus::MissingInA => "missing-in-A",
            ComparisonStatus::MissingInB => "missing-in-B",
        }
    }
}

impl std::fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a file comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    /// Row index (1-based).
    pub row: usize,
    pub value_a: String,
    pub value_b: String,
    pub status: ComparisonStatus,
}

impl ComparisonRow {
    /// Classify a pair of values by presence, then case-insensitive equality.
    pub fn classify(row: usize, value_a: String, value_b: String) -> Self {
        let a = value_a.trim();
        let b = value_b.trim();

        let status = match (a.is_empty(), b.is_empty()) {
            (true, true) => ComparisonStatus::Identical,
            (true, false) => ComparisonStatus::MissingInA,
            (false, true) => ComparisonStatus::MissingInB,
            (false, false) if a.to_lowercase() == b.to_lowercase() => ComparisonStatus::Identical,
            (false, false) => ComparisonStatus::Different,
        };

        Self {
            row,
            value_a,
            value_b,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::ValidationMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_result_lines() {
        let result = PageResult::from_text(2, "  F/1/24 \n\n   \nabc\n".to_string());
        assert_eq!(
            result.lines,
            vec![
                PageLine { page: 2, text: "F/1/24".to_string() },
                PageLine { page: 2, text: "abc".to_string() },
            ]
        );
    }

    #[test]
    fn test_blank_page_has_no_lines() {
        let result = PageResult::from_text(3, "\n \n".to_string());
        assert_eq!(result.line_count(), 0);
    }

    #[test]
    fn test_record_revalidates() {
        let validator = RecordValidator::new(ValidationMode::Loose);
        assert!(Record::new(1, 1, "F/123/2024", &validator).is_some());
        assert!(Record::new(1, 2, "sprzedaż 12/2024", &validator).is_none());
    }

    #[test]
    fn test_cell_result_requires_validation() {
        let validator = RecordValidator::new(ValidationMode::Strict);
        let cell = Cell::new(150, 40, 200, 30);
        let accepted = CellResult::accept(&cell, "F/12345/01/02/M1", &validator).unwrap();
        assert_eq!((accepted.x(), accepted.y()), (150, 40));
        assert!(CellResult::accept(&cell, "Razem", &validator).is_none());
    }

    #[test]
    fn test_comparison_classify() {
        let row = ComparisonRow::classify(1, "F/1/24".into(), "f/1/24".into());
        assert_eq!(row.status, ComparisonStatus::Identical);
        let row = ComparisonRow::classify(2, "F/2/24".into(), String::new());
        assert_eq!(row.status, ComparisonStatus::MissingInB);
        let row = ComparisonRow::classify(3, String::new(), "F/3/24".into());
        assert_eq!(row.status, ComparisonStatus::MissingInA);
        let row = ComparisonRow::classify(4, "F/4/24".into(), "F/5/24".into());
        assert_eq!(row.status, ComparisonStatus::Different);
    }
}
