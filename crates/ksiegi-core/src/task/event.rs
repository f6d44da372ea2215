use serde::Serialize;

use crate::models::{CellResult, PageLine, PageResult};

/// Result-queue payload of a background task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// One page finished OCR.
    PageComplete(PageResult),

    /// Every page of a document was processed.
    TaskComplete {
        /// All page lines, ordered by page.
        lines: Vec<PageLine>,
        total_lines: usize,
        total_pages: usize,
        /// Pages whose OCR failed (1-based).
        failed_pages: Vec<usize>,
    },

    /// A cell's text passed validation.
    CellResult(CellResult),

    /// Every cell of a page was processed.
    AllCellsComplete { processed: usize },

    /// The operation as a whole failed.
    Error { message: String },

    /// The operation stopped after a cancellation request.
    Cancelled,
}

impl TaskEvent {
    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::TaskComplete { .. }
                | TaskEvent::AllCellsComplete { .. }
                | TaskEvent::Error { .. }
                | TaskEvent::Cancelled
        )
    }

    /// Tag of the event as used in its serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskEvent::PageComplete(_) => "page_complete",
            TaskEvent::TaskComplete { .. } => "task_complete",
            TaskEvent::CellResult(_) => "cell_result",
            TaskEvent::AllCellsComplete { .. } => "all_cells_complete",
            TaskEvent::Error { .. } => "error",
            TaskEvent::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_terminal_events() {
        assert!(TaskEvent::Cancelled.is_terminal());
        assert!(TaskEvent::AllCellsComplete { processed: 3 }.is_terminal());
        assert!(!TaskEvent::PageComplete(PageResult::from_text(1, String::new())).is_terminal());
    }

    #[test]
    fn test_serialized_tag_matches_kind() {
        let events = vec![
            TaskEvent::PageComplete(PageResult::from_text(2, "a\n\nb".to_string())),
            TaskEvent::AllCellsComplete { processed: 4 },
            TaskEvent::Error {
                message: "boom".to_string(),
            },
            TaskEvent::Cancelled,
        ];

        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.kind());
        }
    }
}
