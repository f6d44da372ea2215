//! Turning aggregated page lines into records.

use tracing::debug;

use super::RecordValidator;
use crate::models::{PageLine, Record};

/// Strip leading whitespace and a single leading `|` picked up from table rulings.
pub fn clean_record_text(text: &str) -> &str {
    let cleaned = text.trim_start();
    let cleaned = cleaned.strip_prefix('|').unwrap_or(cleaned);
    cleaned.trim()
}

/// Filter lines into records.
///
/// `lines` are expected in page order. Every line advances the running
/// line number, accepted or not, so record indices point back at the raw
/// OCR output.
pub fn extract_records(lines: &[PageLine], validator: &RecordValidator) -> Vec<Record> {
    let records: Vec<Record> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            Record::new(line.page, i + 1, clean_record_text(&line.text), validator)
        })
        .collect();

    debug!(
        "Accepted {} of {} lines as records ({:?} mode)",
        records.len(),
        lines.len(),
        validator.mode()
    );

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::ValidationMode;
    use pretty_assertions::assert_eq;

    fn line(page: usize, text: &str) -> PageLine {
        PageLine {
            page,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_clean_record_text() {
        assert_eq!(clean_record_text("  | F/1/24 "), "F/1/24");
        assert_eq!(clean_record_text("F/1/24"), "F/1/24");
        assert_eq!(clean_record_text("||x"), "|x");
    }

    #[test]
    fn test_extract_records_keeps_running_index() {
        let lines = vec![
            line(1, "Numer faktury"),
            line(1, "| F/100/2024"),
            line(2, "usług 1/2/3"),
            line(2, "12345/01/2024/UP"),
        ];

        let records = extract_records(&lines, &RecordValidator::new(ValidationMode::Loose));

        let got: Vec<(usize, usize, &str)> =
            records.iter().map(|r| (r.page(), r.index(), r.text())).collect();
        assert_eq!(got, vec![(1, 2, "F/100/2024"), (2, 4, "12345/01/2024/UP")]);
    }
}
