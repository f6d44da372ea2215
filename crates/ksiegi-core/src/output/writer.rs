use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::{DELIMITER, Result};
use crate::error::PersistError;
use crate::models::{CellResult, ComparisonRow, PageLine, Record};

/// Header of the records file.
pub const RECORDS_HEADER: [&str; 3] = ["page", "line", "record"];

/// Header of the comparison file.
pub const COMPARISON_HEADER: [&str; 4] = ["row", "value_A", "value_B", "status"];

/// Write records as `page;line;record` rows in a single write.
pub fn write_records(records: &[Record], path: &Path) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(vec![]);

    wtr.write_record(RECORDS_HEADER)?;
    for record in records {
        wtr.write_record([
            record.page().to_string(),
            record.index().to_string(),
            record.text().to_string(),
        ])?;
    }

    write_buffer(path, finish(wtr, path)?)?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Write comparison rows as `row;value_A;value_B;status`.
pub fn write_comparison(rows: &[ComparisonRow], path: &Path) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(vec![]);

    wtr.write_record(COMPARISON_HEADER)?;
    for row in rows {
        wtr.write_record([
            row.row.to_string().as_str(),
            row.value_a.as_str(),
            row.value_b.as_str(),
            row.status.as_str(),
        ])?;
    }

    write_buffer(path, finish(wtr, path)?)?;
    debug!("Wrote {} comparison rows to {}", rows.len(), path.display());
    Ok(())
}

/// Overwrite the raw OCR log with every recognized line.
pub fn write_ocr_log(lines: &[PageLine], path: &Path) -> Result<()> {
    let pages = lines.iter().map(|l| l.page).max().unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "=== OCR LOG ===");
    let _ = writeln!(out, "Timestamp: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Total pages processed: {}", pages);
    let _ = writeln!(out, "Total lines: {}", lines.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "--- RAW OCR OUTPUT ---");
    for line in lines {
        let _ = writeln!(out, "Page {}: {}", line.page, line.text);
    }

    write_buffer(path, out.into_bytes())?;
    debug!("Wrote OCR log with {} lines to {}", lines.len(), path.display());
    Ok(())
}

/// Write one `x=.. y=.. → text` line per accepted cell.
pub fn write_cell_dump(cells: &[CellResult], path: &Path) -> Result<()> {
    let mut out = String::new();
    for cell in cells {
        let _ = writeln!(out, "x={} y={} → {}", cell.x(), cell.y(), cell.text());
    }

    write_buffer(path, out.into_bytes())?;
    debug!("Wrote {} cells to {}", cells.len(), path.display());
    Ok(())
}

fn finish(wtr: csv::Writer<Vec<u8>>, path: &Path) -> Result<Vec<u8>> {
    wtr.into_inner().map_err(|e| PersistError::Write {
        path: path.display().to_string(),
        source: e.into_error(),
    })
}

/// Create the parent directory, then write the whole buffer at once.
fn write_buffer(path: &Path, data: Vec<u8>) -> Result<()> {
    let wrap = |source: std::io::Error| PersistError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, data).map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::RecordValidator;
    use crate::models::Cell;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odczyty").join("zakupy.csv");
        let validator = RecordValidator::default();
        let records: Vec<Record> = [(1, 2, "F/1/24"), (3, 9, "12/2024")]
            .into_iter()
            .filter_map(|(p, i, t)| Record::new(p, i, t, &validator))
            .collect();

        write_records(&records, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "page;line;record\n1;2;F/1/24\n3;9;12/2024\n");
    }

    #[test]
    fn test_write_ocr_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr_log.txt");
        let lines = vec![
            PageLine {
                page: 1,
                text: "a".to_string(),
            },
            PageLine {
                page: 3,
                text: "b".to_string(),
            },
        ];

        write_ocr_log(&lines, &path).unwrap();
        write_ocr_log(&lines, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("=== OCR LOG ===").count(), 1);
        assert!(content.contains("Total pages processed: 3\n"));
        assert!(content.contains("Total lines: 2\n"));
        assert!(content.ends_with("Page 1: a\nPage 3: b\n"));
    }

    #[test]
    fn test_write_cell_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("komorki.txt");
        let validator = RecordValidator::default();
        let cells: Vec<CellResult> = CellResult::accept(&Cell::new(120, 40, 10, 10), "F/1/24", &validator)
            .into_iter()
            .collect();

        write_cell_dump(&cells, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x=120 y=40 → F/1/24\n");
    }
}
