//! Result files: records CSV, OCR log, cell dump and file comparison.

mod compare;
mod writer;

pub use compare::{CompareOptions, compare_files, detect_delimiter, read_column};
pub use writer::{
    COMPARISON_HEADER, RECORDS_HEADER, write_cell_dump, write_comparison, write_ocr_log,
    write_records,
};

use std::path::{Path, PathBuf};

use crate::error::PersistError;
use crate::models::config::OutputConfig;
use crate::models::{CellResult, ComparisonRow, PageLine, Record};

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, PersistError>;

/// Field delimiter of every file this crate writes.
pub const DELIMITER: u8 = b';';

/// Writes result files under the configured output directory.
#[derive(Debug, Clone, Default)]
pub struct ResultPersister {
    output: OutputConfig,
}

impl ResultPersister {
    pub fn new(output: OutputConfig) -> Self {
        Self { output }
    }

    pub fn records_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.records_file)
    }

    pub fn comparison_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.comparison_file)
    }

    pub fn ocr_log_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.ocr_log_file)
    }

    pub fn cells_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.cells_file)
    }

    /// Write the records file; returns its path.
    pub fn save_records(&self, records: &[Record]) -> Result<PathBuf> {
        let path = self.records_path();
        write_records(records, &path)?;
        Ok(path)
    }

    /// Overwrite the OCR log; returns its path.
    pub fn save_ocr_log(&self, lines: &[PageLine]) -> Result<PathBuf> {
        let path = self.ocr_log_path();
        write_ocr_log(lines, &path)?;
        Ok(path)
    }

    /// Write the cell dump; returns its path.
    pub fn save_cells(&self, cells: &[CellResult]) -> Result<PathBuf> {
        let path = self.cells_path();
        write_cell_dump(cells, &path)?;
        Ok(path)
    }

    /// Compare two files, writing to `output` or the configured comparison file.
    pub fn compare(
        &self,
        path_a: &Path,
        path_b: &Path,
        output: Option<&Path>,
        options: &CompareOptions,
    ) -> Result<(Vec<ComparisonRow>, PathBuf)> {
        let out = output.map(Path::to_path_buf).unwrap_or_else(|| self.comparison_path());
        let rows = compare_files(path_a, path_b, &out, options)?;
        Ok((rows, out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paths_follow_config() {
        let persister = ResultPersister::new(OutputConfig {
            dir: PathBuf::from("out"),
            ..OutputConfig::default()
        });
        assert_eq!(persister.records_path(), PathBuf::from("out/zakupy.csv"));
        assert_eq!(persister.cells_path(), PathBuf::from("out/komorki.txt"));
    }

    #[test]
    fn test_compare_defaults_to_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, "X/1\n").unwrap();
        std::fs::write(&b, "X/2\n").unwrap();

        let persister = ResultPersister::new(OutputConfig {
            dir: dir.path().join("odczyty"),
            ..OutputConfig::default()
        });
        let (rows, out) = persister.compare(&a, &b, None, &CompareOptions::default()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(out, dir.path().join("odczyty").join("porownanie.csv"));
        assert!(out.exists());
    }
}
