use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::Result;
use super::writer::write_comparison;
use crate::error::PersistError;
use crate::models::ComparisonRow;

/// Delimiters tried, in order of preference.
const CANDIDATE_DELIMITERS: [u8; 4] = [b';', b',', b'\t', b'|'];

/// Rows sampled when detecting the delimiter.
const SAMPLE_ROWS: usize = 10;

/// Which column of each file is compared.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Zero-based column position.
    pub column: usize,
    /// Drop the first row of each file.
    pub skip_header: bool,
}

/// Compare the target column of two files row by row and save the result.
pub fn compare_files(
    path_a: &Path,
    path_b: &Path,
    output: &Path,
    options: &CompareOptions,
) -> Result<Vec<ComparisonRow>> {
    let a = read_column(path_a, options)?;
    let b = read_column(path_b, options)?;

    let len = a.len().max(b.len());
    let rows: Vec<ComparisonRow> = (0..len)
        .map(|i| {
            ComparisonRow::classify(
                i + 1,
                a.get(i).cloned().unwrap_or_default(),
                b.get(i).cloned().unwrap_or_default(),
            )
        })
        .collect();

    write_comparison(&rows, output)?;
    info!(
        "Compared {} rows ({} vs {})",
        rows.len(),
        path_a.display(),
        path_b.display()
    );
    Ok(rows)
}

/// Values of the target column of a delimited file.
///
/// Rows too short for the column read as empty strings; a file where no
/// row reaches the column is an error.
pub fn read_column(path: &Path, options: &CompareOptions) -> Result<Vec<String>> {
    let name = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| PersistError::Unreadable {
        path: name.clone(),
        source,
    })?;
    let text = raw.trim_start_matches('\u{feff}');

    if text.trim().is_empty() {
        return Err(PersistError::EmptyFile(name));
    }

    // `None` marks a row too short to hold the target column
    let mut values: Vec<Option<String>> = match detect_delimiter(text) {
        Some(delimiter) => {
            debug!("{}: delimiter {:?}", name, delimiter as char);
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .has_headers(false)
                .flexible(true)
                .from_reader(text.as_bytes());

            rdr.records()
                .map(|r| r.map(|record| record.get(options.column).map(|v| v.trim().to_string())))
                .collect::<std::result::Result<_, csv::Error>>()?
        }
        None => {
            debug!("{}: no consistent delimiter, reading as one column", name);
            text.lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| (options.column == 0).then(|| l.trim().to_string()))
                .collect()
        }
    };

    if options.skip_header && !values.is_empty() {
        values.remove(0);
    }
    if values.is_empty() {
        return Err(PersistError::NoRows(name));
    }
    if values.iter().all(Option::is_none) {
        return Err(PersistError::MissingColumn {
            path: name,
            column: options.column,
        });
    }

    Ok(values.into_iter().map(Option::unwrap_or_default).collect())
}

/// First candidate that splits every sampled row into the same number of
/// fields (more than one).
pub fn detect_delimiter(text: &str) -> Option<u8> {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SAMPLE_ROWS)
        .collect();

    CANDIDATE_DELIMITERS.into_iter().find(|&delimiter| {
        let mut counts = sample.iter().map(|line| field_count(line, delimiter));
        match counts.next() {
            Some(first) if first > 1 => counts.all(|c| c == first),
            _ => false,
        }
    })
}

fn field_count(line: &str, delimiter: u8) -> usize {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    match rdr.records().next() {
        Some(Ok(record)) => record.len(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComparisonStatus;
    use pretty_assertions::assert_eq;

    fn file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3\n"), Some(b';'));
        assert_eq!(detect_delimiter("a,b\n1,2\n"), Some(b','));
        assert_eq!(detect_delimiter("a\tb\n1\t2\n"), Some(b'\t'));
        // inconsistent counts fall through to the next candidate
        assert_eq!(detect_delimiter("a;b|x\nc|y\n"), Some(b'|'));
        assert_eq!(detect_delimiter("F/1/24\nF/2/24\n"), None);
    }

    #[test]
    fn test_quoted_delimiter_not_counted() {
        assert_eq!(detect_delimiter("\"a,b\";c\n\"d,e\";f\n"), Some(b';'));
    }

    #[test]
    fn test_missing_in_b() {
        let dir = tempfile::tempdir().unwrap();
        let a = file(&dir, "a.csv", "F/1/24\nF/2/24\n");
        let b = file(&dir, "b.csv", "F/1/24\n");
        let out = dir.path().join("porownanie.csv");

        let rows = compare_files(&a, &b, &out, &CompareOptions::default()).unwrap();

        assert_eq!(
            rows,
            vec![
                ComparisonRow {
                    row: 1,
                    value_a: "F/1/24".to_string(),
                    value_b: "F/1/24".to_string(),
                    status: ComparisonStatus::Identical,
                },
                ComparisonRow {
                    row: 2,
                    value_a: "F/2/24".to_string(),
                    value_b: String::new(),
                    status: ComparisonStatus::MissingInB,
                },
            ]
        );
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "row;value_A;value_B;status\n1;F/1/24;F/1/24;identical\n2;F/2/24;;missing-in-B\n"
        );
    }

    #[test]
    fn test_column_and_header_with_mixed_delimiters() {
        let dir = tempfile::tempdir().unwrap();
        let a = file(&dir, "a.csv", "page;line;record\n1;2;f/1/24\n1;5;X/9\n");
        let b = file(&dir, "b.csv", "id,number\n7,F/1/24\n8,X/8\n9,Z/1\n");
        let out = dir.path().join("out.csv");

        let rows_a = read_column(&a, &CompareOptions { column: 2, skip_header: true }).unwrap();
        assert_eq!(rows_a, vec!["f/1/24".to_string(), "X/9".to_string()]);

        let opts_b = CompareOptions { column: 1, skip_header: true };
        let rows_b = read_column(&b, &opts_b).unwrap();
        assert_eq!(rows_b.len(), 3);

        // same column index for both files: column 1 of A is the line number
        let rows = compare_files(&a, &b, &out, &opts_b).unwrap();
        let statuses: Vec<ComparisonStatus> = rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                ComparisonStatus::Different,
                ComparisonStatus::Different,
                ComparisonStatus::MissingInA,
            ]
        );
    }

    #[test]
    fn test_case_insensitive_identical() {
        let dir = tempfile::tempdir().unwrap();
        let a = file(&dir, "a.txt", "fv/1/2024\n");
        let b = file(&dir, "b.txt", "FV/1/2024\n");
        let rows = compare_files(&a, &b, &dir.path().join("o.csv"), &CompareOptions::default()).unwrap();
        assert_eq!(rows[0].status, ComparisonStatus::Identical);
    }

    #[test]
    fn test_empty_and_missing_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let empty = file(&dir, "empty.csv", "  \n\n");
        let header_only = file(&dir, "header.csv", "record\n");
        let missing = dir.path().join("missing.csv");
        let opts = CompareOptions::default();

        assert!(matches!(read_column(&empty, &opts), Err(PersistError::EmptyFile(_))));
        assert!(matches!(read_column(&missing, &opts), Err(PersistError::Unreadable { .. })));
        assert!(matches!(
            read_column(&header_only, &CompareOptions { column: 0, skip_header: true }),
            Err(PersistError::NoRows(_))
        ));

        let out = dir.path().join("out.csv");
        assert!(compare_files(&empty, &header_only, &out, &opts).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_column_out_of_range_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = file(&dir, "a.txt", "F/1/24\nF/2/24\n");
        let b = file(&dir, "b.txt", "X/9/99\n");
        let c = file(&dir, "c.csv", "a;b\n1;2\n");
        let out = dir.path().join("out.csv");
        let opts = CompareOptions { column: 2, skip_header: false };

        assert!(matches!(
            read_column(&a, &opts),
            Err(PersistError::MissingColumn { column: 2, .. })
        ));
        assert!(matches!(
            read_column(&c, &opts),
            Err(PersistError::MissingColumn { column: 2, .. })
        ));
        assert!(compare_files(&a, &b, &out, &opts).is_err());
        assert!(!out.exists());
    }
}
