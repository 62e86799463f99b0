//! Reading uploaded broker files into raw rows.

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// One data row as read from the file: column header -> raw cell text.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ImportFileError {
    #[error("Invalid file type. Please upload in .csv")]
    UnsupportedFileType,
    #[error("csv parse error: {0}")]
    Csv(String),
}

/// Check that an upload is a `.csv` file by its name.
pub fn ensure_csv_file_name(file_name: &str) -> Result<(), ImportFileError> {
    let is_csv = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        Ok(())
    } else {
        Err(ImportFileError::UnsupportedFileType)
    }
}

/// Pick the field delimiter from the header line: `;` when it outnumbers `,`.
pub fn detect_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes
        .split(|b| *b == b'\n')
        .find(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .unwrap_or(&[]);
    let semicolons = header.iter().filter(|b| **b == b';').count();
    let commas = header.iter().filter(|b| **b == b',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Parse a delimited file with a header row into raw rows.
///
/// Cells are trimmed. Short rows simply lack the missing columns; extra
/// cells without a header are dropped.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RawRow>, ImportFileError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(detect_delimiter(bytes))
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportFileError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportFileError::Csv(e.to_string()))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Validate the file name, then parse the file.
pub fn read_csv_upload(file_name: &str, bytes: &[u8]) -> Result<Vec<RawRow>, ImportFileError> {
    ensure_csv_file_name(file_name)?;
    parse_csv(bytes)
}
