//! File ingestion: uploaded bytes to a [`RawTable`].
//!
//! The format is chosen solely by filename extension - `.csv` goes through
//! the delimiter/encoding auto-detecting CSV path, `.xlsx`/`.xls` through
//! calamine. No content sniffing.

use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

use crate::error::{IngestError, IngestResult};
use crate::table::RawTable;

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma/semicolon/tab separated text.
    Csv,
    /// Spreadsheet workbook.
    Xlsx,
}

/// A parsed upload, with the detection metadata surfaced to callers.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    /// The parsed table.
    pub table: RawTable,
    /// Format chosen from the filename.
    pub format: FileFormat,
    /// Detected encoding (CSV only).
    pub encoding: Option<String>,
    /// Detected delimiter (CSV only).
    pub delimiter: Option<char>,
}

/// Choose the format from the filename extension.
pub fn detect_format(filename: &str) -> IngestResult<FileFormat> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".csv") {
        Ok(FileFormat::Csv)
    } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        Ok(FileFormat::Xlsx)
    } else {
        Err(IngestError::UnsupportedFormat(filename.to_string()))
    }
}

/// Parse uploaded bytes into a table, dispatching on the filename extension.
pub fn read_table(bytes: &[u8], filename: &str) -> IngestResult<IngestedFile> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    match detect_format(filename)? {
        FileFormat::Csv => {
            let encoding = detect_encoding(bytes);
            let content = decode_content(bytes, &encoding)?;
            let delimiter = detect_delimiter(&content);
            let table = parse_csv(&content, delimiter)?;
            Ok(IngestedFile {
                table,
                format: FileFormat::Csv,
                encoding: Some(encoding),
                delimiter: Some(delimiter),
            })
        }
        FileFormat::Xlsx => {
            let table = parse_xlsx(bytes)?;
            Ok(IngestedFile {
                table,
                format: FileFormat::Xlsx,
                encoding: None,
                delimiter: None,
            })
        }
    }
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> IngestResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).to_string())),
        "iso-8859-1" | "latin-1" | "latin1" => {
            Ok(encoding_rs::ISO_8859_15.decode(bytes).0.to_string())
        }
        "windows-1252" | "cp1252" => Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()),
        _ => {
            // Fallback: UTF-8 with lossy conversion
            Ok(String::from_utf8_lossy(bytes).to_string())
        }
    }
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into a [`RawTable`] with an explicit delimiter.
///
/// The first line provides the headers. Blank lines are skipped, missing
/// trailing cells read as empty strings, extra cells are ignored.
pub fn parse_csv(content: &str, delimiter: char) -> IngestResult<RawTable> {
    let mut lines = content.lines();

    let header_line = lines.next().ok_or(IngestError::EmptyFile)?;

    let headers: Vec<String> = header_line
        .split(delimiter)
        .map(|s| s.trim().trim_matches('"').to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::NoHeaders);
    }

    let mut rows = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        let values: Vec<String> = line
            .split(delimiter)
            .map(|s| s.trim().trim_matches('"').to_string())
            .collect();

        let row: Vec<String> = (0..headers.len())
            .map(|i| values.get(i).cloned().unwrap_or_default())
            .collect();

        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

/// Parse a spreadsheet workbook: first worksheet, first row as headers.
pub fn parse_xlsx(bytes: &[u8]) -> IngestResult<RawTable> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| IngestError::SpreadsheetError(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::SpreadsheetError("workbook has no sheets".to_string()))?
        .map_err(|e| IngestError::SpreadsheetError(e.to_string()))?;

    let mut row_iter = range.rows();

    let header_row = row_iter.next().ok_or(IngestError::NoHeaders)?;
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::NoHeaders);
    }

    let mut rows = Vec::new();
    for row in row_iter {
        let cells: Vec<String> = (0..headers.len())
            .map(|i| row.get(i).map(cell_to_string).unwrap_or_default())
            .collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(cells);
    }

    Ok(RawTable { headers, rows })
}

/// Stringify a spreadsheet cell the way the CSV path would see it.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Whole floats print without a trailing .0 so "2024" stays "2024".
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.time() == chrono::NaiveTime::MIN => {
                ndt.date().format("%Y-%m-%d").to_string()
            }
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => String::new(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_by_extension() {
        assert_eq!(detect_format("members.csv").unwrap(), FileFormat::Csv);
        assert_eq!(detect_format("MEMBERS.CSV").unwrap(), FileFormat::Csv);
        assert_eq!(detect_format("evals.xlsx").unwrap(), FileFormat::Xlsx);
        assert_eq!(detect_format("evals.xls").unwrap(), FileFormat::Xlsx);
        assert!(detect_format("report.pdf").is_err());
        assert!(detect_format("no_extension").is_err());
    }

    #[test]
    fn test_simple_csv() {
        let table = parse_csv("name,age\nAlice,30\nBob,25", ',').unwrap();
        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(0, "name"), Some("Alice"));
        assert_eq!(table.cell(1, "age"), Some("25"));
    }

    #[test]
    fn test_quoted_values() {
        let table = parse_csv("name,value\n\"Alice\",\"Hello\"", ',').unwrap();
        assert_eq!(table.cell(0, "name"), Some("Alice"));
        assert_eq!(table.cell(0, "value"), Some("Hello"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_csv("a,b\n1,2\n\n3,4\n", ',').unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_missing_and_extra_cells() {
        let table = parse_csv("a,b,c\n1,,3\n1,2,3,4", ',').unwrap();
        assert_eq!(table.cell(0, "b"), Some(""));
        assert_eq!(table.cell(0, "c"), Some("3"));
        // extra fourth cell dropped
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv("", ','), Err(IngestError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_read_table_csv_auto() {
        let csv = "Agent Name;Status\nJane;active\n";
        let parsed = read_table(csv.as_bytes(), "evals.csv").unwrap();
        assert_eq!(parsed.format, FileFormat::Csv);
        assert_eq!(parsed.delimiter, Some(';'));
        assert_eq!(parsed.table.len(), 1);
        assert!(parsed.encoding.is_some());
    }

    #[test]
    fn test_read_table_rejects_unknown_extension() {
        let err = read_table(b"data", "notes.txt").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_read_table_empty_bytes() {
        assert!(matches!(
            read_table(b"", "m.csv"),
            Err(IngestError::EmptyFile)
        ));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert!(decoded.contains("Soci"));
    }

    #[test]
    fn test_xlsx_roundtrip() {
        // Build a workbook with the export writer, read it back here.
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Clinic Name").unwrap();
        sheet.write_string(0, 1, "Age").unwrap();
        sheet.write_string(1, 0, "North").unwrap();
        sheet.write_number(1, 1, 42.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let parsed = read_table(&bytes, "members.xlsx").unwrap();
        assert_eq!(parsed.format, FileFormat::Xlsx);
        assert_eq!(parsed.table.headers, vec!["Clinic Name", "Age"]);
        assert_eq!(parsed.table.cell(0, "Age"), Some("42"));
    }
}
