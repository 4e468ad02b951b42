// ==========================================
// Billing Import Engine - File Parser
// ==========================================
// Input boundary: first row = headers (order-preserving),
// subsequent rows = records. No fixed column order assumed.
// Supports Excel (.xlsx/.xls) and CSV (.csv).
// ==========================================

use crate::domain::record::{CellValue, RawRecord};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook, Data, Reader, Xlsx};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

// ==========================================
// ParsedSheet - parse output
// ==========================================
// Headers are kept separately so the schema resolver can work
// before touching any data row. Record row numbers start at 2
// (row 1 is the header), matching what the user sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSheet {
    /// File name without directories, carried into the batch summary.
    pub source_name: String,
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ==========================================
// FileParser trait
// ==========================================
pub trait FileParser: Send + Sync {
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<ParsedSheet>;
}

// ==========================================
// CSV parser
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(
                file_path.display().to_string(),
            ));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // tolerate ragged rows
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeaderRow);
        }

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let row = result?;
            let cells: Vec<(String, CellValue)> = row
                .iter()
                .enumerate()
                .filter_map(|(col_idx, value)| {
                    headers.get(col_idx).map(|header| {
                        let trimmed = value.trim();
                        let cell = if trimmed.is_empty() {
                            CellValue::Blank
                        } else {
                            CellValue::Text(trimmed.to_string())
                        };
                        (header.clone(), cell)
                    })
                })
                .collect();

            let record = RawRecord::new(idx + 2, cells);
            // Skip fully blank rows
            if record.is_empty() {
                continue;
            }
            records.push(record);
        }

        Ok(ParsedSheet {
            source_name: source_name(file_path),
            headers,
            records,
        })
    }
}

// ==========================================
// Excel parser
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<ParsedSheet> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(
                file_path.display().to_string(),
            ));
        }

        let mut workbook: Xlsx<_> = open_workbook(file_path)
            .map_err(|e: calamine::XlsxError| ImportError::ExcelParseError(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ImportError::ExcelParseError(
                "workbook has no sheets".to_string(),
            ));
        }

        // First sheet only; multi-sheet workbooks are not a supported input
        let sheet_name = sheet_names[0].clone();
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let mut rows = range.rows();
        let header_row = rows.next().ok_or(ImportError::MissingHeaderRow)?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeaderRow);
        }

        let mut records = Vec::new();
        for (idx, data_row) in rows.enumerate() {
            let cells: Vec<(String, CellValue)> = data_row
                .iter()
                .enumerate()
                .filter_map(|(col_idx, cell)| {
                    headers
                        .get(col_idx)
                        .map(|header| (header.clone(), convert_cell(cell)))
                })
                .collect();

            let record = RawRecord::new(idx + 2, cells);
            if record.is_empty() {
                continue;
            }
            records.push(record);
        }

        Ok(ParsedSheet {
            source_name: source_name(file_path),
            headers,
            records,
        })
    }
}

/// Preserve the numeric/text distinction from the workbook so money
/// cells typed as numbers never round-trip through display text.
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Blank,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                CellValue::Blank
            } else {
                CellValue::Text(trimmed.to_string())
            }
        }
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        other => {
            let text = other.to_string().trim().to_string();
            if text.is_empty() {
                CellValue::Blank
            } else {
                CellValue::Text(text)
            }
        }
    }
}

// ==========================================
// Universal parser (extension dispatch)
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<ParsedSheet> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_sheet(path),
            "xlsx" | "xls" => ExcelParser.parse_sheet(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
