// ==========================================
// Billing Import Engine - Records and Schema
// ==========================================
// RawRecord is the immutable parse-time shape of one
// spreadsheet row: an ordered mapping from the original
// header text to the cell value. Lookup always goes
// through the SchemaMapping, never positional indexing.
// ==========================================

use crate::domain::money::Money;
use crate::domain::types::CanonicalField;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// CellValue - one spreadsheet cell
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Blank,
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Blank => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Text rendering used for descriptions and error messages.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Blank => String::new(),
        }
    }
}

// ==========================================
// RawRecord - one imported row
// ==========================================
// Ordered (header, value) pairs; immutable once parsed.
// row_number counts from 2 so it matches what the user
// sees in their spreadsheet (row 1 is the header).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub row_number: usize,
    cells: Vec<(String, CellValue)>,
}

impl RawRecord {
    pub fn new(row_number: usize, cells: Vec<(String, CellValue)>) -> Self {
        Self { row_number, cells }
    }

    /// Lookup by the original header text. First matching column wins
    /// when a header is duplicated in the source file.
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v)
    }

    /// Lookup by canonical field through the resolved schema.
    pub fn field<'a>(
        &'a self,
        mapping: &SchemaMapping,
        field: CanonicalField,
    ) -> Option<&'a CellValue> {
        mapping.header_for(field).and_then(|h| self.get(h))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_blank())
    }
}

// ==========================================
// SchemaMapping - canonical field → actual header
// ==========================================
// Built exactly once per import from the header row,
// never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaMapping {
    columns: BTreeMap<CanonicalField, String>,
}

impl SchemaMapping {
    pub fn new(columns: BTreeMap<CanonicalField, String>) -> Self {
        Self { columns }
    }

    pub fn header_for(&self, field: CanonicalField) -> Option<&str> {
        self.columns.get(&field).map(|s| s.as_str())
    }

    pub fn is_resolved(&self, field: CanonicalField) -> bool {
        self.columns.contains_key(&field)
    }
}

// ==========================================
// AliasTable - per-counterparty header candidates
// ==========================================
// Static configuration: canonical field → ordered candidate
// header strings. Resolution tries exact matches across the
// whole table first, then case-insensitive substring matches,
// first alias in priority order wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasTable {
    entries: Vec<(CanonicalField, Vec<String>)>,
}

impl AliasTable {
    pub fn new(entries: Vec<(CanonicalField, Vec<String>)>) -> Self {
        Self { entries }
    }

    pub fn aliases_for(&self, field: CanonicalField) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| aliases.as_slice())
            .unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.entries.iter().map(|(f, _)| *f)
    }
}

// ==========================================
// ValidatedRow - post-validation working shape
// ==========================================
// Produced by the RowValidator once every row has passed the
// all-or-nothing gate; the classifier and aggregator never
// reparse cell text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedRow {
    pub row_number: usize,
    pub case_number: Option<String>,
    /// Trimmed original category text; may be empty (the classifier
    /// excludes empty categories explicitly).
    pub category: String,
    pub amount: Money,
    /// None when the adjustment column was never resolved for this
    /// import; Some(ZERO) when the column exists but the cell is 0.
    pub adjustment: Option<Money>,
}

impl ValidatedRow {
    /// Negative adjustment drives the "-with-adjustment" bucket variant.
    pub fn has_negative_adjustment(&self) -> bool {
        self.adjustment.map(|a| a.cents() < 0).unwrap_or(false)
    }
}
