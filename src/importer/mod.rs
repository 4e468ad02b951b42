// ==========================================
// Billing Import Engine - Import Layer
// ==========================================
// External data intake: file parsing, schema resolution
// against the counterparty alias table, and the
// all-or-nothing row validation gate.
// ==========================================

pub mod error;
pub mod file_parser;
pub mod row_validator;
pub mod schema_resolver;

// Re-export core types
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, ParsedSheet, UniversalFileParser};
pub use row_validator::{
    RowValidator, ValidationError, ValidationReport, SHOWN_ERROR_LIMIT,
};
pub use schema_resolver::SchemaResolver;
