// ==========================================
// Billing Import Engine - Row Validator
// ==========================================
// All-or-nothing validation gate. Runs to completion over
// every row even after the first failure so the user sees
// every problem at once; a single bad row rejects the batch.
// ==========================================

use crate::domain::money::Money;
use crate::domain::record::{CellValue, RawRecord, SchemaMapping, ValidatedRow};
use crate::domain::types::{AmountPolicy, CanonicalField};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// How many errors are echoed verbatim to the user; the rest are
/// summarized by `truncated_count`.
pub const SHOWN_ERROR_LIMIT: usize = 5;

// ==========================================
// ValidationError / ValidationReport
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row_number: usize,
    pub field: CanonicalField,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    /// First `SHOWN_ERROR_LIMIT` errors, for direct display.
    pub shown_errors: Vec<ValidationError>,
    pub truncated_count: usize,
}

impl ValidationReport {
    fn from_errors(errors: Vec<ValidationError>) -> Self {
        let shown_errors: Vec<ValidationError> =
            errors.iter().take(SHOWN_ERROR_LIMIT).cloned().collect();
        let truncated_count = errors.len().saturating_sub(shown_errors.len());
        ValidationReport {
            valid: errors.is_empty(),
            errors,
            shown_errors,
            truncated_count,
        }
    }
}

// ==========================================
// RowValidator
// ==========================================
pub struct RowValidator {
    amount_policy: AmountPolicy,
}

impl RowValidator {
    pub fn new(amount_policy: AmountPolicy) -> Self {
        Self { amount_policy }
    }

    /// Validate every record. The returned rows are only meaningful
    /// when `report.valid` is true; callers must not classify a batch
    /// with a non-empty error list.
    pub fn validate(
        &self,
        records: &[RawRecord],
        mapping: &SchemaMapping,
    ) -> (ValidationReport, Vec<ValidatedRow>) {
        let mut errors = Vec::new();
        let mut rows = Vec::with_capacity(records.len());
        let mut seen_cases: HashSet<String> = HashSet::new();

        for record in records {
            let amount = self.validate_amount(record, mapping, &mut errors);
            let adjustment = self.validate_adjustment(record, mapping, &mut errors);
            let case_number =
                self.validate_case_number(record, mapping, &mut seen_cases, &mut errors);

            let category = record
                .field(mapping, CanonicalField::Category)
                .map(|c| c.as_text())
                .unwrap_or_default();

            if let Some(amount) = amount {
                rows.push(ValidatedRow {
                    row_number: record.row_number,
                    case_number,
                    category,
                    amount,
                    adjustment,
                });
            }
        }

        let report = ValidationReport::from_errors(errors);
        debug!(
            total = records.len(),
            errors = report.errors.len(),
            valid = report.valid,
            "row validation finished"
        );
        (report, rows)
    }

    fn validate_amount(
        &self,
        record: &RawRecord,
        mapping: &SchemaMapping,
        errors: &mut Vec<ValidationError>,
    ) -> Option<Money> {
        let cell = record.field(mapping, CanonicalField::Amount);
        let parsed = match cell {
            None | Some(CellValue::Blank) => Err("amount is missing".to_string()),
            Some(cell) => parse_money_cell(cell),
        };

        let amount = match parsed {
            Ok(amount) => amount,
            Err(message) => {
                errors.push(ValidationError {
                    row_number: record.row_number,
                    field: CanonicalField::Amount,
                    message,
                });
                return None;
            }
        };

        let admissible = match self.amount_policy {
            AmountPolicy::StrictlyPositive => amount.is_positive(),
            AmountPolicy::NonZero => !amount.is_zero(),
        };
        if !admissible {
            errors.push(ValidationError {
                row_number: record.row_number,
                field: CanonicalField::Amount,
                message: format!("amount must be {}: {amount}", self.policy_label()),
            });
            return None;
        }
        Some(amount)
    }

    fn validate_adjustment(
        &self,
        record: &RawRecord,
        mapping: &SchemaMapping,
        errors: &mut Vec<ValidationError>,
    ) -> Option<Money> {
        // Column never resolved for this import: adjustment is absent,
        // which stays distinguishable from "present but zero".
        if !mapping.is_resolved(CanonicalField::Adjustment) {
            return None;
        }
        match record.field(mapping, CanonicalField::Adjustment) {
            None | Some(CellValue::Blank) => Some(Money::ZERO),
            Some(cell) => match parse_money_cell(cell) {
                Ok(adjustment) => Some(adjustment),
                Err(message) => {
                    errors.push(ValidationError {
                        row_number: record.row_number,
                        field: CanonicalField::Adjustment,
                        message,
                    });
                    Some(Money::ZERO)
                }
            },
        }
    }

    fn validate_case_number(
        &self,
        record: &RawRecord,
        mapping: &SchemaMapping,
        seen: &mut HashSet<String>,
        errors: &mut Vec<ValidationError>,
    ) -> Option<String> {
        if !mapping.is_resolved(CanonicalField::CaseNumber) {
            return None;
        }
        let text = record
            .field(mapping, CanonicalField::CaseNumber)
            .map(|c| c.as_text())
            .unwrap_or_default();
        if text.is_empty() {
            errors.push(ValidationError {
                row_number: record.row_number,
                field: CanonicalField::CaseNumber,
                message: "case number is missing".to_string(),
            });
            return None;
        }
        // Duplicate identities inside one batch would corrupt the
        // dedup fingerprint and the audit trail.
        if !seen.insert(text.clone()) {
            errors.push(ValidationError {
                row_number: record.row_number,
                field: CanonicalField::CaseNumber,
                message: format!("duplicate case number in batch: {text}"),
            });
        }
        Some(text)
    }

    fn policy_label(&self) -> &'static str {
        match self.amount_policy {
            AmountPolicy::StrictlyPositive => "a positive number",
            AmountPolicy::NonZero => "a non-zero number",
        }
    }
}

/// Locale-tolerant cell parsing; numeric cells skip text parsing
/// entirely so workbook-typed numbers never drift.
fn parse_money_cell(cell: &CellValue) -> Result<Money, String> {
    match cell {
        CellValue::Number(n) => {
            Money::from_f64_lossy(*n).map_err(|e| format!("invalid number: {e}"))
        }
        CellValue::Text(s) => Money::parse(s).map_err(|e| format!("not a valid amount: {e}")),
        CellValue::Blank => Err("value is blank".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn mapping(with_adjustment: bool, with_case: bool) -> SchemaMapping {
        let mut cols = BTreeMap::new();
        cols.insert(CanonicalField::Category, "Tipo".to_string());
        cols.insert(CanonicalField::Amount, "Monto".to_string());
        if with_adjustment {
            cols.insert(CanonicalField::Adjustment, "Ajuste".to_string());
        }
        if with_case {
            cols.insert(CanonicalField::CaseNumber, "Expediente".to_string());
        }
        SchemaMapping::new(cols)
    }

    fn record(row: usize, case: &str, category: &str, amount: &str, adj: &str) -> RawRecord {
        let text = |s: &str| {
            if s.is_empty() {
                CellValue::Blank
            } else {
                CellValue::Text(s.to_string())
            }
        };
        RawRecord::new(
            row,
            vec![
                ("Expediente".to_string(), text(case)),
                ("Tipo".to_string(), text(category)),
                ("Monto".to_string(), text(amount)),
                ("Ajuste".to_string(), text(adj)),
            ],
        )
    }

    #[test]
    fn test_valid_batch_produces_rows() {
        let validator = RowValidator::new(AmountPolicy::StrictlyPositive);
        let records = vec![
            record(2, "EXP-1", "X", "100", "-10"),
            record(3, "EXP-2", "X", "50", ""),
        ];

        let (report, rows) = validator.validate(&records, &mapping(true, true));
        assert!(report.valid);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount.cents(), 10_000);
        assert_eq!(rows[0].adjustment, Some(Money::from_cents(-1_000)));
        // Blank adjustment cell under a resolved column is zero
        assert_eq!(rows[1].adjustment, Some(Money::ZERO));
    }

    #[test]
    fn test_single_bad_row_invalidates_batch() {
        let validator = RowValidator::new(AmountPolicy::StrictlyPositive);
        let mut records: Vec<RawRecord> = (0..50)
            .map(|i| record(i + 2, &format!("EXP-{i}"), "X", "10", ""))
            .collect();
        records.push(record(99, "EXP-BAD", "X", "abc", ""));

        let (report, _) = validator.validate(&records, &mapping(true, true));
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row_number, 99);
        assert_eq!(report.errors[0].field, CanonicalField::Amount);
    }

    #[test]
    fn test_validation_runs_to_completion() {
        let validator = RowValidator::new(AmountPolicy::StrictlyPositive);
        let records = vec![
            record(2, "EXP-1", "X", "abc", ""),
            record(3, "EXP-2", "X", "0", ""),
            record(4, "EXP-3", "X", "-5", ""),
            record(5, "EXP-4", "X", "", ""),
        ];

        let (report, _) = validator.validate(&records, &mapping(true, true));
        // Every failing row is reported, not just the first
        assert_eq!(report.errors.len(), 4);
        let rows: Vec<usize> = report.errors.iter().map(|e| e.row_number).collect();
        assert_eq!(rows, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_shown_errors_truncation() {
        let validator = RowValidator::new(AmountPolicy::StrictlyPositive);
        let records: Vec<RawRecord> = (0..8)
            .map(|i| record(i + 2, &format!("EXP-{i}"), "X", "bad", ""))
            .collect();

        let (report, _) = validator.validate(&records, &mapping(true, true));
        assert_eq!(report.errors.len(), 8);
        assert_eq!(report.shown_errors.len(), SHOWN_ERROR_LIMIT);
        assert_eq!(report.truncated_count, 3);
    }

    #[test]
    fn test_non_zero_policy_admits_negative_amounts() {
        let validator = RowValidator::new(AmountPolicy::NonZero);
        let records = vec![
            record(2, "EXP-1", "X", "100", ""),
            record(3, "EXP-2", "X", "-100", ""),
            record(4, "EXP-3", "X", "0", ""),
        ];

        let (report, _) = validator.validate(&records, &mapping(true, true));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row_number, 4);
    }

    #[test]
    fn test_duplicate_case_number_rejected() {
        let validator = RowValidator::new(AmountPolicy::StrictlyPositive);
        let records = vec![
            record(2, "EXP-1", "X", "10", ""),
            record(3, "EXP-1", "Y", "20", ""),
        ];

        let (report, _) = validator.validate(&records, &mapping(true, true));
        assert!(!report.valid);
        assert_eq!(report.errors[0].row_number, 3);
        assert_eq!(report.errors[0].field, CanonicalField::CaseNumber);
    }

    #[test]
    fn test_unresolved_adjustment_column_is_absent_not_zero() {
        let validator = RowValidator::new(AmountPolicy::StrictlyPositive);
        let records = vec![record(2, "EXP-1", "X", "10", "-5")];

        let (report, rows) = validator.validate(&records, &mapping(false, true));
        assert!(report.valid);
        assert_eq!(rows[0].adjustment, None);
    }
}
