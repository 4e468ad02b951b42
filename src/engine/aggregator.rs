// ==========================================
// Billing Import Engine - Aggregator
// ==========================================
// Money-safe per-group totals in integer cents, plus the
// tax profile resolved from the GroupKey. Groups with a
// zero or negative total are skipped with a reason, not
// treated as fatal, and always reported back.
// ==========================================

use crate::config::profile::TaxTable;
use crate::domain::document::{Group, SkippedGroup};
use crate::domain::money::Money;
use crate::engine::classifier::Classification;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ==========================================
// AggregationResult
// ==========================================
#[derive(Debug, Clone)]
pub struct AggregationResult {
    pub groups: Vec<Group>,
    pub skipped: Vec<SkippedGroup>,
}

impl AggregationResult {
    /// "3 groups found, 1 skipped (zero total)" style summary line.
    pub fn summary_line(&self) -> String {
        let found = self.groups.len() + self.skipped.len();
        if self.skipped.is_empty() {
            format!("{} groups found", found)
        } else {
            format!(
                "{} groups found, {} skipped (zero or negative total)",
                found,
                self.skipped.len()
            )
        }
    }
}

// ==========================================
// AggregationOverflow - checked-sum failure
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("group total overflowed while summing row {row_number}")]
pub struct AggregationOverflow {
    pub row_number: usize,
}

// ==========================================
// Aggregator
// ==========================================
pub struct Aggregator;

impl Aggregator {
    /// Sum each group's amounts with checked integer-cent arithmetic.
    /// Summation is associative and order-independent; shuffling row
    /// order never changes a total.
    pub fn aggregate(
        classification: &Classification,
        tax_table: &TaxTable,
    ) -> Result<AggregationResult, AggregationOverflow> {
        let mut groups = Vec::new();
        let mut skipped = Vec::new();

        for (key, records) in &classification.groups {
            let mut total = Money::ZERO;
            for record in records {
                total = total
                    .checked_add(record.amount)
                    .ok_or(AggregationOverflow {
                        row_number: record.row_number,
                    })?;
            }

            if total.is_positive() {
                groups.push(Group {
                    key: key.clone(),
                    records: records.clone(),
                    total,
                    tax_profile: tax_table.profile_for(key),
                });
            } else {
                warn!(group = %key, total = %total, "group skipped, non-positive total");
                skipped.push(SkippedGroup {
                    key: key.clone(),
                    total,
                    record_count: records.len(),
                    reason: format!("total {} is not positive, nothing to bill", total),
                });
            }
        }

        debug!(
            realized = groups.len(),
            skipped = skipped.len(),
            "aggregation finished"
        );
        Ok(AggregationResult { groups, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::profile::{ClassificationRule, RuleSet};
    use crate::domain::document::{TaxBasis, TaxComponent};
    use crate::domain::record::ValidatedRow;
    use crate::engine::classifier::Classifier;

    fn tax_table() -> TaxTable {
        TaxTable {
            base: vec![TaxComponent {
                kind: "VAT".to_string(),
                rate_bp: 2100,
                basis: TaxBasis::Net,
                is_withholding: false,
            }],
            withholding: vec![TaxComponent {
                kind: "INCOME-WH".to_string(),
                rate_bp: 350,
                basis: TaxBasis::Net,
                is_withholding: true,
            }],
        }
    }

    fn rule_set() -> RuleSet {
        RuleSet {
            id: "standard".to_string(),
            label: "Standard".to_string(),
            rules: vec![
                ClassificationRule::RecognizedBucket {
                    category: "X".to_string(),
                },
                ClassificationRule::CatchAll,
            ],
        }
    }

    fn row(row_number: usize, category: &str, cents: i64, adj: Option<i64>) -> ValidatedRow {
        ValidatedRow {
            row_number,
            case_number: Some(format!("EXP-{row_number}")),
            category: category.to_string(),
            amount: Money::from_cents(cents),
            adjustment: adj.map(Money::from_cents),
        }
    }

    #[test]
    fn test_totals_are_exact_cents() {
        // 0.1 + 0.2 style inputs that drift under f64
        let rows = vec![
            row(2, "X", 10, None),
            row(3, "X", 20, None),
            row(4, "X", 30, None),
        ];
        let c = Classifier::classify(rows, &rule_set());
        let result = Aggregator::aggregate(&c, &tax_table()).unwrap();
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].total.cents(), 60);
    }

    #[test]
    fn test_shuffled_order_same_totals() {
        let rows = vec![
            row(2, "X", 10_001, None),
            row(3, "X", 333, Some(-1)),
            row(4, "Y", 99_999, None),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let a = Aggregator::aggregate(&Classifier::classify(rows, &rule_set()), &tax_table())
            .unwrap();
        let b = Aggregator::aggregate(
            &Classifier::classify(reversed, &rule_set()),
            &tax_table(),
        )
        .unwrap();

        let totals_a: Vec<(String, i64)> = a
            .groups
            .iter()
            .map(|g| (g.key.to_string(), g.total.cents()))
            .collect();
        let totals_b: Vec<(String, i64)> = b
            .groups
            .iter()
            .map(|g| (g.key.to_string(), g.total.cents()))
            .collect();
        assert_eq!(totals_a, totals_b);
    }

    #[test]
    fn test_zero_total_group_skipped_with_reason() {
        // NonZero-policy profiles admit negative amounts; a bucket can
        // cancel to exactly zero.
        let rows = vec![row(2, "X", 5_000, None), row(3, "X", -5_000, None)];
        let c = Classifier::classify(rows, &rule_set());
        let result = Aggregator::aggregate(&c, &tax_table()).unwrap();

        assert!(result.groups.is_empty());
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].total, Money::ZERO);
        assert!(result.skipped[0].reason.contains("not positive"));
        assert!(result.summary_line().contains("1 skipped"));
    }

    #[test]
    fn test_sibling_groups_proceed_past_skipped_one() {
        let rows = vec![
            row(2, "X", 5_000, None),
            row(3, "X", -5_000, None),
            row(4, "Y", 2_000, None),
        ];
        let c = Classifier::classify(rows, &rule_set());
        let result = Aggregator::aggregate(&c, &tax_table()).unwrap();
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.groups[0].total.cents(), 2_000);
    }

    #[test]
    fn test_withholding_applied_only_with_adjustment() {
        let rows = vec![
            row(2, "X", 10_000, Some(-1_000)),
            row(3, "X", 5_000, Some(0)),
        ];
        let c = Classifier::classify(rows, &rule_set());
        let result = Aggregator::aggregate(&c, &tax_table()).unwrap();
        assert_eq!(result.groups.len(), 2);

        for group in &result.groups {
            assert_eq!(
                group.tax_profile.has_withholding(),
                group.key.has_adjustment()
            );
        }
    }
}
