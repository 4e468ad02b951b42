// ==========================================
// Billing Import Engine - Classifier
// ==========================================
// Deterministic rule engine partitioning validated rows into
// named groups. Unclassifiable rows are explicitly excluded
// with a warning, never silently dropped or defaulted into
// a bucket.
// ==========================================

use crate::config::profile::RuleSet;
use crate::domain::record::ValidatedRow;
use crate::domain::types::GroupKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ==========================================
// ClassificationWarning - per excluded row, non-fatal
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationWarning {
    pub row_number: usize,
    pub category: String,
    pub reason: String,
}

// ==========================================
// Classification - classifier output
// ==========================================
// BTreeMap keeps group iteration order deterministic.
#[derive(Debug, Clone)]
pub struct Classification {
    pub groups: BTreeMap<GroupKey, Vec<ValidatedRow>>,
    pub warnings: Vec<ClassificationWarning>,
}

// ==========================================
// Classifier
// ==========================================
pub struct Classifier;

impl Classifier {
    /// Partition rows by the rule set. Category is normalized by
    /// trimming and upper-casing before rule evaluation; empty
    /// categories are unclassifiable. First matching rule wins.
    pub fn classify(rows: Vec<ValidatedRow>, rule_set: &RuleSet) -> Classification {
        let mut groups: BTreeMap<GroupKey, Vec<ValidatedRow>> = BTreeMap::new();
        let mut warnings = Vec::new();

        for row in rows {
            let normalized = row.category.trim().to_uppercase();
            if normalized.is_empty() {
                warnings.push(ClassificationWarning {
                    row_number: row.row_number,
                    category: row.category.clone(),
                    reason: "empty category, row excluded".to_string(),
                });
                continue;
            }

            let negative_adjustment = row.has_negative_adjustment();
            let key = rule_set
                .rules
                .iter()
                .find_map(|rule| rule.apply(&normalized, negative_adjustment));

            match key {
                Some(key) => groups.entry(key).or_default().push(row),
                None => warnings.push(ClassificationWarning {
                    row_number: row.row_number,
                    category: row.category.clone(),
                    reason: format!(
                        "category '{}' matched no rule in rule set '{}', row excluded",
                        normalized, rule_set.id
                    ),
                }),
            }
        }

        debug!(
            groups = groups.len(),
            excluded = warnings.len(),
            rule_set = %rule_set.id,
            "classification finished"
        );
        Classification { groups, warnings }
    }
}
