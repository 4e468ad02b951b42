// ==========================================
// Billing Import Engine - Counterparty Profiles
// ==========================================
// Static per-counterparty configuration: alias table,
// classification rule sets and the tax table. A profile is
// the whole rule surface for one business partner; there are
// no arbitrary plugins beyond this fixed table.
// ==========================================

use crate::domain::document::{TaxComponent, TaxProfile};
use crate::domain::record::AliasTable;
use crate::domain::types::{AmountPolicy, CanonicalField, GroupKey};
use serde::{Deserialize, Serialize};

// ==========================================
// ClassificationRule - one ordered rule
// ==========================================
// Evaluated in order against (normalized category, adjustment sign);
// first match wins. Rules are mutually exclusive by construction,
// so ordering only matters for the catch-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationRule {
    /// Matches one recognized bucket name exactly (post-normalization).
    /// A negative adjustment selects the with-adjustment variant.
    RecognizedBucket { category: String },
    /// Matches any non-empty category; no adjustment variant.
    CatchAll,
}

impl ClassificationRule {
    /// Returns the GroupKey when this rule matches the record inputs.
    pub fn apply(&self, normalized_category: &str, negative_adjustment: bool) -> Option<GroupKey> {
        match self {
            ClassificationRule::RecognizedBucket { category } => {
                if normalized_category == category {
                    Some(GroupKey::Bucket {
                        category: category.clone(),
                        with_adjustment: negative_adjustment,
                    })
                } else {
                    None
                }
            }
            ClassificationRule::CatchAll => {
                if normalized_category.is_empty() {
                    None
                } else {
                    Some(GroupKey::CatchAll)
                }
            }
        }
    }
}

// ==========================================
// RuleSet - one selectable classification table
// ==========================================
// Most profiles carry a single rule set. Profiles where the same
// spreadsheet shape carries two business meanings carry several,
// and the user must pick one before classification runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub id: String,
    /// Human-readable label shown by the session host when the user
    /// must choose.
    pub label: String,
    pub rules: Vec<ClassificationRule>,
}

// ==========================================
// TaxTable - static GroupKey → components table
// ==========================================
// Base components apply to every group; withholding components are
// appended only for with-adjustment keys. Resolution is a pure
// function of the GroupKey.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTable {
    pub base: Vec<TaxComponent>,
    pub withholding: Vec<TaxComponent>,
}

impl TaxTable {
    pub fn profile_for(&self, key: &GroupKey) -> TaxProfile {
        let mut components = self.base.clone();
        if key.has_adjustment() {
            components.extend(self.withholding.iter().cloned());
        }
        TaxProfile::new(components)
    }
}

// ==========================================
// CounterpartyProfile
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterpartyProfile {
    pub id: String,
    pub name: String,
    /// Reference handed to the external issuer and the prior-emissions
    /// lookup.
    pub counterparty_ref: String,
    pub alias_table: AliasTable,
    pub required_fields: Vec<CanonicalField>,
    pub amount_policy: AmountPolicy,
    pub rule_sets: Vec<RuleSet>,
    pub tax_table: TaxTable,
}

impl CounterpartyProfile {
    /// True when the user must pick among mutually exclusive rule
    /// sets not derivable from the data alone.
    pub fn needs_rule_choice(&self) -> bool {
        self.rule_sets.len() > 1
    }

    /// The single rule set, when no choice is required.
    pub fn sole_rule_set(&self) -> Option<&RuleSet> {
        if self.rule_sets.len() == 1 {
            self.rule_sets.first()
        } else {
            None
        }
    }

    pub fn rule_set(&self, id: &str) -> Option<&RuleSet> {
        self.rule_sets.iter().find(|rs| rs.id == id)
    }
}
