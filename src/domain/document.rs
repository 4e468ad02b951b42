// ==========================================
// Billing Import Engine - Documents and Taxes
// ==========================================
// Groups, tax profiles and synthesized billing documents.
// A SynthesizedDocument is a proposal shown to the user;
// only the external issuer turns it into a legal document.
// ==========================================

use crate::domain::money::Money;
use crate::domain::record::ValidatedRow;
use crate::domain::types::GroupKey;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// TaxComponent / TaxProfile
// ==========================================
// An ordered set of tax components applied to a group's total.
// Resolution is a pure function of the GroupKey, never of record
// content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxComponent {
    /// Component label, e.g. "VAT" or "INCOME-WH".
    pub kind: String,
    /// Rate in basis points (2100 = 21.00%); integer so tax math
    /// stays in fixed point.
    pub rate_bp: u32,
    pub basis: TaxBasis,
    pub is_withholding: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxBasis {
    /// Applied on the group's net total.
    Net,
    /// Applied on net plus previously computed non-withholding components.
    Total,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxProfile {
    pub components: Vec<TaxComponent>,
}

impl TaxProfile {
    pub fn new(components: Vec<TaxComponent>) -> Self {
        Self { components }
    }

    pub fn has_withholding(&self) -> bool {
        self.components.iter().any(|c| c.is_withholding)
    }
}

// ==========================================
// Group - one classified, aggregated bucket
// ==========================================
// Created by the classifier + aggregator pass; read-only afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub key: GroupKey,
    pub records: Vec<ValidatedRow>,
    pub total: Money,
    pub tax_profile: TaxProfile,
}

impl Group {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

// ==========================================
// SkippedGroup - zero/negative-total bucket
// ==========================================
// Dropped from synthesis with a human-readable reason, but
// always reported back so the user sees "3 groups found,
// 1 skipped" instead of a silent disappearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub key: GroupKey,
    pub total: Money,
    pub record_count: usize,
    pub reason: String,
}

// ==========================================
// LineItem / SynthesizedDocument
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Deterministic audit template concatenating the identifying
    /// fields; a human must be able to trace every line back to a
    /// source row.
    pub description: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedDocument {
    pub group_key: GroupKey,
    pub line_items: Vec<LineItem>,
    pub total: Money,
    pub tax_profile: TaxProfile,
    pub counterparty_ref: String,
}

// ==========================================
// IssuedDocument - external issuer output
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedDocument {
    pub id: String,
    pub number: String,
    pub total: Money,
}

impl fmt::Display for IssuedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id {}, total {})", self.number, self.id, self.total)
    }
}

// ==========================================
// DedupFingerprint - stable batch identity hash
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupFingerprint(pub String);

impl fmt::Display for DedupFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
