// ==========================================
// Billing Import Engine - Anti-Duplicate Guard
// ==========================================
// Stable SHA-256 fingerprint over the sorted record
// identities of a group, checked against the external
// prior-emissions lookup synchronously, immediately
// before every issuance call. Sessions can be resumed
// or retried after partial failure, so checking only at
// session start is not enough.
// ==========================================

use crate::domain::document::{DedupFingerprint, Group, IssuedDocument};
use crate::domain::record::ValidatedRow;
use crate::engine::error::EmissionError;
use crate::engine::issuer_trait::PriorEmissions;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

pub struct AntiDuplicateGuard;

impl AntiDuplicateGuard {
    /// Deterministic fingerprint of a set of records.
    ///
    /// Identity lines are sorted before hashing, so row order in the
    /// source file never changes the fingerprint. Identity covers case
    /// number (row number as fallback), category and exact cent values;
    /// a changed amount is a different batch, not a duplicate.
    pub fn fingerprint(records: &[ValidatedRow]) -> DedupFingerprint {
        let mut identities: Vec<String> = records
            .iter()
            .map(|r| {
                let case = r
                    .case_number
                    .clone()
                    .unwrap_or_else(|| format!("row:{}", r.row_number));
                let adjustment = r.adjustment.map(|a| a.cents()).unwrap_or(0);
                format!(
                    "{}\u{1}{}\u{1}{}\u{1}{}",
                    case,
                    r.category.trim().to_uppercase(),
                    r.amount.cents(),
                    adjustment
                )
            })
            .collect();
        identities.sort();

        let mut hasher = Sha256::new();
        for line in &identities {
            hasher.update(line.as_bytes());
            hasher.update([0u8]);
        }
        DedupFingerprint(format!("{:x}", hasher.finalize()))
    }

    pub fn fingerprint_group(group: &Group) -> DedupFingerprint {
        Self::fingerprint(&group.records)
    }

    /// Guard one group right before issuance. A fingerprint match
    /// blocks re-emission even when the session object differs, e.g.
    /// after a crash and re-upload.
    pub async fn check(
        prior: &dyn PriorEmissions,
        counterparty_ref: &str,
        fingerprint: &DedupFingerprint,
    ) -> Result<(), EmissionError> {
        match prior.find(counterparty_ref, fingerprint).await? {
            Some(existing) => {
                warn!(
                    counterparty = counterparty_ref,
                    fingerprint = %fingerprint,
                    existing = %existing,
                    "duplicate batch blocked before issuance"
                );
                Err(EmissionError::Duplicate {
                    existing_ref: existing.number,
                })
            }
            None => {
                debug!(fingerprint = %fingerprint, "no prior emission found");
                Ok(())
            }
        }
    }

    /// Record an accepted emission after a successful issue call.
    pub async fn record(
        prior: &dyn PriorEmissions,
        counterparty_ref: &str,
        fingerprint: &DedupFingerprint,
        document: &IssuedDocument,
    ) -> Result<(), EmissionError> {
        prior.record(counterparty_ref, fingerprint, document).await
    }
}
