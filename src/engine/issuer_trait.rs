// ==========================================
// Billing Import Engine - Issuance Boundary Traits
// ==========================================
// External collaborators, interfaces only: the remote
// document-issuing API and the prior-emissions lookup.
// The core never talks to the network directly.
// ==========================================

use crate::domain::document::{DedupFingerprint, IssuedDocument, SynthesizedDocument};
use crate::engine::error::EmissionError;
use async_trait::async_trait;

// ==========================================
// DocumentIssuer Trait
// ==========================================
// Implementors: the remote billing API client (production),
// in-memory fakes (tests).
#[async_trait]
pub trait DocumentIssuer: Send + Sync {
    /// Create and number the legal billing document for one proposal.
    ///
    /// Treated as a single uninterruptible unit per group once
    /// started; failures come back as transient (retryable) or
    /// permanent (resurface to the user).
    async fn issue(
        &self,
        document: &SynthesizedDocument,
        counterparty_ref: &str,
    ) -> Result<IssuedDocument, EmissionError>;
}

// ==========================================
// PriorEmissions Trait
// ==========================================
// Lookup of previously accepted batches by counterparty and
// fingerprint, backing the anti-duplicate guard.
#[async_trait]
pub trait PriorEmissions: Send + Sync {
    async fn find(
        &self,
        counterparty_ref: &str,
        fingerprint: &DedupFingerprint,
    ) -> Result<Option<IssuedDocument>, EmissionError>;

    /// Record an accepted emission so later resubmissions of the same
    /// batch are blocked, surviving session loss.
    async fn record(
        &self,
        counterparty_ref: &str,
        fingerprint: &DedupFingerprint,
        document: &IssuedDocument,
    ) -> Result<(), EmissionError>;
}
