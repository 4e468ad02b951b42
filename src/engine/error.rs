// ==========================================
// Billing Import Engine - Emission Error Types
// ==========================================
// Error taxonomy for the issuance boundary. Transient
// failures may be retried for the same group; permanent
// failures and duplicates must resurface to the user.
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EmissionError {
    /// The batch fingerprint matched a previously accepted emission.
    /// Raised before the issuance call; the caller surfaces the
    /// existing document instead of creating a near-duplicate.
    #[error("duplicate emission: batch already issued as {existing_ref}")]
    Duplicate { existing_ref: String },

    /// Network/5xx class failure; retrying the same group is safe.
    #[error("transient issuance failure: {0}")]
    Transient(String),

    /// The remote issuer rejected the document; never auto-retried.
    #[error("permanent issuance failure: {0}")]
    Permanent(String),
}

impl EmissionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmissionError::Transient(_))
    }
}
