// ==========================================
// Billing Import Engine - Session Error Types
// ==========================================

use crate::domain::types::{SessionState, UserId};
use crate::importer::error::ImportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no active session for user {0}")]
    NotFound(UserId),

    #[error("action '{action}' is not valid in state {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    #[error("unknown rule set: {0}")]
    UnknownRuleSet(String),

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Result alias for the session layer.
pub type SessionResult<T> = Result<T, SessionError>;
