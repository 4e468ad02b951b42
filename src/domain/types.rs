// ==========================================
// Billing Import Engine - Domain Type Definitions
// ==========================================
// Canonical field names, classification keys and
// session states shared by every layer.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// UserId - session owner identity
// ==========================================
// Supplied by the chat/UI host; one active session per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==========================================
// CanonicalField - stable internal column names
// ==========================================
// Independent of the spreadsheet's actual header text;
// the alias table maps these onto real headers per counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    CaseNumber,
    Category,
    Amount,
    Adjustment,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::CaseNumber => "caseNumber",
            CanonicalField::Category => "category",
            CanonicalField::Amount => "amount",
            CanonicalField::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// GroupKey - deterministic classification bucket
// ==========================================
// Derived only from (normalized category, sign of adjustment).
// Two records with equal derived inputs always yield an equal key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupKey {
    /// Recognized bucket, split by presence of a negative adjustment.
    Bucket {
        category: String,
        with_adjustment: bool,
    },
    /// Generic catch-all bucket for unrecognized non-empty categories.
    /// Never split by adjustment.
    CatchAll,
}

impl GroupKey {
    /// True for the "-with-adjustment" variant; drives withholding taxes.
    pub fn has_adjustment(&self) -> bool {
        matches!(
            self,
            GroupKey::Bucket {
                with_adjustment: true,
                ..
            }
        )
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Bucket {
                category,
                with_adjustment: true,
            } => write!(f, "{}-with-adjustment", category),
            GroupKey::Bucket {
                category,
                with_adjustment: false,
            } => write!(f, "{}-without-adjustment", category),
            GroupKey::CatchAll => write!(f, "GENERAL"),
        }
    }
}

// ==========================================
// AmountPolicy - per-profile validation policy
// ==========================================
// StrictlyPositive is the default gate (no zero/negative amounts).
// NonZero exists for credit-note profiles where rows may carry
// negative amounts and a bucket can legitimately cancel to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountPolicy {
    StrictlyPositive,
    NonZero,
}

impl Default for AmountPolicy {
    fn default() -> Self {
        AmountPolicy::StrictlyPositive
    }
}

// ==========================================
// SessionState - import session state machine
// ==========================================
// Idle → AwaitingFile → Validating → (AwaitingRuleChoice?) →
// AwaitingConfirmation → Emitting → Completed | Failed | Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Idle,
    AwaitingFile,
    Validating,
    AwaitingRuleChoice,
    AwaitingConfirmation,
    Emitting,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    /// Terminal states accept no further transitions; the user must
    /// start a fresh session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "IDLE",
            SessionState::AwaitingFile => "AWAITING_FILE",
            SessionState::Validating => "VALIDATING",
            SessionState::AwaitingRuleChoice => "AWAITING_RULE_CHOICE",
            SessionState::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            SessionState::Emitting => "EMITTING",
            SessionState::Completed => "COMPLETED",
            SessionState::Failed => "FAILED",
            SessionState::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_display_variants() {
        let with = GroupKey::Bucket {
            category: "X".to_string(),
            with_adjustment: true,
        };
        let without = GroupKey::Bucket {
            category: "X".to_string(),
            with_adjustment: false,
        };
        assert_eq!(with.to_string(), "X-with-adjustment");
        assert_eq!(without.to_string(), "X-without-adjustment");
        assert_eq!(GroupKey::CatchAll.to_string(), "GENERAL");
        assert_ne!(with, without);
    }

    #[test]
    fn test_group_key_equality_is_derived_from_inputs() {
        let a = GroupKey::Bucket {
            category: "HONORARIOS".to_string(),
            with_adjustment: true,
        };
        let b = GroupKey::Bucket {
            category: "HONORARIOS".to_string(),
            with_adjustment: true,
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(!SessionState::AwaitingConfirmation.is_terminal());
        assert!(!SessionState::Emitting.is_terminal());
    }
}
