// ==========================================
// Billing Import Engine - Domain Layer
// ==========================================
// Entities and value types: records, schema, money,
// groups, documents. No I/O, no side effects.
// ==========================================

pub mod document;
pub mod money;
pub mod record;
pub mod types;

// Re-export core types
pub use document::{
    DedupFingerprint, Group, IssuedDocument, LineItem, SkippedGroup, SynthesizedDocument,
    TaxBasis, TaxComponent, TaxProfile,
};
pub use money::{Money, MoneyParseError};
pub use record::{AliasTable, CellValue, RawRecord, SchemaMapping, ValidatedRow};
pub use types::{AmountPolicy, CanonicalField, GroupKey, SessionState, UserId};
