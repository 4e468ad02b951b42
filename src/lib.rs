// ==========================================
// Billing Import Engine - Core Library
// ==========================================
// Spreadsheet batch import for billing documents:
// parse → resolve schema → validate → classify →
// aggregate → synthesize → emit, driven by a per-user
// session state machine. The user confirms before
// anything is issued.
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer - entities and types
pub mod domain;

// Import layer - external data
pub mod importer;

// Engine layer - business rules
pub mod engine;

// Configuration layer - counterparty profiles
pub mod config;

// Session layer - per-user state machines
pub mod session;

// Logging
pub mod logging;

// ==========================================
// Core type re-exports
// ==========================================

// Domain types
pub use domain::types::{AmountPolicy, CanonicalField, GroupKey, SessionState, UserId};

// Domain entities
pub use domain::{
    AliasTable, CellValue, DedupFingerprint, Group, IssuedDocument, Money, RawRecord,
    SchemaMapping, SkippedGroup, SynthesizedDocument, TaxProfile, ValidatedRow,
};

// Import layer
pub use importer::{
    FileParser, ImportError, ImportResult, ParsedSheet, RowValidator, SchemaResolver,
    UniversalFileParser, ValidationReport,
};

// Engine layer
pub use engine::{
    Aggregator, AntiDuplicateGuard, Classifier, DocumentIssuer, DocumentSynthesizer,
    EmissionError, ImportPipeline, ImportSummary, PipelineOutcome, PriorEmissions,
};

// Configuration
pub use config::{ClassificationRule, CounterpartyProfile, RuleSet, SessionConfig, TaxTable};

// Sessions
pub use session::{
    EmissionReport, EmissionStatus, GroupOutcome, ImportSession, IngestOutcome,
    InMemorySessionStore, SessionError, SessionStore,
};
