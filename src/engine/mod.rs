// ==========================================
// Billing Import Engine - Engine Layer
// ==========================================
// Business rules: classification, money-safe aggregation,
// document synthesis, duplicate guarding and the combined
// pre-emission pipeline.
// ==========================================

pub mod aggregator;
pub mod classifier;
pub mod dedup_guard;
pub mod error;
pub mod issuer_trait;
pub mod pipeline;
pub mod synthesizer;

// Re-export core types
pub use aggregator::{AggregationOverflow, AggregationResult, Aggregator};
pub use classifier::{Classification, ClassificationWarning, Classifier};
pub use dedup_guard::AntiDuplicateGuard;
pub use error::EmissionError;
pub use issuer_trait::{DocumentIssuer, PriorEmissions};
pub use pipeline::{ImportPipeline, ImportSummary, PipelineOutcome, ValidatedBatch};
pub use synthesizer::DocumentSynthesizer;
