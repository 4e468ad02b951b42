// ==========================================
// Billing Import Engine - Import Pipeline
// ==========================================
// The synchronous, CPU-bound core pass over one parsed
// sheet: schema resolution → row validation → classification
// → aggregation. Side-effect-free; file I/O and issuance
// live outside. A failure at any stage other than per-row
// classification warnings aborts the whole batch.
//
// The pass is split at the validation boundary: stages 1-2
// are rule-set independent, so a session can validate a
// batch once and let the user pick a rule set afterwards
// without ever offering a choice for a batch that will be
// rejected.
// ==========================================

use crate::config::profile::{CounterpartyProfile, RuleSet};
use crate::domain::document::{Group, SkippedGroup};
use crate::domain::record::{SchemaMapping, ValidatedRow};
use crate::engine::aggregator::Aggregator;
use crate::engine::classifier::{ClassificationWarning, Classifier};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::ParsedSheet;
use crate::importer::row_validator::{RowValidator, ValidationReport};
use crate::importer::schema_resolver::SchemaResolver;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

// ==========================================
// ImportSummary - per-batch audit record
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub file_name: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub excluded_rows: usize,
    pub elapsed_ms: u128,
}

// ==========================================
// ValidatedBatch - output of stages 1-2
// ==========================================
// Schema mapping plus the full validation result, before any
// rule set has been applied. Holds everything classification
// needs, so the sheet itself can be dropped.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub batch_id: String,
    pub file_name: String,
    pub total_rows: usize,
    pub mapping: SchemaMapping,
    pub report: ValidationReport,
    pub rows: Vec<ValidatedRow>,
    elapsed_ms: u128,
}

impl ValidatedBatch {
    pub fn is_valid(&self) -> bool {
        self.report.valid
    }

    /// Summary for a batch rejected at validation, before any
    /// classification ran.
    pub fn rejection_summary(&self) -> ImportSummary {
        ImportSummary {
            batch_id: self.batch_id.clone(),
            file_name: self.file_name.clone(),
            total_rows: self.total_rows,
            valid_rows: 0,
            error_rows: self.report.errors.len(),
            excluded_rows: 0,
            elapsed_ms: self.elapsed_ms,
        }
    }
}

// ==========================================
// PipelineOutcome
// ==========================================
// `groups` is empty whenever `report.valid` is false: no
// partial invoicing from a batch with any invalid row.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub summary: ImportSummary,
    pub mapping: SchemaMapping,
    pub report: ValidationReport,
    pub warnings: Vec<ClassificationWarning>,
    pub groups: Vec<Group>,
    pub skipped: Vec<SkippedGroup>,
}

impl PipelineOutcome {
    pub fn is_accepted(&self) -> bool {
        self.report.valid
    }
}

// ==========================================
// ImportPipeline
// ==========================================
pub struct ImportPipeline;

impl ImportPipeline {
    /// Stages 1-2: schema resolution and all-or-nothing row
    /// validation. Rule-set independent.
    ///
    /// Schema resolution failure is an `Err`: the import aborts before
    /// any row is read past the header. Validation failure is not an
    /// `Err`: the batch comes back with `report.valid == false` and
    /// must not be classified.
    #[instrument(skip(sheet, profile), fields(batch_id, profile_id = %profile.id))]
    pub fn validate(
        sheet: &ParsedSheet,
        profile: &CounterpartyProfile,
    ) -> ImportResult<ValidatedBatch> {
        let started = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        info!(
            file = %sheet.source_name,
            total_rows = sheet.records.len(),
            "import pipeline started"
        );

        // === Stage 1: schema resolution ===
        debug!("stage 1: schema resolution");
        let mapping = SchemaResolver::resolve(
            &sheet.headers,
            &profile.alias_table,
            &profile.required_fields,
        )
        .map_err(|e| {
            error!(error = %e, "schema resolution failed, batch aborted");
            e
        })?;

        // === Stage 2: row validation (all-or-nothing) ===
        debug!("stage 2: row validation");
        let validator = RowValidator::new(profile.amount_policy);
        let (report, rows) = validator.validate(&sheet.records, &mapping);
        if !report.valid {
            info!(
                errors = report.errors.len(),
                "batch rejected by validation, no groups computed"
            );
        }

        Ok(ValidatedBatch {
            batch_id,
            file_name: sheet.source_name.clone(),
            total_rows: sheet.records.len(),
            mapping,
            report,
            rows,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Stages 3-4: classification and aggregation of an already
    /// valid batch under one rule set.
    #[instrument(skip(batch, profile, rule_set), fields(batch_id = %batch.batch_id))]
    pub fn classify(
        batch: ValidatedBatch,
        profile: &CounterpartyProfile,
        rule_set: &RuleSet,
    ) -> ImportResult<PipelineOutcome> {
        let started = Instant::now();

        if !batch.is_valid() {
            let summary = batch.rejection_summary();
            return Ok(PipelineOutcome {
                summary,
                mapping: batch.mapping,
                report: batch.report,
                warnings: Vec::new(),
                groups: Vec::new(),
                skipped: Vec::new(),
            });
        }
        let valid_rows = batch.rows.len();

        // === Stage 3: classification ===
        debug!(rule_set = %rule_set.id, "stage 3: classification");
        let classification = Classifier::classify(batch.rows, rule_set);
        let warnings = classification.warnings.clone();

        // === Stage 4: aggregation ===
        debug!("stage 4: aggregation");
        let aggregation = Aggregator::aggregate(&classification, &profile.tax_table)
            .map_err(|e| ImportError::Internal(e.to_string()))?;

        let summary = ImportSummary {
            batch_id: batch.batch_id,
            file_name: batch.file_name,
            total_rows: batch.total_rows,
            valid_rows,
            error_rows: 0,
            excluded_rows: warnings.len(),
            elapsed_ms: batch.elapsed_ms + started.elapsed().as_millis(),
        };
        info!(
            batch_id = %summary.batch_id,
            groups = aggregation.groups.len(),
            skipped = aggregation.skipped.len(),
            excluded = warnings.len(),
            elapsed_ms = summary.elapsed_ms,
            "import pipeline finished"
        );

        Ok(PipelineOutcome {
            summary,
            mapping: batch.mapping,
            report: batch.report,
            warnings,
            groups: aggregation.groups,
            skipped: aggregation.skipped,
        })
    }

    /// Full pre-emission pass for profiles with a known rule set.
    pub fn run(
        sheet: &ParsedSheet,
        profile: &CounterpartyProfile,
        rule_set: &RuleSet,
    ) -> ImportResult<PipelineOutcome> {
        let batch = Self::validate(sheet, profile)?;
        Self::classify(batch, profile, rule_set)
    }
}
