// ==========================================
// Billing Import Engine - Import Session
// ==========================================
// Orchestrating state machine for one user-facing import:
// Idle → AwaitingFile → Validating → (AwaitingRuleChoice?) →
// AwaitingConfirmation → Emitting → Completed | Failed |
// Cancelled. I/O is confined to file intake and the Emitting
// stage; everything in between is the synchronous pipeline.
// ==========================================

use crate::config::profile::CounterpartyProfile;
use crate::domain::document::{Group, IssuedDocument, SkippedGroup, SynthesizedDocument};
use crate::domain::types::{GroupKey, SessionState, UserId};
use crate::engine::classifier::ClassificationWarning;
use crate::engine::dedup_guard::AntiDuplicateGuard;
use crate::engine::error::EmissionError;
use crate::engine::issuer_trait::{DocumentIssuer, PriorEmissions};
use crate::engine::pipeline::{ImportPipeline, ImportSummary, PipelineOutcome, ValidatedBatch};
use crate::engine::synthesizer::DocumentSynthesizer;
use crate::importer::file_parser::ParsedSheet;
use crate::importer::row_validator::ValidationReport;
use crate::session::error::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// Host-facing result types
// ==========================================

/// One selectable classification rule set, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleChoice {
    pub id: String,
    pub label: String,
}

/// Outcome of handing a parsed file (or a rule choice) to the session.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The profile carries several rule sets; the user must pick one
    /// before classification can run.
    RuleChoiceRequired { choices: Vec<RuleChoice> },
    /// Validation rejected the batch; the session is terminal and the
    /// user must fix the file and start over.
    Rejected {
        summary: ImportSummary,
        report: ValidationReport,
    },
    /// Proposals are ready for confirmation. `proposals` may be empty
    /// when every group was skipped; the session completes immediately
    /// in that case since there is nothing to bill.
    Proposed {
        summary: ImportSummary,
        warnings: Vec<ClassificationWarning>,
        skipped: Vec<SkippedGroup>,
        proposals: Vec<SynthesizedDocument>,
    },
}

/// Per-group emission result; the user always sees exactly what
/// succeeded and what did not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOutcome {
    pub group_key: GroupKey,
    #[serde(flatten)]
    pub status: EmissionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmissionStatus {
    Issued { document: IssuedDocument },
    Duplicate { existing_ref: String },
    Failed { message: String, retryable: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionReport {
    pub outcomes: Vec<GroupOutcome>,
    pub state: SessionState,
}

impl EmissionReport {
    pub fn all_issued(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.status, EmissionStatus::Issued { .. }))
    }
}

// ==========================================
// ImportSession
// ==========================================
pub struct ImportSession {
    pub session_id: String,
    pub user: UserId,
    profile: Arc<CounterpartyProfile>,
    state: SessionState,
    created_at: DateTime<Utc>,
    last_touched: DateTime<Utc>,

    // Working set; discarded on cancel/eviction.
    pending_batch: Option<ValidatedBatch>,
    outcome: Option<PipelineOutcome>,
    emission_outcomes: Vec<GroupOutcome>,
}

impl ImportSession {
    pub fn new(user: UserId, profile: Arc<CounterpartyProfile>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            user,
            profile,
            state: SessionState::Idle,
            created_at: now,
            last_touched: now,
            pending_batch: None,
            outcome: None,
            emission_outcomes: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_touched(&self) -> DateTime<Utc> {
        self.last_touched
    }

    /// Idle sessions past the TTL are evicted by the store sweeper.
    pub fn is_expired(&self, now: DateTime<Utc>, idle_ttl: Duration) -> bool {
        match chrono::Duration::from_std(idle_ttl) {
            Ok(ttl) => now - self.last_touched > ttl,
            Err(_) => false,
        }
    }

    fn touch(&mut self) {
        self.last_touched = Utc::now();
    }

    fn guard(&self, expected: SessionState, action: &'static str) -> SessionResult<()> {
        if self.state != expected {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action,
            });
        }
        Ok(())
    }

    // ==========================================
    // Transitions
    // ==========================================

    /// Idle → AwaitingFile: the host has prompted the user for a file.
    pub fn begin(&mut self) -> SessionResult<()> {
        self.guard(SessionState::Idle, "begin")?;
        self.touch();
        self.state = SessionState::AwaitingFile;
        Ok(())
    }

    /// AwaitingFile → Validating → AwaitingRuleChoice |
    /// AwaitingConfirmation | Failed.
    ///
    /// The sheet arrives already parsed; the host reads the file off
    /// the dispatch path (see `session::load_sheet`).
    #[instrument(skip(self, sheet), fields(session_id = %self.session_id, user = %self.user))]
    pub fn receive_sheet(&mut self, sheet: ParsedSheet) -> SessionResult<IngestOutcome> {
        self.guard(SessionState::AwaitingFile, "receive_sheet")?;
        self.touch();
        self.state = SessionState::Validating;

        // Validation is rule-set independent and always runs first:
        // the user is never asked to pick a rule set for a batch that
        // is going to be rejected anyway.
        let batch = match ImportPipeline::validate(&sheet, &self.profile) {
            Ok(batch) => batch,
            Err(e) => {
                // Schema resolution failure: terminal before any row
                // was processed.
                self.state = SessionState::Failed;
                return Err(e.into());
            }
        };

        if !batch.is_valid() {
            self.state = SessionState::Failed;
            return Ok(IngestOutcome::Rejected {
                summary: batch.rejection_summary(),
                report: batch.report,
            });
        }

        if self.profile.needs_rule_choice() {
            let choices = self
                .profile
                .rule_sets
                .iter()
                .map(|rs| RuleChoice {
                    id: rs.id.clone(),
                    label: rs.label.clone(),
                })
                .collect();
            self.pending_batch = Some(batch);
            self.state = SessionState::AwaitingRuleChoice;
            info!("batch valid, rule choice required before classification");
            return Ok(IngestOutcome::RuleChoiceRequired { choices });
        }

        let rule_set_id = match self.profile.sole_rule_set() {
            Some(rs) => rs.id.clone(),
            None => {
                self.state = SessionState::Failed;
                return Err(SessionError::UnknownRuleSet(
                    "profile has no rule sets".to_string(),
                ));
            }
        };
        self.classify_batch(batch, &rule_set_id)
    }

    /// AwaitingRuleChoice → AwaitingConfirmation | Failed. The batch
    /// reaching this state has already passed validation.
    pub fn choose_rule_set(&mut self, rule_set_id: &str) -> SessionResult<IngestOutcome> {
        self.guard(SessionState::AwaitingRuleChoice, "choose_rule_set")?;
        self.touch();
        if self.profile.rule_set(rule_set_id).is_none() {
            // Leave the state as-is so the user can pick again.
            return Err(SessionError::UnknownRuleSet(rule_set_id.to_string()));
        }
        let batch = self.pending_batch.take().ok_or_else(|| {
            SessionError::Import(crate::importer::error::ImportError::Internal(
                "no pending batch for rule choice".to_string(),
            ))
        })?;
        self.classify_batch(batch, rule_set_id)
    }

    fn classify_batch(
        &mut self,
        batch: ValidatedBatch,
        rule_set_id: &str,
    ) -> SessionResult<IngestOutcome> {
        let rule_set = self
            .profile
            .rule_set(rule_set_id)
            .ok_or_else(|| SessionError::UnknownRuleSet(rule_set_id.to_string()))?
            .clone();

        let outcome = match ImportPipeline::classify(batch, &self.profile, &rule_set) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state = SessionState::Failed;
                return Err(e.into());
            }
        };

        let proposals: Vec<SynthesizedDocument> = outcome
            .groups
            .iter()
            .map(|g| DocumentSynthesizer::synthesize(g, &self.profile.counterparty_ref))
            .collect();

        let summary = outcome.summary.clone();
        let warnings = outcome.warnings.clone();
        let skipped = outcome.skipped.clone();
        self.outcome = Some(outcome);

        if proposals.is_empty() {
            // Every group was skipped; nothing to confirm or bill.
            info!("no billable groups, session completed without emission");
            self.state = SessionState::Completed;
        } else {
            self.state = SessionState::AwaitingConfirmation;
        }

        Ok(IngestOutcome::Proposed {
            summary,
            warnings,
            skipped,
            proposals,
        })
    }

    /// AwaitingConfirmation → Emitting → Completed | Failed.
    ///
    /// Emission per group is a single uninterruptible unit once
    /// started; the caller holds this session's lock for the whole
    /// call, so cancellation and eviction cannot interleave.
    #[instrument(skip_all, fields(session_id = %self.session_id, user = %self.user))]
    pub async fn confirm(
        &mut self,
        issuer: &dyn DocumentIssuer,
        prior: &dyn PriorEmissions,
    ) -> SessionResult<EmissionReport> {
        self.guard(SessionState::AwaitingConfirmation, "confirm")?;
        self.touch();
        self.emit_pending(issuer, prior).await
    }

    /// Failed (after a partial emission) → Emitting → Completed | Failed.
    ///
    /// Re-attempts only groups whose last failure was transient; groups
    /// already issued are never re-emitted, and permanent failures are
    /// never retried automatically.
    pub async fn retry_emission(
        &mut self,
        issuer: &dyn DocumentIssuer,
        prior: &dyn PriorEmissions,
    ) -> SessionResult<EmissionReport> {
        self.guard(SessionState::Failed, "retry_emission")?;
        let has_retryable = self.emission_outcomes.iter().any(|o| {
            matches!(
                o.status,
                EmissionStatus::Failed {
                    retryable: true,
                    ..
                }
            )
        });
        if !has_retryable {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "retry_emission",
            });
        }
        self.touch();
        self.emit_pending(issuer, prior).await
    }

    async fn emit_pending(
        &mut self,
        issuer: &dyn DocumentIssuer,
        prior: &dyn PriorEmissions,
    ) -> SessionResult<EmissionReport> {
        self.state = SessionState::Emitting;
        let groups: Vec<Group> = self
            .outcome
            .as_ref()
            .map(|o| o.groups.clone())
            .unwrap_or_default();
        let counterparty_ref = self.profile.counterparty_ref.clone();

        let mut outcomes: Vec<GroupOutcome> = Vec::with_capacity(groups.len());
        for group in &groups {
            if let Some(previous) = self.settled_outcome(&group.key) {
                outcomes.push(previous);
                continue;
            }
            let status = Self::emit_group(issuer, prior, &counterparty_ref, group).await;
            outcomes.push(GroupOutcome {
                group_key: group.key.clone(),
                status,
            });
        }

        self.emission_outcomes = outcomes.clone();
        let report = EmissionReport {
            outcomes,
            state: SessionState::Emitting,
        };
        self.state = if report.all_issued() {
            info!(groups = report.outcomes.len(), "all groups issued");
            SessionState::Completed
        } else {
            warn!(
                failed = report
                    .outcomes
                    .iter()
                    .filter(|o| !matches!(o.status, EmissionStatus::Issued { .. }))
                    .count(),
                "emission finished with per-group failures"
            );
            SessionState::Failed
        };

        Ok(EmissionReport {
            state: self.state,
            ..report
        })
    }

    /// A group's outcome is settled when retrying it would be wrong:
    /// already issued, duplicate, or permanently rejected.
    fn settled_outcome(&self, key: &GroupKey) -> Option<GroupOutcome> {
        self.emission_outcomes
            .iter()
            .find(|o| &o.group_key == key)
            .filter(|o| {
                !matches!(
                    o.status,
                    EmissionStatus::Failed {
                        retryable: true,
                        ..
                    }
                )
            })
            .cloned()
    }

    async fn emit_group(
        issuer: &dyn DocumentIssuer,
        prior: &dyn PriorEmissions,
        counterparty_ref: &str,
        group: &Group,
    ) -> EmissionStatus {
        // Duplicate check happens here, immediately before the issue
        // call, not only at session start: sessions can be resumed or
        // retried after partial failure.
        let fingerprint = AntiDuplicateGuard::fingerprint_group(group);
        match AntiDuplicateGuard::check(prior, counterparty_ref, &fingerprint).await {
            Ok(()) => {}
            Err(EmissionError::Duplicate { existing_ref }) => {
                return EmissionStatus::Duplicate { existing_ref };
            }
            Err(e) => {
                return EmissionStatus::Failed {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                };
            }
        }

        let document = DocumentSynthesizer::synthesize(group, counterparty_ref);
        match issuer.issue(&document, counterparty_ref).await {
            Ok(issued) => {
                info!(group = %group.key, number = %issued.number, "group issued");
                if let Err(e) =
                    AntiDuplicateGuard::record(prior, counterparty_ref, &fingerprint, &issued)
                        .await
                {
                    // The document exists; a failed guard write must not
                    // fail the group.
                    warn!(group = %group.key, error = %e, "prior-emission record failed");
                }
                EmissionStatus::Issued { document: issued }
            }
            Err(e) => {
                warn!(group = %group.key, error = %e, "group issuance failed");
                EmissionStatus::Failed {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                }
            }
        }
    }

    /// User-initiated cancel from any non-terminal state; discards the
    /// working set. An in-flight emission cannot be interrupted because
    /// the session lock is held for the duration of `confirm`.
    pub fn cancel(&mut self) -> SessionResult<()> {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "cancel",
            });
        }
        info!(session_id = %self.session_id, state = %self.state, "session cancelled");
        self.pending_batch = None;
        self.outcome = None;
        self.emission_outcomes.clear();
        self.state = SessionState::Cancelled;
        Ok(())
    }

    /// Per-group outcomes of the last emission attempt.
    pub fn emission_outcomes(&self) -> &[GroupOutcome] {
        &self.emission_outcomes
    }
}
