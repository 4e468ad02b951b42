// ==========================================
// Billing Import Engine - Document Synthesizer
// ==========================================
// Pure function over a non-skipped Group: one line item per
// source record, description built from a fixed audit template
// so every line traces back to its row. No network or storage
// access; this is the proposal stage before confirmation.
// ==========================================

use crate::domain::document::{Group, LineItem, SynthesizedDocument};
use crate::domain::record::ValidatedRow;
use tracing::debug;

pub struct DocumentSynthesizer;

impl DocumentSynthesizer {
    pub fn synthesize(group: &Group, counterparty_ref: &str) -> SynthesizedDocument {
        let line_items: Vec<LineItem> = group
            .records
            .iter()
            .map(|record| LineItem {
                description: Self::describe(record),
                amount: record.amount,
            })
            .collect();

        debug!(
            group = %group.key,
            line_items = line_items.len(),
            total = %group.total,
            "document synthesized"
        );

        SynthesizedDocument {
            group_key: group.key.clone(),
            line_items,
            total: group.total,
            tax_profile: group.tax_profile.clone(),
            counterparty_ref: counterparty_ref.to_string(),
        }
    }

    // Fixed template: "<case> | <category> | <amount>[ | adj <adjustment>]".
    // Case number is omitted when the import carried no such column.
    fn describe(record: &ValidatedRow) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(4);
        if let Some(case) = &record.case_number {
            parts.push(case.clone());
        }
        parts.push(record.category.trim().to_uppercase());
        parts.push(record.amount.to_string());
        if let Some(adjustment) = record.adjustment {
            if !adjustment.is_zero() {
                parts.push(format!("adj {}", adjustment));
            }
        }
        parts.join(" | ")
    }
}
