// ==========================================
// Billing Import Engine - Schema Resolver
// ==========================================
// Maps canonical field names to the actual column headers
// of this particular import, using the counterparty's alias
// table. Pure: no side effects, runs before any data row.
// ==========================================

use crate::domain::record::{AliasTable, SchemaMapping};
use crate::domain::types::CanonicalField;
use crate::importer::error::{ImportError, ImportResult};
use std::collections::BTreeMap;
use tracing::debug;

pub struct SchemaResolver;

impl SchemaResolver {
    /// Resolve every aliased field against the header row.
    ///
    /// Per field: exact (case-sensitive) match first, alias priority
    /// order; then a case-insensitive substring fallback (header
    /// contains alias or alias contains header). First alias that
    /// matches wins, no scoring. Unresolved required fields abort the
    /// import; unresolved optional fields simply stay unmapped and
    /// downstream treats them as absent.
    pub fn resolve(
        headers: &[String],
        aliases: &AliasTable,
        required: &[CanonicalField],
    ) -> ImportResult<SchemaMapping> {
        let mut columns = BTreeMap::new();

        for field in aliases.fields() {
            if let Some(header) = Self::resolve_field(headers, aliases.aliases_for(field)) {
                debug!(field = %field, header = %header, "column resolved");
                columns.insert(field, header);
            }
        }

        let missing: Vec<CanonicalField> = required
            .iter()
            .copied()
            .filter(|f| !columns.contains_key(f))
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::SchemaResolution { missing });
        }

        Ok(SchemaMapping::new(columns))
    }

    fn resolve_field(headers: &[String], aliases: &[String]) -> Option<String> {
        // Pass 1: exact match, alias priority order
        for alias in aliases {
            if let Some(header) = headers.iter().find(|h| h.as_str() == alias.as_str()) {
                return Some(header.clone());
            }
        }

        // Pass 2: case-insensitive substring, either direction
        for alias in aliases {
            let alias_lc = alias.to_lowercase();
            if alias_lc.is_empty() {
                continue;
            }
            let found = headers.iter().find(|h| {
                let header_lc = h.to_lowercase();
                !header_lc.is_empty()
                    && (header_lc.contains(&alias_lc) || alias_lc.contains(&header_lc))
            });
            if let Some(header) = found {
                return Some(header.clone());
            }
        }

        None
    }
}
