// ==========================================
// Billing Import Engine - Session Layer
// ==========================================
// Per-user import sessions: the state machine itself, the store that
// keeps one live session per user, and TTL-based eviction.
// ==========================================

pub mod error;
pub mod import_session;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use import_session::{
    EmissionReport, EmissionStatus, GroupOutcome, ImportSession, IngestOutcome, RuleChoice,
};
pub use store::{spawn_sweeper, InMemorySessionStore, SessionHandle, SessionStore};

use crate::importer::file_parser::{ParsedSheet, UniversalFileParser};
use std::path::PathBuf;

/// Parse a spreadsheet off the async path. The parsers are blocking
/// (calamine reads the whole workbook), so the read runs on the
/// blocking pool before the session lock is taken.
pub async fn load_sheet(path: PathBuf) -> crate::importer::error::ImportResult<ParsedSheet> {
    tokio::task::spawn_blocking(move || UniversalFileParser.parse(&path))
        .await
        .map_err(|e| crate::importer::error::ImportError::Internal(e.to_string()))?
}
