//! History entry and log types.
//!
//! `HistoryEntry` wraps one `AttemptRecord` with its chain position and the
//! hashes that make later edits detectable. `HistoryLog` is the exported
//! snapshot of a writer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use reelcheck_contracts::session::{AttemptRecord, SessionId};

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,
    pub session_id: SessionId,
    pub record: AttemptRecord,
    /// `this_hash` of the previous entry, or `GENESIS_HASH` for the first.
    pub prev_hash: String,
    /// SHA-256 (hex) over session id, sequence, `prev_hash` and the record.
    pub this_hash: String,
}

impl HistoryEntry {
    /// `prev_hash` of the first entry in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryLog {
    /// Every entry in chain order, across all sessions written.
    pub entries: Vec<HistoryEntry>,
    /// Sessions that reached a terminal state.
    pub finalized_sessions: Vec<SessionId>,
    pub exported_at: DateTime<Utc>,
    /// `this_hash` of the last entry; empty when nothing was written.
    pub terminal_hash: String,
}

impl HistoryLog {
    pub fn entries_for<'a>(&'a self, session: &'a SessionId) -> impl Iterator<Item = &'a HistoryEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.session_id == *session)
    }
}
