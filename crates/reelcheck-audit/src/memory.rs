//! In-memory implementation of `HistoryWriter`.
//!
//! `InMemoryHistoryWriter` keeps one hash chain for every session written
//! through it. Entries are never rewritten; `export_log()` hands out a copy
//! and `verify_integrity()` recomputes the chain on demand.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info};

use reelcheck_contracts::{
    error::{ReelcheckError, ReelcheckResult},
    session::{AttemptRecord, SessionId},
};
use reelcheck_core::traits::HistoryWriter;

use crate::{
    chain::{hash_entry, verify_chain},
    event::{HistoryEntry, HistoryLog},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    /// All entries written so far, in append order.
    pub(crate) entries: Vec<HistoryEntry>,

    pub(crate) sequence: u64,

    /// `this_hash` of the last entry, or `GENESIS_HASH` before any write.
    pub(crate) last_hash: String,

    pub(crate) finalized: Vec<SessionId>,
}

// ── Public writer ─────────────────────────────────────────────────────────────

/// Append-only attempt history backed by a SHA-256 hash chain.
///
/// Cloning the writer shares the chain, so a caller can keep a handle for
/// export while the controller owns the boxed trait object.
#[derive(Clone)]
pub struct InMemoryHistoryWriter {
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl Default for InMemoryHistoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHistoryWriter {
    pub fn new() -> Self {
        let state = InMemoryState {
            entries: Vec::new(),
            sequence: 0,
            last_hash: HistoryEntry::GENESIS_HASH.to_string(),
            finalized: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Snapshot of every entry written so far.
    pub fn export_log(&self) -> HistoryLog {
        let state = self.read_state();
        let terminal_hash = state
            .entries
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();

        HistoryLog {
            entries: state.entries.clone(),
            finalized_sessions: state.finalized.clone(),
            exported_at: Utc::now(),
            terminal_hash,
        }
    }

    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.read_state().entries)
    }

    pub fn is_finalized(&self, session: &SessionId) -> bool {
        self.read_state().finalized.contains(session)
    }

    // Readers tolerate a poisoned lock; the chain itself is checked by hash.
    fn read_state(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> ReelcheckResult<MutexGuard<'_, InMemoryState>> {
        self.state.lock().map_err(|e| ReelcheckError::HistoryWriteFailed {
            reason: format!("history state lock poisoned: {}", e),
        })
    }
}

// ── HistoryWriter impl ────────────────────────────────────────────────────────

impl HistoryWriter for InMemoryHistoryWriter {
    fn write(&self, session: &SessionId, record: &AttemptRecord) -> ReelcheckResult<()> {
        let mut state = self.write_state()?;

        if state.finalized.contains(session) {
            return Err(ReelcheckError::HistoryWriteFailed {
                reason: format!("session {session} is already finalized"),
            });
        }

        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash = hash_entry(session, sequence, record, &prev_hash)?;

        state.entries.push(HistoryEntry {
            sequence,
            session_id: session.clone(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash;

        debug!(session_id = %session, sequence, attempt = record.attempt, "attempt recorded");
        Ok(())
    }

    fn finalize(&self, session: &SessionId) -> ReelcheckResult<()> {
        let mut state = self.write_state()?;

        if !state.finalized.contains(session) {
            state.finalized.push(session.clone());
        }
        let entry_count = state
            .entries
            .iter()
            .filter(|entry| entry.session_id == *session)
            .count();

        info!(
            session_id = %session,
            entry_count,
            terminal_hash = %state.last_hash,
            "attempt history finalized"
        );

        Ok(())
    }
}
