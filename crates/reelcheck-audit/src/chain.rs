//! Hash chain primitives.
//!
//! Hash input, in order:
//!   1. session id as UTF-8
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 (64 hex chars)
//!   4. compact JSON of the attempt record

use sha2::{Digest, Sha256};

use reelcheck_contracts::{
    error::{ReelcheckError, ReelcheckResult},
    session::{AttemptRecord, SessionId},
};

use crate::event::HistoryEntry;

/// SHA-256 of one entry as lowercase hex.
pub fn hash_entry(
    session_id: &SessionId,
    sequence: u64,
    record: &AttemptRecord,
    prev_hash: &str,
) -> ReelcheckResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| ReelcheckError::HistoryWriteFailed {
        reason: format!("attempt record is not serializable: {e}"),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(session_id.to_string().as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// True when every entry links to its predecessor and its stored hash
/// matches the recomputed one. An empty chain is valid.
pub fn verify_chain(entries: &[HistoryEntry]) -> bool {
    let mut expected_prev = HistoryEntry::GENESIS_HASH.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return false;
        }
        match hash_entry(&entry.session_id, entry.sequence, &entry.record, &entry.prev_hash) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }
        expected_prev = entry.this_hash.clone();
    }

    true
}
