//! reelcheck-audit: tamper-evident attempt history for retry sessions.
//!
//! Every `AttemptRecord` the retry controller produces is appended to a
//! SHA-256 hash chain. Each entry stores the hash of its predecessor, so
//! editing or dropping an entry after the fact breaks `verify_chain`.

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_entry, verify_chain};
pub use event::{HistoryEntry, HistoryLog};
pub use memory::InMemoryHistoryWriter;
