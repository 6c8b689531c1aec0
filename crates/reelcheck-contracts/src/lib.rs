//! # reelcheck-contracts
//!
//! Shared types for the reelcheck video-metadata validator.
//!
//! All crates in the workspace import from here. No validation logic lives
//! in this crate: only the compiled rule tree, the metadata document, the
//! report, the retry session and the error type.

pub mod error;
pub mod metadata;
pub mod report;
pub mod rules;
pub mod session;
