//! Error types for the reelcheck validation and regeneration pipeline.
//!
//! Only rule-loading and configuration errors are fatal. Everything that
//! concerns a single metadata document is carried as data in the report or
//! the session history; the variants below that describe such conditions
//! exist so callers can turn a terminal session into a `Result`.

use thiserror::Error;

/// The unified error type for reelcheck.
#[derive(Debug, Error)]
pub enum ReelcheckError {
    /// The rule document is malformed. Fatal at load time.
    #[error("rule parse error: {reason}")]
    RuleParse { reason: String },

    /// The metadata document could not be read as a segment list.
    ///
    /// Fails the current pass only; the validator records it as a
    /// document-level error and returns a FAIL report.
    #[error("metadata parse error: {reason}")]
    MetadataParse { reason: String },

    /// The generation service returned an error (network, provider, quota).
    #[error("generation failed: {reason}")]
    GenerationFailed { reason: String },

    /// The generation call did not answer within its time bound.
    #[error("generation timed out after {after_ms} ms")]
    GenerationTimedOut { after_ms: u64 },

    /// Every allowed attempt failed. Requeue or manual review is required.
    #[error("retries exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    /// The session was cancelled by the caller or by its time budget.
    #[error("session cancelled: {reason}")]
    Cancelled { reason: String },

    /// The retry state machine was asked to take an illegal transition.
    #[error("state machine error: {reason}")]
    StateMachine { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The attempt history sink rejected a record.
    #[error("history write failed: {reason}")]
    HistoryWriteFailed { reason: String },

    /// The regeneration queue refused an exhausted session.
    #[error("regeneration queue error: {reason}")]
    QueueFailed { reason: String },
}

impl ReelcheckError {
    /// True for failures of the external generator, which count as a failed
    /// attempt rather than aborting the session.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            ReelcheckError::GenerationFailed { .. } | ReelcheckError::GenerationTimedOut { .. }
        )
    }
}

/// Convenience alias used throughout the reelcheck crates.
pub type ReelcheckResult<T> = Result<T, ReelcheckError>;
