//! Collaborator traits for the retry controller.
//!
//! The controller owns the state machine; everything it talks to sits
//! behind one of these seams:
//!
//! - `GenerationService` : untrusted producer (usually an LLM call)
//! - `Validator`         : trusted gate deciding PASS or FAIL
//! - `CoverageValidator` : optional second opinion after a PASS
//! - `AdjustmentStrategy`: rewrites the request between attempts
//! - `RegenerationQueue` : receives sessions that ran out of retries
//! - `HistoryWriter`     : append-only sink for attempt records
//!
//! Only generation is async. Validation is pure and synchronous.

use async_trait::async_trait;

use reelcheck_contracts::{
    error::ReelcheckResult,
    metadata::MetadataDocument,
    report::{FailureCategory, ValidationPass, ValidationReport},
    session::{Adjustment, AttemptRecord, GenerationRequest, SessionId},
};

/// Produces raw metadata text for a request.
///
/// An `Err` counts as a failed attempt (`GenerationFailed`), not as a fatal
/// controller error. The controller bounds every call with its own timeout,
/// so implementations need not.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> ReelcheckResult<String>;
}

/// Validates generated metadata.
pub trait Validator: Send + Sync {
    /// Parse and validate `raw`.
    ///
    /// Never fails: unparseable input yields a FAIL report with a
    /// `MetadataParseError` document error and no document.
    fn validate_raw(&self, raw: &str) -> ValidationPass;
}

/// An independent check consulted only after the primary validator passed.
///
/// A failing second opinion fails the attempt.
pub trait CoverageValidator: Send + Sync {
    fn check(&self, document: &MetadataDocument) -> ValidationReport;
}

/// Proposes the next request from what went wrong with the previous one.
pub trait AdjustmentStrategy: Send + Sync {
    /// `failed` is the de-duplicated category set of the last report; it is
    /// empty when the last attempt produced no report (timeout, generator
    /// error).
    fn propose(&self, failed: &[FailureCategory], previous: &GenerationRequest) -> Adjustment;
}

/// Destination for documents that exhausted their retries.
pub trait RegenerationQueue: Send + Sync {
    fn enqueue(&self, document_ref: &str, last_report: Option<&ValidationReport>) -> ReelcheckResult<()>;
}

/// Append-only sink for attempt history.
///
/// A failed write aborts the session with `HistoryWriteFailed`.
pub trait HistoryWriter: Send + Sync {
    fn write(&self, session: &SessionId, record: &AttemptRecord) -> ReelcheckResult<()>;

    /// Called once when the session reaches a terminal state.
    fn finalize(&self, session: &SessionId) -> ReelcheckResult<()>;
}
