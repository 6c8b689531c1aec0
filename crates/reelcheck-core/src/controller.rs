//! The retry controller: a bounded generate → validate loop.
//!
//!   AwaitingGeneration → Validating → Accepted
//!                                   → RetryScheduled → AwaitingGeneration
//!                                   → Exhausted
//!   (any non-terminal) → Cancelled
//!
//! Attempts are strictly sequential within a session. Cancellation and the
//! session budget are checked before each generation call, never during
//! one; a generation call is bounded by its own timeout instead. Generator
//! errors and timeouts are failed attempts, not controller errors. The only
//! errors `run` returns are history sink failures and state machine bugs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use reelcheck_contracts::{
    error::{ReelcheckError, ReelcheckResult},
    metadata::MetadataDocument,
    report::{FailureCategory, ValidationReport},
    session::{
        Adjustment, AttemptOutcome, AttemptRecord, GenerationRequest, RetrySession, SessionOutcome,
        SessionState,
    },
};

use crate::config::RetryConfig;
use crate::traits::{
    AdjustmentStrategy, CoverageValidator, GenerationService, HistoryWriter, RegenerationQueue,
    Validator,
};

/// Cooperative cancellation flag shared between a caller and a session.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one attempt produced before the controller decides where to go.
struct AttemptResult {
    outcome: AttemptOutcome,
    document: Option<MetadataDocument>,
    report: Option<ValidationReport>,
    second_opinion: Option<ValidationReport>,
}

impl AttemptResult {
    fn without_output(outcome: AttemptOutcome) -> Self {
        Self {
            outcome,
            document: None,
            report: None,
            second_opinion: None,
        }
    }

    /// Categories the adjustment strategy should address.
    fn failure_categories(&self) -> Vec<FailureCategory> {
        match (&self.outcome, &self.second_opinion, &self.report) {
            (AttemptOutcome::SecondOpinionFailed, Some(second), _) => second.failure_categories(),
            (_, _, Some(report)) => report.failure_categories(),
            _ => Vec::new(),
        }
    }
}

pub struct RetryController {
    generator: Box<dyn GenerationService>,
    validator: Box<dyn Validator>,
    adjuster: Box<dyn AdjustmentStrategy>,
    history: Box<dyn HistoryWriter>,
    coverage: Option<Box<dyn CoverageValidator>>,
    queue: Option<Box<dyn RegenerationQueue>>,
    config: RetryConfig,
}

impl RetryController {
    pub fn new(
        generator: Box<dyn GenerationService>,
        validator: Box<dyn Validator>,
        adjuster: Box<dyn AdjustmentStrategy>,
        history: Box<dyn HistoryWriter>,
        config: RetryConfig,
    ) -> Self {
        Self {
            generator,
            validator,
            adjuster,
            history,
            coverage: None,
            queue: None,
            config,
        }
    }

    /// Consult `coverage` after every primary PASS.
    pub fn with_coverage_validator(mut self, coverage: Box<dyn CoverageValidator>) -> Self {
        self.coverage = Some(coverage);
        self
    }

    /// Hand exhausted sessions to `queue`.
    pub fn with_queue(mut self, queue: Box<dyn RegenerationQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Drive one session to a terminal state.
    ///
    /// Returns the finished session; inspect `session.outcome` or call
    /// `into_result()`. `Err` means the session was aborted: the history
    /// sink rejected a record, or the state machine was misused.
    pub async fn run(
        &self,
        document_ref: impl Into<String>,
        initial: GenerationRequest,
        cancel: &CancelHandle,
    ) -> ReelcheckResult<RetrySession> {
        let mut session = RetrySession::new(document_ref, self.config.max_retries);
        let started = Instant::now();
        let mut request = initial;
        let mut adjustment: Option<Adjustment> = None;

        info!(
            session_id = %session.id,
            document_ref = %session.document_ref,
            max_retries = session.max_retries,
            "retry session started"
        );

        loop {
            // ── AwaitingGeneration ────────────────────────────────────────────
            if let Some(reason) = self.cancellation_reason(cancel, started) {
                return self.finish_cancelled(session, reason);
            }

            debug!(
                session_id = %session.id,
                attempt = session.attempt_number(),
                "requesting generation"
            );
            let result = match self.generate(&request).await {
                Ok(raw) => {
                    session.transition(SessionState::Validating)?;
                    self.evaluate(&raw)
                }
                Err(ReelcheckError::GenerationTimedOut { after_ms }) => {
                    warn!(session_id = %session.id, after_ms, "generation timed out");
                    AttemptResult::without_output(AttemptOutcome::TimedOut { after_ms })
                }
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "generation failed");
                    AttemptResult::without_output(AttemptOutcome::GenerationFailed {
                        reason: e.to_string(),
                    })
                }
            };

            let failed = result.failure_categories();
            let record = AttemptRecord {
                attempt: session.attempt_number(),
                request: request.clone(),
                adjustment: adjustment.take(),
                outcome: result.outcome.clone(),
                report: result.report.clone(),
                second_opinion: result.second_opinion,
                recorded_at: Utc::now(),
            };
            self.history.write(&session.id, &record)?;
            session.history.push(record);

            // ── Accepted ──────────────────────────────────────────────────────
            if result.outcome.is_success() {
                if let (Some(document), Some(report)) = (result.document, result.report) {
                    session.transition(SessionState::Accepted)?;
                    session.outcome = Some(SessionOutcome::Accepted { document, report });
                    return self.finish(session);
                }
            }

            debug!(
                session_id = %session.id,
                attempt = session.attempt_number(),
                failed = failed.len(),
                "attempt rejected"
            );

            // ── Exhausted ─────────────────────────────────────────────────────
            if !session.can_retry() {
                session.transition(SessionState::Exhausted)?;
                let last_report = session.last_report().cloned();
                let requeued = self.requeue(&session.document_ref, last_report.as_ref());
                session.outcome = Some(SessionOutcome::Exhausted {
                    last_report,
                    requeued,
                });
                return self.finish(session);
            }

            // ── RetryScheduled ────────────────────────────────────────────────
            session.transition(SessionState::RetryScheduled)?;
            let next = self.adjuster.propose(&failed, &request);
            debug!(
                session_id = %session.id,
                rationale = %next.rationale,
                "adjusted request for retry"
            );
            request = next.request.clone();
            adjustment = Some(next);
            session.attempt += 1;
            session.transition(SessionState::AwaitingGeneration)?;
        }
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    async fn generate(&self, request: &GenerationRequest) -> ReelcheckResult<String> {
        let limit = self.config.generation_timeout();
        match tokio::time::timeout(limit, self.generator.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(ReelcheckError::GenerationTimedOut {
                after_ms: self.config.generation_timeout_ms,
            }),
        }
    }

    /// Primary validation, then the second opinion if the primary passed.
    fn evaluate(&self, raw: &str) -> AttemptResult {
        let pass = self.validator.validate_raw(raw);
        if !pass.report.passed() {
            return AttemptResult {
                outcome: AttemptOutcome::Failed,
                document: pass.document,
                report: Some(pass.report),
                second_opinion: None,
            };
        }

        let second_opinion = match (&self.coverage, &pass.document) {
            (Some(coverage), Some(document)) => Some(coverage.check(document)),
            _ => None,
        };
        let outcome = match &second_opinion {
            Some(second) if !second.passed() => AttemptOutcome::SecondOpinionFailed,
            _ => AttemptOutcome::Passed,
        };
        AttemptResult {
            outcome,
            document: pass.document,
            report: Some(pass.report),
            second_opinion,
        }
    }

    fn cancellation_reason(&self, cancel: &CancelHandle, started: Instant) -> Option<String> {
        if cancel.is_cancelled() {
            return Some("cancelled by caller".to_string());
        }
        let budget = self.config.session_budget()?;
        let elapsed = started.elapsed();
        if elapsed >= budget {
            return Some(format!(
                "session budget of {} ms exhausted after {} ms",
                budget.as_millis(),
                elapsed.as_millis()
            ));
        }
        None
    }

    fn requeue(&self, document_ref: &str, last_report: Option<&ValidationReport>) -> bool {
        let Some(queue) = &self.queue else {
            return false;
        };
        match queue.enqueue(document_ref, last_report) {
            Ok(()) => true,
            Err(e) => {
                warn!(document_ref, error = %e, "could not requeue exhausted session");
                false
            }
        }
    }

    fn finish_cancelled(&self, mut session: RetrySession, reason: String) -> ReelcheckResult<RetrySession> {
        session.transition(SessionState::Cancelled)?;
        session.outcome = Some(SessionOutcome::Cancelled { reason });
        self.finish(session)
    }

    fn finish(&self, session: RetrySession) -> ReelcheckResult<RetrySession> {
        self.history.finalize(&session.id)?;
        info!(
            session_id = %session.id,
            state = %session.state,
            attempts = session.history.len(),
            "retry session finished"
        );
        Ok(session)
    }
}
