//! Retry session state and attempt history.
//!
//! A `RetrySession` covers one logical generation request: a bounded
//! sequence of generate → validate attempts. Its history is append-only so
//! an operator can see afterwards why each regeneration was triggered.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReelcheckError, ReelcheckResult};
use crate::metadata::MetadataDocument;
use crate::report::ValidationReport;

/// Unique identifier for one retry session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What is sent to the generation service for one attempt.
///
/// `params` is opaque to the controller; only the adjustment strategy and
/// the generation service interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub params: serde_json::Value,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            params: serde_json::Value::Null,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

/// A change proposed by the adjustment strategy between attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// The request the next attempt will send.
    pub request: GenerationRequest,
    /// Why the strategy changed what it changed, for the audit trail.
    pub rationale: String,
}

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Passed,
    Failed,
    /// The optional coverage validator rejected a document the primary
    /// validator accepted.
    SecondOpinionFailed,
    /// The generation call did not return in time. Counts as a failure.
    TimedOut { after_ms: u64 },
    /// The generation call returned an error. Counts as a failure.
    GenerationFailed { reason: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Passed)
    }
}

/// One entry of the session history.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt: u32,
    pub request: GenerationRequest,
    /// The adjustment that produced `request`; `None` on the first attempt.
    pub adjustment: Option<Adjustment>,
    pub outcome: AttemptOutcome,
    /// Absent when generation itself failed or timed out.
    pub report: Option<ValidationReport>,
    pub second_opinion: Option<ValidationReport>,
    pub recorded_at: DateTime<Utc>,
}

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingGeneration,
    Validating,
    RetryScheduled,
    Accepted,
    Exhausted,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Accepted | SessionState::Exhausted | SessionState::Cancelled
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AwaitingGeneration => "awaiting_generation",
            SessionState::Validating => "validating",
            SessionState::RetryScheduled => "retry_scheduled",
            SessionState::Accepted => "accepted",
            SessionState::Exhausted => "exhausted",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// A single edge taken by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub attempt: u32,
    pub from: SessionState,
    pub to: SessionState,
    pub at: DateTime<Utc>,
}

/// Terminal result of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    Accepted {
        document: MetadataDocument,
        report: ValidationReport,
    },
    Exhausted {
        /// Report of the last attempt; `None` if it never produced output.
        last_report: Option<ValidationReport>,
        requeued: bool,
    },
    Cancelled {
        reason: String,
    },
}

/// The full record of one bounded generate → validate loop.
#[derive(Debug, Clone, Serialize)]
pub struct RetrySession {
    pub id: SessionId,
    /// Caller's reference for the document being generated (asset id, path).
    pub document_ref: String,
    /// Retries used so far; 0 during the first attempt.
    pub attempt: u32,
    pub max_retries: u32,
    pub state: SessionState,
    pub history: Vec<AttemptRecord>,
    pub transitions: Vec<StateTransition>,
    pub outcome: Option<SessionOutcome>,
}

impl RetrySession {
    pub fn new(document_ref: impl Into<String>, max_retries: u32) -> Self {
        Self {
            id: SessionId::new(),
            document_ref: document_ref.into(),
            attempt: 0,
            max_retries,
            state: SessionState::AwaitingGeneration,
            history: Vec::new(),
            transitions: Vec::new(),
            outcome: None,
        }
    }

    /// 1-based number of the attempt in progress.
    pub fn attempt_number(&self) -> u32 {
        self.attempt + 1
    }

    /// True while another retry is allowed after a failed attempt.
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_retries
    }

    /// Move to `to`, logging the edge.
    ///
    /// Terminal states are sticky: a transition out of one is a programming
    /// error and is reported as `StateMachine` rather than applied.
    pub fn transition(&mut self, to: SessionState) -> ReelcheckResult<()> {
        if self.state.is_terminal() {
            return Err(ReelcheckError::StateMachine {
                reason: format!("session {} is already {}; cannot move to {}", self.id, self.state, to),
            });
        }
        self.transitions.push(StateTransition {
            attempt: self.attempt_number(),
            from: self.state,
            to,
            at: Utc::now(),
        });
        self.state = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn last_report(&self) -> Option<&ValidationReport> {
        self.history.iter().rev().find_map(|record| record.report.as_ref())
    }

    /// Convert a terminal session into a `Result`.
    ///
    /// `Accepted` yields the document and its report; `Exhausted` and
    /// `Cancelled` become `RetryExhausted` and `Cancelled` errors.
    pub fn into_result(self) -> ReelcheckResult<(MetadataDocument, ValidationReport)> {
        match self.outcome {
            Some(SessionOutcome::Accepted { document, report }) => Ok((document, report)),
            Some(SessionOutcome::Exhausted { .. }) => Err(ReelcheckError::RetryExhausted {
                attempts: self.history.len() as u32,
            }),
            Some(SessionOutcome::Cancelled { reason }) => Err(ReelcheckError::Cancelled { reason }),
            None => Err(ReelcheckError::StateMachine {
                reason: format!("session {} has not terminated (state {})", self.id, self.state),
            }),
        }
    }
}
