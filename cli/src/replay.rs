//! Collaborators for `reelcheck replay`.
//!
//! `ReplayGenerator` stands in for the generation service by handing out
//! previously captured model answers, one file per attempt, in order.
//! `LoggingQueue` accepts exhausted sessions and only reports them.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use reelcheck_contracts::{
    error::{ReelcheckError, ReelcheckResult},
    report::ValidationReport,
    session::GenerationRequest,
};
use reelcheck_core::traits::{GenerationService, RegenerationQueue};

pub struct ReplayGenerator {
    remaining: Mutex<VecDeque<(PathBuf, String)>>,
}

impl ReplayGenerator {
    /// Read every attempt file up front so a missing file fails before the
    /// session starts.
    pub fn from_files(paths: &[PathBuf]) -> ReelcheckResult<Self> {
        let attempts = paths
            .iter()
            .map(|path| read_attempt(path).map(|raw| (path.clone(), raw)))
            .collect::<ReelcheckResult<VecDeque<_>>>()?;
        Ok(Self::from_answers(attempts))
    }

    pub fn from_answers(answers: VecDeque<(PathBuf, String)>) -> Self {
        Self {
            remaining: Mutex::new(answers),
        }
    }
}

#[async_trait]
impl GenerationService for ReplayGenerator {
    async fn generate(&self, request: &GenerationRequest) -> ReelcheckResult<String> {
        let next = self
            .remaining
            .lock()
            .map_err(|e| ReelcheckError::GenerationFailed {
                reason: format!("replay state lock poisoned: {e}"),
            })?
            .pop_front();

        match next {
            Some((path, raw)) => {
                debug!(file = %path.display(), prompt_len = request.prompt.len(), "replaying attempt");
                Ok(raw)
            }
            None => Err(ReelcheckError::GenerationFailed {
                reason: "no recorded attempts left to replay".to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct LoggingQueue;

impl RegenerationQueue for LoggingQueue {
    fn enqueue(&self, document_ref: &str, last_report: Option<&ValidationReport>) -> ReelcheckResult<()> {
        let categories = last_report
            .map(|report| report.failure_categories().len())
            .unwrap_or_default();
        warn!(document_ref, failure_categories = categories, "queued for manual regeneration");
        Ok(())
    }
}

fn read_attempt(path: &Path) -> ReelcheckResult<String> {
    std::fs::read_to_string(path).map_err(|e| ReelcheckError::ConfigError {
        reason: format!("failed to read attempt file '{}': {}", path.display(), e),
    })
}
