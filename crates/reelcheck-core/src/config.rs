//! Controller configuration.
//!
//! ```toml
//! [retry]
//! max_retries = 2
//! generation_timeout_ms = 60000
//! session_budget_ms = 300000
//!
//! [validation]
//! total_duration = 3600
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use reelcheck_contracts::error::{ReelcheckError, ReelcheckResult};

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub retry: RetryConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Upper bound on a single generation call.
    pub generation_timeout_ms: u64,
    /// Wall-clock budget for the whole session, checked between attempts.
    pub session_budget_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            generation_timeout_ms: DEFAULT_GENERATION_TIMEOUT_MS,
            session_budget_ms: None,
        }
    }
}

impl RetryConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn session_budget(&self) -> Option<Duration> {
        self.session_budget_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Video length in timestamp units, for `must_cover_full_video`.
    pub total_duration: Option<u32>,
}

impl ControllerConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `ConfigError` if the TOML is malformed or a value is out of
    /// range.
    pub fn from_toml_str(s: &str) -> ReelcheckResult<Self> {
        let config: ControllerConfig = toml::from_str(s).map_err(|e| ReelcheckError::ConfigError {
            reason: format!("failed to parse controller TOML: {}", e),
        })?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ReelcheckResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ReelcheckError::ConfigError {
            reason: format!("failed to read controller config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    fn check(&self) -> ReelcheckResult<()> {
        if self.retry.generation_timeout_ms == 0 {
            return Err(ReelcheckError::ConfigError {
                reason: "retry.generation_timeout_ms must be greater than zero".to_string(),
            });
        }
        if self.retry.session_budget_ms == Some(0) {
            return Err(ReelcheckError::ConfigError {
                reason: "retry.session_budget_ms must be greater than zero when set".to_string(),
            });
        }
        Ok(())
    }
}
