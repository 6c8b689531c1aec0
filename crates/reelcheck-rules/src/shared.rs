//! Reloadable handle to the active rule set.
//!
//! Readers take an `Arc<RuleSet>` snapshot at the start of a pass and keep
//! it for the whole pass. `reload` builds the new set completely before
//! swapping it in, so a failed reload leaves the previous rules active and
//! no reader ever sees a partially updated tree.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use reelcheck_contracts::{
    error::{ReelcheckError, ReelcheckResult},
    rules::RuleSet,
};

use crate::loader;

#[derive(Debug)]
pub struct SharedRuleSet {
    current: RwLock<Arc<RuleSet>>,
    source: Option<PathBuf>,
}

impl SharedRuleSet {
    /// Wrap an already compiled set. `reload` is unavailable without a
    /// source file; use [`SharedRuleSet::replace`] instead.
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
            source: None,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> ReelcheckResult<Self> {
        let path = path.as_ref();
        let rules = loader::from_file(path)?;
        Ok(Self {
            current: RwLock::new(Arc::new(rules)),
            source: Some(path.to_path_buf()),
        })
    }

    /// The rule set active right now.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Swap in `rules` wholesale.
    pub fn replace(&self, rules: RuleSet) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(rules);
    }

    /// Re-read the source file and swap the result in.
    ///
    /// On error the previous set stays active and the error is returned.
    pub fn reload(&self) -> ReelcheckResult<()> {
        let path = self.source.as_deref().ok_or_else(|| ReelcheckError::ConfigError {
            reason: "rule set was not loaded from a file; nothing to reload".to_string(),
        })?;
        match loader::from_file(path) {
            Ok(rules) => {
                self.replace(rules);
                info!(path = %path.display(), "rule set reloaded");
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rule reload failed; keeping previous rules");
                Err(e)
            }
        }
    }
}
