//! # reelcheck-core
//!
//! The bounded regeneration loop for AI-generated video metadata.
//!
//! This crate provides:
//! - The collaborator traits (`GenerationService`, `Validator`,
//!   `CoverageValidator`, `AdjustmentStrategy`, `RegenerationQueue`,
//!   `HistoryWriter`)
//! - The `RetryController` state machine that wires them together
//! - `ControllerConfig`, loaded from TOML
//! - `HintingAdjuster`, a default adjustment strategy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reelcheck_core::{RetryController, CancelHandle};
//!
//! let controller = RetryController::new(generator, validator, adjuster, history, config.retry);
//! let session = controller.run("asset-42", request, &CancelHandle::new()).await?;
//! ```

pub mod adjust;
pub mod config;
pub mod controller;
pub mod traits;

pub use adjust::HintingAdjuster;
pub use config::{ControllerConfig, RetryConfig, ValidationConfig};
pub use controller::{CancelHandle, RetryController};

// ── Tests ────────────────────────────────────────────────────────────────────
