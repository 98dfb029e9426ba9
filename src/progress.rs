//! Per-request stage events.
//!
//! Every request walks the same states:
//!
//! ```text
//! Received ─▶ TypeDetermined ─▶ Extracted ─▶ PromptBuilt ─▶ Analyzed ─▶ Assembled
//!     └──────────────┴──────────────┴─────────────┴────────────┴──▶ Failed
//! ```
//!
//! The processor logs each transition at debug level. Inject an
//! [`Arc<dyn StageObserver>`] via
//! [`crate::process::DocumentProcessor::with_observer`] to receive the same
//! events, e.g. to drive a terminal spinner.
//!
//! # Example
//!
//! ```rust
//! use docproc::progress::{ProcessStage, StageObserver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingObserver(AtomicUsize);
//!
//! impl StageObserver for CountingObserver {
//!     fn on_stage(&self, _request_id: &str, _stage: ProcessStage) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStage {
    Received,
    TypeDetermined,
    Extracted,
    PromptBuilt,
    Analyzed,
    Assembled,
    Failed,
}

impl ProcessStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStage::Received => "received",
            ProcessStage::TypeDetermined => "type_determined",
            ProcessStage::Extracted => "extracted",
            ProcessStage::PromptBuilt => "prompt_built",
            ProcessStage::Analyzed => "analyzed",
            ProcessStage::Assembled => "assembled",
            ProcessStage::Failed => "failed",
        }
    }

    /// `true` for `Assembled` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessStage::Assembled | ProcessStage::Failed)
    }
}

impl fmt::Display for ProcessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives stage transitions for each request.
///
/// Requests are processed concurrently, so implementations must be
/// `Send + Sync` and guard shared state themselves. All methods default to
/// no-ops.
pub trait StageObserver: Send + Sync {
    /// Called on entering `stage`, including the terminal ones.
    fn on_stage(&self, request_id: &str, stage: ProcessStage) {
        let _ = (request_id, stage);
    }

    /// Called once when a request fails, with the stage it failed to leave.
    fn on_failure(&self, request_id: &str, last_stage: ProcessStage, error: &str) {
        let _ = (request_id, last_stage, error);
    }
}

/// Default observer.
pub struct NoopStageObserver;

impl StageObserver for NoopStageObserver {}

pub type SharedObserver = Arc<dyn StageObserver>;
