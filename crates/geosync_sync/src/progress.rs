//! Progress reporting and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives advisory progress during a push.
///
/// All methods have no-op defaults. The engine never depends on what a
/// listener does, except for [`ProgressListener::is_cancelled`], which is
/// polled between transfer batches and before each ref update.
pub trait ProgressListener: Send + Sync {
    /// A new stage has started.
    fn started(&self, _description: &str) {}

    /// `done` of `total` units of the current stage are complete.
    fn progress(&self, _done: u64, _total: u64) {}

    /// The current stage has finished.
    fn complete(&self) {}

    /// Returns true if the push should stop at the next checkpoint.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A listener that ignores everything and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressListener for SilentProgress {}

/// A listener whose only job is cancellation.
///
/// Clones share the flag, so one clone can be handed to the push while
/// another is kept to cancel it from a different thread.
#[derive(Debug, Default, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

impl ProgressListener for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
