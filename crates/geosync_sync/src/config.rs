//! Configuration for push operations.

/// How multiple refspecs of one push are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushMode {
    /// Negotiate every refspec before transferring anything; the first
    /// failure aborts the whole push with no objects sent and no ref
    /// updated.
    #[default]
    Atomic,
    /// Push each refspec to completion on its own; failures are reported
    /// per refspec after all of them have been attempted.
    Independent,
}

/// Configuration for push operations.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Session policy for multiple refspecs.
    pub mode: PushMode,
    /// Maximum number of objects sent per transfer call.
    pub transfer_batch_size: usize,
    /// Attempts at the remote compare-and-set, counting the first one.
    pub max_update_attempts: u32,
    /// Whether to record pushed branches under `refs/remotes/<remote>/`.
    pub update_tracking_refs: bool,
}

impl PushConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: PushMode::Atomic,
            transfer_batch_size: 256,
            max_update_attempts: 2,
            update_tracking_refs: true,
        }
    }

    /// Sets the session policy.
    #[must_use]
    pub fn with_mode(mut self, mode: PushMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the transfer batch size (at least 1).
    #[must_use]
    pub fn with_transfer_batch_size(mut self, size: usize) -> Self {
        self.transfer_batch_size = size.max(1);
        self
    }

    /// Sets the number of compare-and-set attempts (at least 1).
    #[must_use]
    pub fn with_max_update_attempts(mut self, attempts: u32) -> Self {
        self.max_update_attempts = attempts.max(1);
        self
    }

    /// Sets whether remote-tracking refs are updated.
    #[must_use]
    pub fn with_tracking_refs(mut self, update: bool) -> Self {
        self.update_tracking_refs = update;
        self
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self::new()
    }
}
