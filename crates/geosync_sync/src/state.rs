//! Per-refspec push state and push outcomes.

use crate::error::{SyncError, SyncResult};
use crate::refspec::ResolvedRefSpec;
use geosync_store::ObjectId;
use std::time::Duration;
use tracing::trace;

/// Where a single refspec is in the push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// The refspec is being resolved.
    Resolving,
    /// Local and remote history are being compared.
    Negotiating,
    /// The remote already has the local commit.
    UpToDate,
    /// Missing objects are being sent.
    Transferring,
    /// The remote ref is being compare-and-set.
    Updating,
    /// The remote ref was updated.
    Done,
    /// The refspec failed; see [`RefUpdateReport::error`].
    Failed,
}

impl PushState {
    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PushState::UpToDate | PushState::Done | PushState::Failed)
    }

    /// Returns true if `next` may follow this state.
    ///
    /// `Updating -> Negotiating` is the retry after a lost compare-and-set.
    pub fn can_transition_to(&self, next: PushState) -> bool {
        use PushState::*;
        match (self, next) {
            (state, Failed) => !state.is_terminal(),
            (Resolving, Negotiating) => true,
            (Negotiating, UpToDate | Transferring) => true,
            (Transferring, Updating) => true,
            (Updating, Done | Negotiating) => true,
            _ => false,
        }
    }
}

/// The result of one refspec.
#[derive(Debug)]
pub struct RefUpdateReport {
    /// The refspec.
    pub refspec: ResolvedRefSpec,
    /// Final (or current) state.
    pub state: PushState,
    /// Remote value before the push, if the ref existed.
    pub old: Option<ObjectId>,
    /// The pushed commit, once known.
    pub new: Option<ObjectId>,
    /// Objects sent for this refspec.
    pub objects_transferred: u64,
    /// Why the refspec failed.
    pub error: Option<SyncError>,
}

impl RefUpdateReport {
    /// Creates a report in the `Resolving` state.
    pub fn new(refspec: ResolvedRefSpec) -> Self {
        Self {
            refspec,
            state: PushState::Resolving,
            old: None,
            new: None,
            objects_transferred: 0,
            error: None,
        }
    }

    /// Moves to `next`, rejecting transitions the state machine forbids.
    pub fn advance(&mut self, next: PushState) -> SyncResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", self.state),
                to: format!("{:?}", next),
            });
        }
        trace!(refspec = %self.refspec, from = ?self.state, to = ?next, "push state");
        self.state = next;
        Ok(())
    }

    /// Records a failure.
    pub fn fail(&mut self, error: SyncError) {
        self.state = PushState::Failed;
        self.error = Some(error);
    }

    /// Returns true if the remote ref was changed.
    pub fn is_updated(&self) -> bool {
        self.state == PushState::Done
    }
}

/// Statistics about a push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushStats {
    /// Objects sent to the remote.
    pub objects_transferred: u64,
    /// Remote refs updated.
    pub refs_updated: u64,
    /// Refspecs that needed no update.
    pub refs_up_to_date: u64,
    /// Compare-and-set attempts after the first.
    pub update_retries: u64,
}

/// Result of a push.
#[derive(Debug)]
pub struct PushOutcome {
    /// Whether any object was sent or any remote ref changed.
    pub data_pushed: bool,
    /// One report per refspec, in argument order.
    pub reports: Vec<RefUpdateReport>,
    /// Aggregate statistics.
    pub stats: PushStats,
    /// Wall time of the push.
    pub duration: Duration,
}

impl PushOutcome {
    /// Returns true if every refspec succeeded.
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(|r| r.error.is_none())
    }

    /// Returns the reports that failed.
    pub fn failures(&self) -> impl Iterator<Item = &RefUpdateReport> {
        self.reports.iter().filter(|r| r.error.is_some())
    }

    /// Turns the first per-refspec failure into an error.
    pub fn into_result(mut self) -> SyncResult<Self> {
        match self.reports.iter_mut().find_map(|r| r.error.take()) {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}
