//! Push coordinator.
//!
//! The coordinator drives resolved refspecs through negotiation, object
//! transfer and the remote compare-and-set, and records the result of each
//! one. It never overwrites a remote ref it has not observed: the update
//! is conditional on the value seen during negotiation, and a lost race is
//! answered by negotiating again.

use crate::config::{PushConfig, PushMode};
use crate::error::{SyncError, SyncResult};
use crate::negotiate::{HistoryNegotiator, Negotiation, PushPlan};
use crate::progress::{ProgressListener, SilentProgress};
use crate::refspec::ResolvedRefSpec;
use crate::state::{PushOutcome, PushState, PushStats, RefUpdateReport};
use crate::transport::RemoteTransport;
use geosync_store::{branch_name, tracking_ref, ObjectId, RefTarget, Repository, StoreResult};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pushes refs from a local repository to one remote.
pub struct PushCoordinator<T: RemoteTransport> {
    local: Repository,
    remote_name: String,
    transport: Arc<T>,
    config: PushConfig,
    progress: Arc<dyn ProgressListener>,
    stats: RwLock<PushStats>,
    cancelled: AtomicBool,
}

impl<T: RemoteTransport> PushCoordinator<T> {
    /// Creates a coordinator.
    ///
    /// `remote_name` is used for remote-tracking refs only.
    pub fn new(
        local: Repository,
        remote_name: impl Into<String>,
        transport: T,
        config: PushConfig,
    ) -> Self {
        Self {
            local,
            remote_name: remote_name.into(),
            transport: Arc::new(transport),
            config,
            progress: Arc::new(SilentProgress),
            stats: RwLock::new(PushStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Sets the progress listener.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressListener>) -> Self {
        self.progress = progress;
        self
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gets the stats of the last push.
    pub fn stats(&self) -> PushStats {
        self.stats.read().clone()
    }

    /// Cancels the push at its next checkpoint.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancelled flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) || self.progress.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn negotiator(&self) -> HistoryNegotiator<'_> {
        HistoryNegotiator::new(&self.local, &*self.transport, &*self.progress)
    }

    /// Pushes the given refspecs.
    ///
    /// In [`PushMode::Atomic`] the first failure is returned as the error.
    /// In [`PushMode::Independent`] every refspec is attempted and failures
    /// are recorded in the outcome's reports; use
    /// [`PushOutcome::into_result`] to surface the first one.
    pub fn push(&self, refspecs: &[ResolvedRefSpec]) -> SyncResult<PushOutcome> {
        let start = Instant::now();
        *self.stats.write() = PushStats::default();

        info!(
            remote = %self.remote_name,
            url = %self.transport.url(),
            refspecs = refspecs.len(),
            mode = ?self.config.mode,
            "push started"
        );

        let mut reports: Vec<RefUpdateReport> = refspecs
            .iter()
            .cloned()
            .map(RefUpdateReport::new)
            .collect();

        match self.config.mode {
            PushMode::Atomic => {
                if let Err(e) = self.push_atomic(&mut reports) {
                    warn!(remote = %self.remote_name, error = %e, "push failed");
                    return Err(e);
                }
            }
            PushMode::Independent => self.push_independent(&mut reports),
        }

        let stats = self.stats();
        let data_pushed = stats.objects_transferred > 0 || stats.refs_updated > 0;
        info!(
            remote = %self.remote_name,
            objects = stats.objects_transferred,
            updated = stats.refs_updated,
            up_to_date = stats.refs_up_to_date,
            "push finished"
        );

        Ok(PushOutcome {
            data_pushed,
            reports,
            stats,
            duration: start.elapsed(),
        })
    }

    /// Negotiates everything, then transfers everything, then updates.
    fn push_atomic(&self, reports: &mut [RefUpdateReport]) -> SyncResult<()> {
        let negotiator = self.negotiator();

        let mut plans = Vec::new();
        for (idx, report) in reports.iter_mut().enumerate() {
            if let Some(plan) = self.negotiate_one(&negotiator, report)? {
                plans.push((idx, plan));
            }
        }

        let mut sent = HashSet::new();
        for (idx, plan) in &plans {
            let report = &mut reports[*idx];
            report.advance(PushState::Transferring)?;
            report.objects_transferred += self.transfer(&plan.missing, &mut sent)?;
        }

        for (idx, plan) in plans {
            self.update(&negotiator, &mut reports[idx], plan, &mut sent)?;
        }
        Ok(())
    }

    /// Runs each refspec to completion before starting the next one.
    fn push_independent(&self, reports: &mut [RefUpdateReport]) {
        let negotiator = self.negotiator();
        let mut sent = HashSet::new();

        for report in reports.iter_mut() {
            if self.check_cancelled().is_err() {
                report.fail(SyncError::Cancelled);
                continue;
            }
            if let Err(e) = self.push_one(&negotiator, report, &mut sent) {
                warn!(refspec = %report.refspec, error = %e, "refspec failed");
                report.fail(e);
            }
        }
    }

    fn push_one(
        &self,
        negotiator: &HistoryNegotiator<'_>,
        report: &mut RefUpdateReport,
        sent: &mut HashSet<ObjectId>,
    ) -> SyncResult<()> {
        let Some(plan) = self.negotiate_one(negotiator, report)? else {
            return Ok(());
        };
        report.advance(PushState::Transferring)?;
        report.objects_transferred += self.transfer(&plan.missing, sent)?;
        self.update(negotiator, report, plan, sent)
    }

    /// Negotiates one refspec; returns `None` if it is already up to date.
    fn negotiate_one(
        &self,
        negotiator: &HistoryNegotiator<'_>,
        report: &mut RefUpdateReport,
    ) -> SyncResult<Option<PushPlan>> {
        report.advance(PushState::Negotiating)?;
        match negotiator.negotiate(&report.refspec)? {
            Negotiation::UpToDate { commit, .. } => {
                report.old = Some(commit);
                report.new = Some(commit);
                report.advance(PushState::UpToDate)?;
                self.stats.write().refs_up_to_date += 1;
                self.record_tracking_ref(&report.refspec, commit);
                Ok(None)
            }
            Negotiation::Update(plan) => {
                report.old = plan.expected_old;
                report.new = Some(plan.new);
                Ok(Some(plan))
            }
        }
    }

    /// Sends objects not sent earlier in this push, in batches.
    fn transfer(&self, missing: &[ObjectId], sent: &mut HashSet<ObjectId>) -> SyncResult<u64> {
        let pending: Vec<ObjectId> = missing
            .iter()
            .filter(|oid| !sent.contains(*oid))
            .copied()
            .collect();
        if pending.is_empty() {
            return Ok(0);
        }

        let total = pending.len() as u64;
        let mut done = 0;
        self.progress
            .started(&format!("sending {} objects", total));

        for chunk in pending.chunks(self.config.transfer_batch_size.max(1)) {
            self.check_cancelled()?;
            let objects = chunk
                .iter()
                .map(|oid| self.local.objects().get(oid))
                .collect::<StoreResult<Vec<_>>>()?;
            self.transport.send_objects(&objects)?;

            sent.extend(chunk.iter().copied());
            done += chunk.len() as u64;
            self.stats.write().objects_transferred += chunk.len() as u64;
            self.progress.progress(done, total);
            debug!(done, total, "sent object batch");
        }

        self.progress.complete();
        Ok(total)
    }

    /// Compare-and-sets the remote ref, negotiating again after a lost race.
    fn update(
        &self,
        negotiator: &HistoryNegotiator<'_>,
        report: &mut RefUpdateReport,
        mut plan: PushPlan,
        sent: &mut HashSet<ObjectId>,
    ) -> SyncResult<()> {
        let mut attempt = 1;
        loop {
            self.check_cancelled()?;
            report.advance(PushState::Updating)?;

            let remote_ref = &plan.refspec.remote_ref;
            if self
                .transport
                .compare_and_set(remote_ref, plan.expected_old, plan.new)?
            {
                report.advance(PushState::Done)?;
                self.stats.write().refs_updated += 1;
                info!(
                    remote_ref = %remote_ref,
                    old = ?plan.expected_old,
                    new = %plan.new.short(),
                    "remote ref updated"
                );
                self.record_tracking_ref(&plan.refspec, plan.new);
                return Ok(());
            }

            if attempt >= self.config.max_update_attempts {
                return Err(SyncError::RemoteHasDivergentChanges {
                    remote_ref: remote_ref.clone(),
                });
            }
            attempt += 1;
            self.stats.write().update_retries += 1;
            warn!(remote_ref = %remote_ref, attempt, "remote ref moved during push; renegotiating");

            report.advance(PushState::Negotiating)?;
            match negotiator.negotiate(&plan.refspec)? {
                Negotiation::UpToDate { commit, .. } => {
                    report.old = Some(commit);
                    report.advance(PushState::UpToDate)?;
                    self.stats.write().refs_up_to_date += 1;
                    self.record_tracking_ref(&plan.refspec, commit);
                    return Ok(());
                }
                Negotiation::Update(next) => {
                    report.old = next.expected_old;
                    report.advance(PushState::Transferring)?;
                    report.objects_transferred += self.transfer(&next.missing, sent)?;
                    plan = next;
                }
            }
        }
    }

    fn record_tracking_ref(&self, refspec: &ResolvedRefSpec, commit: ObjectId) {
        if !self.config.update_tracking_refs {
            return;
        }
        let Some(branch) = branch_name(&refspec.remote_ref) else {
            return;
        };
        let name = tracking_ref(&self.remote_name, branch);
        match self.set_tracking_ref(&name, commit) {
            Ok(true) => debug!(tracking_ref = %name, commit = %commit.short(), "tracking ref updated"),
            Ok(false) => warn!(tracking_ref = %name, "tracking ref changed concurrently; left as is"),
            Err(e) => warn!(tracking_ref = %name, error = %e, "failed to update tracking ref"),
        }
    }

    fn set_tracking_ref(&self, name: &str, commit: ObjectId) -> SyncResult<bool> {
        let refs = self.local.refs();
        let current = match refs.resolve(name)? {
            Some(RefTarget::Direct(oid)) if oid == commit => return Ok(true),
            Some(RefTarget::Direct(oid)) => Some(oid),
            Some(RefTarget::Symbolic(_)) => return Ok(false),
            None => None,
        };
        Ok(refs.compare_and_set(name, current, commit)?)
    }
}
