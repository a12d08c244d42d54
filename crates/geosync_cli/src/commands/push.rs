//! Push command implementation.

use crate::progress::ConsoleProgress;
use geosync_store::Repository;
use geosync_sync::{PushOp, PushOutcome, SyncError, SyncResult};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Runs the push command.
///
/// Per-refspec failures are turned into an error, so a successful return
/// means every refspec was pushed or already up to date.
pub fn run(
    path: &Path,
    remote: Option<&str>,
    refspecs: &[String],
    all: bool,
    verbose: bool,
) -> SyncResult<PushOutcome> {
    let repo = Repository::open(path)?;

    let mut op = PushOp::new(repo)
        .with_refspecs(refspecs.iter().cloned())
        .with_all(all);
    if let Some(remote) = remote {
        op = op.with_remote(remote);
    }
    if verbose {
        op = op.with_progress(Arc::new(ConsoleProgress));
    }

    let outcome = op.call()?.into_result()?;
    debug!(
        data_pushed = outcome.data_pushed,
        objects = outcome.stats.objects_transferred,
        elapsed_ms = outcome.duration.as_millis() as u64,
        "push command finished"
    );
    Ok(outcome)
}

/// Returns the message printed when a push fails.
pub fn failure_message(err: &SyncError) -> String {
    match err.status_code() {
        Some(code) => code.message().to_string(),
        None => format!("error: {}", err),
    }
}
