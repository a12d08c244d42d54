//! The push operation as invoked by a user.

use crate::config::PushConfig;
use crate::error::{SyncError, SyncResult};
use crate::progress::{ProgressListener, SilentProgress};
use crate::push::PushCoordinator;
use crate::refspec::{PushTarget, RefSpecResolver};
use crate::state::PushOutcome;
use crate::transport::{connect, RemoteTransport};
use geosync_store::Repository;
use std::sync::Arc;
use tracing::debug;

/// A push from a repository, configured with a builder.
///
/// ```rust,no_run
/// use geosync_store::Repository;
/// use geosync_sync::PushOp;
/// use std::path::Path;
///
/// let repo = Repository::open(Path::new("/srv/parcels")).unwrap();
/// let outcome = PushOp::new(repo)
///     .with_remote("origin")
///     .add_refspec("main")
///     .call()
///     .unwrap();
/// if !outcome.data_pushed {
///     println!("Nothing to push.");
/// }
/// ```
#[derive(Clone)]
pub struct PushOp {
    repo: Repository,
    remote: Option<String>,
    refspecs: Vec<String>,
    all: bool,
    config: PushConfig,
    progress: Arc<dyn ProgressListener>,
}

impl PushOp {
    /// Creates a push of the current branch to its upstream.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            remote: None,
            refspecs: Vec::new(),
            all: false,
            config: PushConfig::default(),
            progress: Arc::new(SilentProgress),
        }
    }

    /// Sets the remote to push to.
    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Adds a `source[:destination]` refspec.
    #[must_use]
    pub fn add_refspec(mut self, refspec: impl Into<String>) -> Self {
        self.refspecs.push(refspec.into());
        self
    }

    /// Adds several refspecs.
    #[must_use]
    pub fn with_refspecs<I, S>(mut self, refspecs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.refspecs.extend(refspecs.into_iter().map(Into::into));
        self
    }

    /// Pushes every local branch instead of the given refspecs.
    #[must_use]
    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    /// Sets the push configuration.
    #[must_use]
    pub fn with_config(mut self, config: PushConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the progress listener.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressListener>) -> Self {
        self.progress = progress;
        self
    }

    /// Resolves the remote and refspecs without contacting the remote.
    pub fn target(&self) -> SyncResult<PushTarget> {
        RefSpecResolver::new(self.repo.refs().as_ref(), self.repo.config()).resolve(
            self.remote.as_deref(),
            &self.refspecs,
            self.all,
        )
    }

    /// Runs the push against the remote named in the repository config.
    pub fn call(&self) -> SyncResult<PushOutcome> {
        let target = self.target()?;
        let remote = self
            .repo
            .config()
            .remote(&target.remote)
            .ok_or_else(|| SyncError::RemoteNotFound(target.remote.clone()))?;
        let transport = connect(remote)?;
        self.run(target, transport)
    }

    /// Runs the push over an already opened transport.
    pub fn call_with<T: RemoteTransport>(&self, transport: T) -> SyncResult<PushOutcome> {
        let target = self.target()?;
        self.run(target, transport)
    }

    fn run<T: RemoteTransport>(&self, target: PushTarget, transport: T) -> SyncResult<PushOutcome> {
        debug!(remote = %target.remote, refspecs = ?target.refspecs, "resolved push target");
        PushCoordinator::new(self.repo.clone(), target.remote, transport, self.config.clone())
            .with_progress(Arc::clone(&self.progress))
            .push(&target.refspecs)
    }
}
