//! Transport layer abstraction for push operations.

use crate::error::{SyncError, SyncResult};
use geosync_store::{Object, ObjectId, RefTarget, RemoteConfig, Repository};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A remote transport exposes the primitives a push needs from the peer.
///
/// This trait abstracts the remote, allowing for different implementations
/// (a repository on the local filesystem, a network peer, a wrapper that
/// injects failures in tests, etc.).
pub trait RemoteTransport: Send + Sync {
    /// Returns the URL this transport talks to.
    fn url(&self) -> &str;

    /// Reads a remote ref. Returns `Ok(None)` if it does not exist.
    fn read_ref(&self, name: &str) -> SyncResult<Option<RefTarget>>;

    /// Lists remote refs whose name starts with `prefix`.
    fn list_refs(&self, prefix: &str) -> SyncResult<Vec<(String, RefTarget)>>;

    /// Reports, for each id, whether the remote already holds the object.
    fn has_objects(&self, oids: &[ObjectId]) -> SyncResult<Vec<bool>>;

    /// Stores objects on the remote.
    ///
    /// Callers send objects in dependency order, so every object a sent
    /// object references is already on the remote or earlier in the batch.
    fn send_objects(&self, objects: &[Object]) -> SyncResult<()>;

    /// Atomically sets a remote ref if it currently equals `expected`.
    ///
    /// Returns `false` on mismatch, leaving the remote ref unchanged.
    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> SyncResult<bool>;
}

impl<T: RemoteTransport + ?Sized> RemoteTransport for Box<T> {
    fn url(&self) -> &str {
        (**self).url()
    }

    fn read_ref(&self, name: &str) -> SyncResult<Option<RefTarget>> {
        (**self).read_ref(name)
    }

    fn list_refs(&self, prefix: &str) -> SyncResult<Vec<(String, RefTarget)>> {
        (**self).list_refs(prefix)
    }

    fn has_objects(&self, oids: &[ObjectId]) -> SyncResult<Vec<bool>> {
        (**self).has_objects(oids)
    }

    fn send_objects(&self, objects: &[Object]) -> SyncResult<()> {
        (**self).send_objects(objects)
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> SyncResult<bool> {
        (**self).compare_and_set(name, expected, new)
    }
}

/// Transport to a repository reachable through the filesystem or held in
/// memory by the same process.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    url: String,
    repo: Repository,
}

impl LocalTransport {
    /// Wraps an already opened repository.
    pub fn new(url: impl Into<String>, repo: Repository) -> Self {
        Self {
            url: url.into(),
            repo,
        }
    }

    /// Opens the repository directory at `path`.
    pub fn open(path: &Path) -> SyncResult<Self> {
        let repo = Repository::open(path)?;
        Ok(Self::new(path.display().to_string(), repo))
    }

    /// Returns the remote repository.
    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}

impl RemoteTransport for LocalTransport {
    fn url(&self) -> &str {
        &self.url
    }

    fn read_ref(&self, name: &str) -> SyncResult<Option<RefTarget>> {
        Ok(self.repo.refs().resolve(name)?)
    }

    fn list_refs(&self, prefix: &str) -> SyncResult<Vec<(String, RefTarget)>> {
        Ok(self.repo.refs().list(prefix)?)
    }

    fn has_objects(&self, oids: &[ObjectId]) -> SyncResult<Vec<bool>> {
        let objects = self.repo.objects();
        oids.iter()
            .map(|oid| objects.has(oid).map_err(SyncError::from))
            .collect()
    }

    fn send_objects(&self, objects: &[Object]) -> SyncResult<()> {
        let ids = self.repo.objects().put_batch(objects)?;
        debug!(url = %self.url, count = ids.len(), "received objects");
        Ok(())
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> SyncResult<bool> {
        Ok(self.repo.refs().compare_and_set(name, expected, new)?)
    }
}

/// Opens a transport for a configured remote.
///
/// Supported URLs are `file://<path>` and plain filesystem paths.
pub fn connect(remote: &RemoteConfig) -> SyncResult<Box<dyn RemoteTransport>> {
    let path = local_path(&remote.url)?;
    debug!(url = %remote.url, path = %path.display(), "opening local transport");
    let transport = LocalTransport::open(&path).map_err(|e| match e {
        SyncError::Store(store) => {
            SyncError::transport_fatal(format!("cannot open {}: {}", remote.url, store))
        }
        other => other,
    })?;
    Ok(Box::new(transport))
}

fn local_path(url: &str) -> SyncResult<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    match url.split_once("://") {
        Some((scheme, _)) => Err(SyncError::transport_fatal(format!(
            "unsupported transport scheme: {}",
            scheme
        ))),
        None => Ok(PathBuf::from(url)),
    }
}
