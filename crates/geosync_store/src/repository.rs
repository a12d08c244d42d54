//! A repository: object store, ref store, shallow boundary and config.

use crate::config::RepoConfig;
use crate::dir::RepoDir;
use crate::error::StoreResult;
use crate::objects::{MemoryObjectStore, ObjectStore};
use crate::refs::{RefStore, HEAD, HEADS_PREFIX};
use crate::shallow::ShallowBoundary;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Handle to one repository.
///
/// Cloning is cheap; clones share the same stores.
#[derive(Clone)]
pub struct Repository {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
    shallow: ShallowBoundary,
    config: RepoConfig,
}

impl Repository {
    /// Creates a repository over the given stores.
    pub fn from_parts(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self {
            objects,
            refs,
            shallow: ShallowBoundary::new(),
            config: RepoConfig::default(),
        }
    }

    /// Creates an empty in-memory repository with `HEAD -> refs/heads/main`.
    pub fn in_memory() -> StoreResult<Self> {
        let refs = Arc::new(crate::refs::MemoryRefStore::new());
        refs.set_symbolic(HEAD, &format!("{}main", HEADS_PREFIX))?;
        Ok(Self::from_parts(Arc::new(MemoryObjectStore::new()), refs))
    }

    /// Creates (or re-opens) a repository directory.
    pub fn init(path: &Path) -> StoreResult<Self> {
        let dir = RepoDir::init(path)?;
        let repo = Self::from_dir(&dir)?;
        if repo.refs.resolve(HEAD)?.is_none() {
            repo.refs
                .set_symbolic(HEAD, &format!("{}main", HEADS_PREFIX))?;
        }
        Ok(repo)
    }

    /// Opens an existing repository directory.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let dir = RepoDir::open(path)?;
        Self::from_dir(&dir)
    }

    fn from_dir(dir: &RepoDir) -> StoreResult<Self> {
        let config = dir.load_config()?;
        let shallow = dir.load_shallow()?;
        debug!(
            path = %dir.path().display(),
            remotes = config.remotes.len(),
            shallow = !shallow.is_empty(),
            "opened repository"
        );
        Ok(Self {
            objects: Arc::new(dir.object_store()),
            refs: Arc::new(dir.ref_store()),
            shallow,
            config,
        })
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: RepoConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the shallow boundary.
    #[must_use]
    pub fn with_shallow(mut self, shallow: ShallowBoundary) -> Self {
        self.shallow = shallow;
        self
    }

    /// Returns the object store.
    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    /// Returns the ref store.
    pub fn refs(&self) -> &Arc<dyn RefStore> {
        &self.refs
    }

    /// Returns the shallow boundary.
    pub fn shallow(&self) -> &ShallowBoundary {
        &self.shallow
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("shallow", &self.shallow)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
