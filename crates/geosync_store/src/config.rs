//! Repository configuration: remotes and branch upstreams.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the remote used when none is given or configured.
pub const DEFAULT_REMOTE: &str = "origin";

/// A configured remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Where the remote lives (`file://` URL or a plain path).
    pub url: String,
}

/// The upstream of a local branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Remote the branch tracks.
    pub remote: String,
    /// Full ref name on the remote (e.g. `refs/heads/main`).
    pub merge: String,
}

/// Per-repository configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Remotes by name.
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteConfig>,
    /// Upstreams by short branch name.
    #[serde(default)]
    pub branches: BTreeMap<String, BranchConfig>,
}

impl RepoConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a remote.
    #[must_use]
    pub fn with_remote(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.add_remote(name, url);
        self
    }

    /// Sets the upstream of a branch.
    #[must_use]
    pub fn with_upstream(
        mut self,
        branch: impl Into<String>,
        remote: impl Into<String>,
        merge: impl Into<String>,
    ) -> Self {
        self.set_upstream(branch, remote, merge);
        self
    }

    /// Adds or replaces a remote.
    pub fn add_remote(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.remotes
            .insert(name.into(), RemoteConfig { url: url.into() });
    }

    /// Sets the upstream of a branch.
    pub fn set_upstream(
        &mut self,
        branch: impl Into<String>,
        remote: impl Into<String>,
        merge: impl Into<String>,
    ) {
        self.branches.insert(
            branch.into(),
            BranchConfig {
                remote: remote.into(),
                merge: merge.into(),
            },
        );
    }

    /// Looks up a remote by name.
    pub fn remote(&self, name: &str) -> Option<&RemoteConfig> {
        self.remotes.get(name)
    }

    /// Looks up the upstream of a branch by short name.
    pub fn upstream(&self, branch: &str) -> Option<&BranchConfig> {
        self.branches.get(branch)
    }
}
