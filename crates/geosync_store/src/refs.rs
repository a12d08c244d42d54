//! Ref store trait, ref names and the in-memory versioned ref store.
//!
//! Refs are named, mutable pointers. The namespace is hierarchical:
//!
//! - `refs/heads/*` for branches
//! - `refs/tags/*` for tags
//! - `refs/remotes/{remote}/*` for remote-tracking refs
//! - `HEAD`, usually symbolic, naming the current branch
//!
//! A ref is either direct (bound to a commit id) or symbolic (bound to the
//! name of another ref). Symbolic refs have exactly one level of
//! indirection.

use crate::error::{StoreError, StoreResult};
use crate::oid::ObjectId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the symbolic ref naming the current branch.
pub const HEAD: &str = "HEAD";
/// Prefix of every ref name other than `HEAD`.
pub const REFS_PREFIX: &str = "refs/";
/// Branch namespace.
pub const HEADS_PREFIX: &str = "refs/heads/";
/// Tag namespace.
pub const TAGS_PREFIX: &str = "refs/tags/";
/// Remote-tracking namespace.
pub const REMOTES_PREFIX: &str = "refs/remotes/";

/// What a ref points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefTarget {
    /// Bound to a commit.
    Direct(ObjectId),
    /// Bound to another ref by name.
    Symbolic(String),
}

impl RefTarget {
    /// Returns the direct target, if any.
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            RefTarget::Direct(oid) => Some(*oid),
            RefTarget::Symbolic(_) => None,
        }
    }

    /// Returns true for symbolic refs.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, RefTarget::Symbolic(_))
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Direct(oid) => write!(f, "{}", oid),
            RefTarget::Symbolic(name) => write!(f, "ref: {}", name),
        }
    }
}

/// Checks that a ref name is well formed.
pub fn validate_ref_name(name: &str) -> StoreResult<()> {
    let reject = |reason| {
        Err(StoreError::InvalidRefName {
            name: name.to_string(),
            reason,
        })
    };

    if name == HEAD {
        return Ok(());
    }
    if !name.starts_with(REFS_PREFIX) {
        return reject("must start with 'refs/'");
    }
    if name.ends_with('/') || name.ends_with(".lock") {
        return reject("bad suffix");
    }
    if name.contains("..") || name.contains("//") {
        return reject("contains '..' or empty component");
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, ':' | '~' | '^' | '?' | '*' | '[' | '\\'))
    {
        return reject("contains a forbidden character");
    }
    Ok(())
}

/// Returns the branch short name if `name` is under `refs/heads/`.
pub fn branch_name(name: &str) -> Option<&str> {
    name.strip_prefix(HEADS_PREFIX)
}

/// Returns the remote-tracking ref recording `branch` of `remote`.
pub fn tracking_ref(remote: &str, branch: &str) -> String {
    format!("{}{}/{}", REMOTES_PREFIX, remote, branch)
}

/// Storage of named refs.
///
/// Updates go through [`RefStore::compare_and_set`] only: there is no
/// unconditional write, so a reader that decides on an update based on
/// an observed value cannot overwrite a concurrent change.
pub trait RefStore: Send + Sync {
    /// Reads a ref. Returns `Ok(None)` if it does not exist.
    fn resolve(&self, name: &str) -> StoreResult<Option<RefTarget>>;

    /// Atomically sets `name` to `new` if it currently equals `expected`.
    ///
    /// `expected == None` means the ref must not exist. A symbolic ref
    /// never matches, so it is never overwritten. Returns `false` on
    /// mismatch without modifying anything.
    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> StoreResult<bool>;

    /// Binds `name` symbolically to `target`.
    fn set_symbolic(&self, name: &str, target: &str) -> StoreResult<()>;

    /// Lists refs whose name starts with `prefix`, sorted by name.
    fn list(&self, prefix: &str) -> StoreResult<Vec<(String, RefTarget)>>;

    /// Resolves `name` to a commit, following one symbolic level.
    fn peel(&self, name: &str) -> StoreResult<Option<ObjectId>> {
        match self.resolve(name)? {
            None => Ok(None),
            Some(RefTarget::Direct(oid)) => Ok(Some(oid)),
            Some(RefTarget::Symbolic(target)) => match self.resolve(&target)? {
                None => Ok(None),
                Some(RefTarget::Direct(oid)) => Ok(Some(oid)),
                Some(RefTarget::Symbolic(_)) => Err(StoreError::corrupted(format!(
                    "symbolic ref {} points at symbolic ref {}",
                    name, target
                ))),
            },
        }
    }

    /// Returns the ref `HEAD` names, or `None` if `HEAD` is detached or unset.
    fn current_branch(&self) -> StoreResult<Option<String>> {
        match self.resolve(HEAD)? {
            Some(RefTarget::Symbolic(target)) => Ok(Some(target)),
            _ => Ok(None),
        }
    }
}

/// A ref value together with the number of times it has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VersionedRef {
    target: RefTarget,
    version: u64,
}

/// An in-memory ref store.
///
/// Each ref is a versioned cell; every successful write bumps the version,
/// which lets tests observe whether an update actually happened.
#[derive(Debug, Default)]
pub struct MemoryRefStore {
    refs: Mutex<BTreeMap<String, VersionedRef>>,
}

impl MemoryRefStore {
    /// Creates an empty ref store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times `name` has been written.
    #[must_use]
    pub fn version(&self, name: &str) -> Option<u64> {
        self.refs.lock().get(name).map(|r| r.version)
    }
}

impl RefStore for MemoryRefStore {
    fn resolve(&self, name: &str) -> StoreResult<Option<RefTarget>> {
        Ok(self.refs.lock().get(name).map(|r| r.target.clone()))
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> StoreResult<bool> {
        validate_ref_name(name)?;
        let mut refs = self.refs.lock();
        let current = refs.get(name);
        let matches = match (current, expected) {
            (None, None) => true,
            (Some(cell), Some(oid)) => cell.target == RefTarget::Direct(oid),
            _ => false,
        };
        if !matches {
            return Ok(false);
        }
        let version = current.map_or(1, |cell| cell.version + 1);
        refs.insert(
            name.to_string(),
            VersionedRef {
                target: RefTarget::Direct(new),
                version,
            },
        );
        Ok(true)
    }

    fn set_symbolic(&self, name: &str, target: &str) -> StoreResult<()> {
        validate_ref_name(name)?;
        validate_ref_name(target)?;
        let mut refs = self.refs.lock();
        let version = refs.get(name).map_or(1, |cell| cell.version + 1);
        refs.insert(
            name.to_string(),
            VersionedRef {
                target: RefTarget::Symbolic(target.to_string()),
                version,
            },
        );
        Ok(())
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<(String, RefTarget)>> {
        Ok(self
            .refs
            .lock()
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, cell)| (name.clone(), cell.target.clone()))
            .collect())
    }
}
