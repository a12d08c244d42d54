//! Shallow history boundary.

use crate::error::{StoreError, StoreResult};
use crate::oid::ObjectId;
use std::collections::BTreeSet;

/// Commits whose parents are known to be missing locally.
///
/// A truncated clone records the oldest commits it holds here. History
/// walks that reach one of these commits cannot continue past it, so they
/// cannot prove or disprove ancestry beyond that point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShallowBoundary {
    commits: BTreeSet<ObjectId>,
}

impl ShallowBoundary {
    /// Creates an empty boundary (full history).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a boundary from a set of commits.
    pub fn from_commits(commits: impl IntoIterator<Item = ObjectId>) -> Self {
        Self {
            commits: commits.into_iter().collect(),
        }
    }

    /// Adds a commit to the boundary.
    pub fn insert(&mut self, commit: ObjectId) {
        self.commits.insert(commit);
    }

    /// Returns true if `commit` is on the boundary.
    #[must_use]
    pub fn contains(&self, commit: &ObjectId) -> bool {
        self.commits.contains(commit)
    }

    /// Returns true if the repository has full history.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Iterates over boundary commits in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectId> {
        self.commits.iter()
    }

    /// Parses the `shallow` file format: one hex id per line.
    pub fn parse(text: &str) -> StoreResult<Self> {
        let mut boundary = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let oid = ObjectId::from_hex(line).map_err(|_| {
                StoreError::corrupted(format!("shallow file line {}: {:?}", lineno + 1, line))
            })?;
            boundary.insert(oid);
        }
        Ok(boundary)
    }

    /// Renders the `shallow` file format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for oid in &self.commits {
            out.push_str(&oid.to_hex());
            out.push('\n');
        }
        out
    }
}
