//! History negotiation.
//!
//! For one `(local ref, remote ref)` pair the negotiator decides whether a
//! push is safe and, if so, which objects the remote is missing. Safety
//! means the remote's current commit is an ancestor of the local one: the
//! remote ref only ever moves forward.
//!
//! The missing set is computed by walking the reference graph from the
//! local commit. A walk never descends below an object the remote already
//! holds, because a store that holds an object also holds everything
//! reachable from it. Sending a shallow commit would break that rule
//! unless the remote already has the parents cut off locally, so such a
//! push is rejected as too shallow.

use crate::error::{SyncError, SyncResult};
use crate::progress::ProgressListener;
use crate::refspec::ResolvedRefSpec;
use crate::transport::RemoteTransport;
use geosync_store::{Object, ObjectId, RefTarget, Repository, StoreError};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Result of negotiating one refspec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// The remote ref already points at the local commit.
    UpToDate {
        /// The refspec.
        refspec: ResolvedRefSpec,
        /// The commit both sides agree on.
        commit: ObjectId,
    },
    /// The remote ref can be moved forward.
    Update(PushPlan),
}

/// What to send and how to update the remote ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPlan {
    /// The refspec.
    pub refspec: ResolvedRefSpec,
    /// The remote value observed during negotiation; `None` creates the ref.
    pub expected_old: Option<ObjectId>,
    /// The local commit.
    pub new: ObjectId,
    /// Objects the remote lacks, each after every object it references.
    pub missing: Vec<ObjectId>,
}

impl PushPlan {
    /// Returns true if the remote ref does not exist yet.
    pub fn is_creation(&self) -> bool {
        self.expected_old.is_none()
    }
}

/// How the remote commit relates to the local history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ancestry {
    Contains,
    Diverged,
    Shallow(ObjectId),
}

/// Computes push plans against one remote.
pub struct HistoryNegotiator<'a> {
    local: &'a Repository,
    remote: &'a dyn RemoteTransport,
    progress: &'a dyn ProgressListener,
}

impl<'a> HistoryNegotiator<'a> {
    /// Creates a negotiator.
    pub fn new(
        local: &'a Repository,
        remote: &'a dyn RemoteTransport,
        progress: &'a dyn ProgressListener,
    ) -> Self {
        Self {
            local,
            remote,
            progress,
        }
    }

    /// Negotiates one refspec.
    ///
    /// Fails with `LocalRefNotFound`, `CannotPushToSymbolicRef`,
    /// `HistoryTooShallow` or `RemoteHasDivergentChanges` when the push
    /// cannot proceed.
    pub fn negotiate(&self, refspec: &ResolvedRefSpec) -> SyncResult<Negotiation> {
        self.progress
            .started(&format!("negotiating {}", refspec.remote_ref));

        let new = self
            .local
            .refs()
            .peel(&refspec.local_ref)?
            .ok_or_else(|| SyncError::LocalRefNotFound(refspec.local_ref.clone()))?;
        if self.local.objects().get(&new)?.as_commit().is_none() {
            return Err(not_a_commit(new).into());
        }

        let (expected_old, exclude) = match self.remote.read_ref(&refspec.remote_ref)? {
            Some(RefTarget::Symbolic(target)) => {
                return Err(SyncError::CannotPushToSymbolicRef {
                    remote_ref: refspec.remote_ref.clone(),
                    target,
                });
            }
            Some(RefTarget::Direct(old)) if old == new => {
                debug!(remote_ref = %refspec.remote_ref, commit = %new.short(), "up to date");
                self.progress.complete();
                return Ok(Negotiation::UpToDate {
                    refspec: refspec.clone(),
                    commit: new,
                });
            }
            Some(RefTarget::Direct(old)) => match self.ancestry(new, old)? {
                Ancestry::Contains => (Some(old), self.known_on_remote(old)?),
                Ancestry::Shallow(boundary) => return Err(too_shallow(refspec, boundary)),
                Ancestry::Diverged => {
                    return Err(SyncError::RemoteHasDivergentChanges {
                        remote_ref: refspec.remote_ref.clone(),
                    });
                }
            },
            None => (None, HashSet::new()),
        };

        let missing = self.missing_objects(refspec, new, &exclude)?;
        debug!(
            remote_ref = %refspec.remote_ref,
            old = ?expected_old,
            new = %new.short(),
            missing = missing.len(),
            "negotiated"
        );
        self.progress.complete();

        Ok(Negotiation::Update(PushPlan {
            refspec: refspec.clone(),
            expected_old,
            new,
            missing,
        }))
    }

    /// Walks parent edges back from `new` looking for `old`.
    fn ancestry(&self, new: ObjectId, old: ObjectId) -> SyncResult<Ancestry> {
        let mut visited = HashSet::from([new]);
        let mut queue = VecDeque::from([new]);
        let mut shallow_at = None;

        while let Some(oid) = queue.pop_front() {
            if oid == old {
                debug!(walked = visited.len(), "remote commit found in local history");
                return Ok(Ancestry::Contains);
            }
            let Some(object) = self.local.objects().try_get(&oid)? else {
                shallow_at.get_or_insert(oid);
                continue;
            };
            let commit = object.as_commit().ok_or_else(|| not_a_commit(oid))?;
            if self.local.shallow().contains(&oid) {
                shallow_at.get_or_insert(oid);
                continue;
            }
            for parent in &commit.parents {
                if visited.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }

        debug!(walked = visited.len(), shallow = shallow_at.is_some(), "remote commit not found");
        Ok(match shallow_at {
            Some(boundary) => Ancestry::Shallow(boundary),
            None => Ancestry::Diverged,
        })
    }

    /// Objects the remote holds because it holds `old`: the commit and its
    /// snapshot. Older history is left to the remote presence queries, so
    /// the cost does not grow with the length of the history.
    fn known_on_remote(&self, old: ObjectId) -> SyncResult<HashSet<ObjectId>> {
        let mut known = HashSet::from([old]);
        let Some(tree) = self
            .local
            .objects()
            .try_get(&old)?
            .and_then(|object| object.as_commit().map(|commit| commit.tree))
        else {
            return Ok(known);
        };

        let mut stack = vec![tree];
        while let Some(oid) = stack.pop() {
            if !known.insert(oid) {
                continue;
            }
            if let Some(object) = self.local.objects().try_get(&oid)? {
                stack.extend(object.references());
            }
        }
        Ok(known)
    }

    /// Objects reachable from `root` that are neither in `exclude` nor on
    /// the remote, in dependency order.
    ///
    /// The walk goes level by level so that each level costs one presence
    /// query against the remote. Fails with `HistoryTooShallow` if the
    /// remote would end up holding a commit without its parents.
    fn missing_objects(
        &self,
        refspec: &ResolvedRefSpec,
        root: ObjectId,
        exclude: &HashSet<ObjectId>,
    ) -> SyncResult<Vec<ObjectId>> {
        let mut graph: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
        let mut cut_parents: Vec<(ObjectId, ObjectId)> = Vec::new();
        let mut seen = HashSet::new();
        let mut frontier = vec![root];

        while !frontier.is_empty() {
            let candidates: Vec<ObjectId> = std::mem::take(&mut frontier)
                .into_iter()
                .filter(|oid| !exclude.contains(oid) && seen.insert(*oid))
                .collect();
            if candidates.is_empty() {
                break;
            }

            let present = self.remote_has(&candidates)?;
            for (oid, present) in candidates.into_iter().zip(present) {
                if present {
                    continue;
                }
                let Some(object) = self.local.objects().try_get(&oid)? else {
                    return Err(too_shallow(refspec, oid));
                };
                if let Object::Commit(commit) = &object {
                    if self.local.shallow().contains(&oid) {
                        cut_parents.extend(commit.parents.iter().map(|parent| (oid, *parent)));
                    }
                }

                let edges = self.edges(oid, &object);
                frontier.extend(edges.iter().copied());
                graph.insert(oid, edges);
            }
        }

        self.check_cut_parents(refspec, &cut_parents, exclude)?;
        Ok(dependency_order(root, &graph))
    }

    /// Shallow commits about to be sent need their parents on the remote.
    fn check_cut_parents(
        &self,
        refspec: &ResolvedRefSpec,
        cut_parents: &[(ObjectId, ObjectId)],
        exclude: &HashSet<ObjectId>,
    ) -> SyncResult<()> {
        let pending: Vec<(ObjectId, ObjectId)> = cut_parents
            .iter()
            .filter(|(_, parent)| !exclude.contains(parent))
            .copied()
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let parents: Vec<ObjectId> = pending.iter().map(|(_, parent)| *parent).collect();
        let present = self.remote_has(&parents)?;
        match pending.iter().zip(present).find(|(_, present)| !present) {
            Some(((boundary, parent), _)) => {
                debug!(
                    boundary = %boundary.short(),
                    parent = %parent.short(),
                    "remote lacks parent of shallow commit"
                );
                Err(too_shallow(refspec, *boundary))
            }
            None => Ok(()),
        }
    }

    fn remote_has(&self, oids: &[ObjectId]) -> SyncResult<Vec<bool>> {
        let present = self.remote.has_objects(oids)?;
        if present.len() != oids.len() {
            return Err(SyncError::transport_fatal(format!(
                "presence query for {} objects answered {}",
                oids.len(),
                present.len()
            )));
        }
        Ok(present)
    }

    /// Outgoing edges, not crossing the shallow boundary.
    fn edges(&self, oid: ObjectId, object: &Object) -> Vec<ObjectId> {
        match object {
            Object::Commit(commit) if self.local.shallow().contains(&oid) => vec![commit.tree],
            _ => object.references(),
        }
    }
}

/// Post-order walk of `graph` from `root`: every node after the nodes it
/// references. Nodes absent from `graph` are skipped.
fn dependency_order(root: ObjectId, graph: &HashMap<ObjectId, Vec<ObjectId>>) -> Vec<ObjectId> {
    let mut order = Vec::with_capacity(graph.len());
    let mut emitted = HashSet::new();
    let mut stack = vec![(root, false)];

    while let Some((oid, expanded)) = stack.pop() {
        if expanded {
            if emitted.insert(oid) {
                order.push(oid);
            }
            continue;
        }
        if emitted.contains(&oid) {
            continue;
        }
        let Some(edges) = graph.get(&oid) else {
            continue;
        };
        stack.push((oid, true));
        for child in edges.iter().rev() {
            if !emitted.contains(child) {
                stack.push((*child, false));
            }
        }
    }
    order
}

fn too_shallow(refspec: &ResolvedRefSpec, boundary: ObjectId) -> SyncError {
    SyncError::HistoryTooShallow {
        local_ref: refspec.local_ref.clone(),
        boundary,
    }
}

fn not_a_commit(oid: ObjectId) -> StoreError {
    StoreError::corrupted(format!("{} is not a commit", oid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentProgress;
    use crate::transport::LocalTransport;
    use geosync_store::ShallowBoundary;
    use geosync_testkit::{reachable_from, GraphBuilder};

    const MAIN: &str = "refs/heads/main";

    fn main_spec() -> ResolvedRefSpec {
        ResolvedRefSpec::new(MAIN, MAIN)
    }

    fn negotiate(local: &Repository, remote: &LocalTransport) -> SyncResult<Negotiation> {
        HistoryNegotiator::new(local, remote, &SilentProgress).negotiate(&main_spec())
    }

    fn assert_dependency_order(repo: &Repository, order: &[ObjectId]) {
        let position: HashMap<_, _> = order.iter().enumerate().map(|(i, o)| (*o, i)).collect();
        for (i, oid) in order.iter().enumerate() {
            let object = repo.objects().get(oid).unwrap();
            for child in object.references() {
                if let Some(j) = position.get(&child) {
                    assert!(*j < i, "{} sent before its reference {}", oid, child);
                }
            }
        }
    }

    #[test]
    fn creation_sends_whole_history() {
        let mut local = GraphBuilder::in_memory();
        let commits = local.linear(None, 3, "c");
        local.set_ref(MAIN, commits[2]);
        let remote = LocalTransport::new("remote", Repository::in_memory().unwrap());

        let Negotiation::Update(plan) = negotiate(local.repo(), &remote).unwrap() else {
            panic!("expected an update");
        };
        assert!(plan.is_creation());
        assert_eq!(plan.new, commits[2]);

        let expected = reachable_from(local.repo(), commits[2]);
        let actual: HashSet<_> = plan.missing.iter().copied().collect();
        assert_eq!(actual, expected);
        assert_eq!(plan.missing.len(), expected.len());
        assert_eq!(plan.missing.last(), Some(&commits[2]));
        assert_dependency_order(local.repo(), &plan.missing);
    }

    #[test]
    fn fast_forward_sends_difference() {
        let mut local = GraphBuilder::in_memory();
        let commits = local.linear(None, 3, "c");
        local.set_ref(MAIN, commits[2]);

        let remote_repo = Repository::in_memory().unwrap();
        local.copy_history(&remote_repo, commits[0]);
        GraphBuilder::new(remote_repo.clone()).set_ref(MAIN, commits[0]);
        let remote = LocalTransport::new("remote", remote_repo);

        let Negotiation::Update(plan) = negotiate(local.repo(), &remote).unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(plan.expected_old, Some(commits[0]));

        let ahead = reachable_from(local.repo(), commits[2]);
        let behind = reachable_from(local.repo(), commits[0]);
        let expected: HashSet<_> = ahead.difference(&behind).copied().collect();
        let actual: HashSet<_> = plan.missing.iter().copied().collect();
        assert_eq!(actual, expected);
        assert!(!actual.contains(&commits[0]));
        assert_dependency_order(local.repo(), &plan.missing);
    }

    #[test]
    fn equal_commits_are_up_to_date() {
        let mut local = GraphBuilder::in_memory();
        let commits = local.linear(None, 2, "c");
        local.set_ref(MAIN, commits[1]);

        let remote_repo = Repository::in_memory().unwrap();
        local.copy_history(&remote_repo, commits[1]);
        GraphBuilder::new(remote_repo.clone()).set_ref(MAIN, commits[1]);
        let remote = LocalTransport::new("remote", remote_repo);

        assert_eq!(
            negotiate(local.repo(), &remote).unwrap(),
            Negotiation::UpToDate {
                refspec: main_spec(),
                commit: commits[1]
            }
        );
    }

    #[test]
    fn divergence_rejected() {
        let mut local = GraphBuilder::in_memory();
        let base = local.linear(None, 1, "base");
        let ours = local.commit(&[base[0]], "ours");
        let theirs = local.commit(&[base[0]], "theirs");
        local.set_ref(MAIN, ours);

        let remote_repo = Repository::in_memory().unwrap();
        local.copy_history(&remote_repo, theirs);
        GraphBuilder::new(remote_repo.clone()).set_ref(MAIN, theirs);
        let remote = LocalTransport::new("remote", remote_repo);

        let err = negotiate(local.repo(), &remote).unwrap_err();
        assert!(matches!(err, SyncError::RemoteHasDivergentChanges { .. }));
    }

    #[test]
    fn remote_ahead_is_divergence() {
        let mut local = GraphBuilder::in_memory();
        let commits = local.linear(None, 2, "c");
        local.set_ref(MAIN, commits[0]);

        let remote_repo = Repository::in_memory().unwrap();
        local.copy_history(&remote_repo, commits[1]);
        GraphBuilder::new(remote_repo.clone()).set_ref(MAIN, commits[1]);
        let remote = LocalTransport::new("remote", remote_repo);

        let err = negotiate(local.repo(), &remote).unwrap_err();
        assert!(matches!(err, SyncError::RemoteHasDivergentChanges { .. }));
    }

    #[test]
    fn shallow_boundary_rejected() {
        let mut full = GraphBuilder::in_memory();
        let commits = full.linear(None, 3, "c");

        let remote_repo = Repository::in_memory().unwrap();
        full.copy_history(&remote_repo, commits[0]);
        GraphBuilder::new(remote_repo.clone()).set_ref(MAIN, commits[0]);
        let remote = LocalTransport::new("remote", remote_repo);

        let shallow_repo = Repository::in_memory()
            .unwrap()
            .with_shallow(ShallowBoundary::from_commits([commits[1]]));
        full.copy_commit(&shallow_repo, commits[1]);
        full.copy_commit(&shallow_repo, commits[2]);
        let local = GraphBuilder::new(shallow_repo);
        local.set_ref(MAIN, commits[2]);

        let err = negotiate(local.repo(), &remote).unwrap_err();
        assert!(matches!(
            err,
            SyncError::HistoryTooShallow { boundary, .. } if boundary == commits[1]
        ));
    }

    fn shallow_clone_of(full: &GraphBuilder, commits: &[ObjectId]) -> GraphBuilder {
        let boundary = commits[0];
        let repo = Repository::in_memory()
            .unwrap()
            .with_shallow(ShallowBoundary::from_commits([boundary]));
        for commit in commits {
            full.copy_commit(&repo, *commit);
        }
        GraphBuilder::new(repo)
    }

    #[test]
    fn shallow_creation_rejected_without_remote_parents() {
        let mut full = GraphBuilder::in_memory();
        let commits = full.linear(None, 3, "c");
        let local = shallow_clone_of(&full, &commits[1..]);
        local.set_ref(MAIN, commits[2]);
        let remote = LocalTransport::new("remote", Repository::in_memory().unwrap());

        let err = negotiate(local.repo(), &remote).unwrap_err();
        assert!(matches!(
            err,
            SyncError::HistoryTooShallow { boundary, .. } if boundary == commits[1]
        ));
    }

    #[test]
    fn shallow_creation_allowed_when_remote_has_parents() {
        let mut full = GraphBuilder::in_memory();
        let commits = full.linear(None, 3, "c");
        let local = shallow_clone_of(&full, &commits[1..]);
        local.set_ref(MAIN, commits[2]);

        // The remote holds the cut-off parent without any ref naming it.
        let remote_repo = Repository::in_memory().unwrap();
        full.copy_history(&remote_repo, commits[0]);
        let remote = LocalTransport::new("remote", remote_repo);

        let Negotiation::Update(plan) = negotiate(local.repo(), &remote).unwrap() else {
            panic!("expected an update");
        };
        assert!(plan.is_creation());
        assert!(plan.missing.contains(&commits[1]));
        assert!(!plan.missing.contains(&commits[0]));
        assert_eq!(plan.missing.last(), Some(&commits[2]));
    }

    #[test]
    fn truncated_creation_rejected() {
        let mut full = GraphBuilder::in_memory();
        let commits = full.linear(None, 2, "c");
        let truncated = Repository::in_memory().unwrap();
        full.copy_commit(&truncated, commits[1]);
        let local = GraphBuilder::new(truncated);
        local.set_ref(MAIN, commits[1]);
        let remote = LocalTransport::new("remote", Repository::in_memory().unwrap());

        let err = negotiate(local.repo(), &remote).unwrap_err();
        assert!(matches!(
            err,
            SyncError::HistoryTooShallow { boundary, .. } if boundary == commits[0]
        ));
    }

    #[test]
    fn known_on_remote_stops_at_one_snapshot() {
        let mut local = GraphBuilder::in_memory();
        let commits = local.linear(None, 10, "c");
        let remote = LocalTransport::new("remote", Repository::in_memory().unwrap());

        let known = HistoryNegotiator::new(local.repo(), &remote, &SilentProgress)
            .known_on_remote(commits[8])
            .unwrap();
        // The commit, its root tree, the layer tree and one feature value.
        assert_eq!(known.len(), 4);
        assert!(known.contains(&commits[8]));
        assert!(!known.contains(&commits[7]));
    }

    #[test]
    fn deep_fast_forward_sends_difference() {
        let mut local = GraphBuilder::in_memory();
        let commits = local.linear(None, 8, "c");
        local.set_ref(MAIN, commits[7]);

        let remote_repo = Repository::in_memory().unwrap();
        local.copy_history(&remote_repo, commits[5]);
        GraphBuilder::new(remote_repo.clone()).set_ref(MAIN, commits[5]);
        let remote = LocalTransport::new("remote", remote_repo);

        let Negotiation::Update(plan) = negotiate(local.repo(), &remote).unwrap() else {
            panic!("expected an update");
        };
        let ahead = reachable_from(local.repo(), commits[7]);
        let behind = reachable_from(local.repo(), commits[5]);
        let expected: HashSet<_> = ahead.difference(&behind).copied().collect();
        let actual: HashSet<_> = plan.missing.iter().copied().collect();
        assert_eq!(actual, expected);
        assert_eq!(plan.missing.len(), 8);
        assert_dependency_order(local.repo(), &plan.missing);
    }

    #[test]
    fn absent_parent_counts_as_shallow() {
        let mut full = GraphBuilder::in_memory();
        let commits = full.linear(None, 3, "c");

        let remote_repo = Repository::in_memory().unwrap();
        full.copy_history(&remote_repo, commits[0]);
        GraphBuilder::new(remote_repo.clone()).set_ref(MAIN, commits[0]);
        let remote = LocalTransport::new("remote", remote_repo);

        let truncated = Repository::in_memory().unwrap();
        full.copy_commit(&truncated, commits[2]);
        let local = GraphBuilder::new(truncated);
        local.set_ref(MAIN, commits[2]);

        let err = negotiate(local.repo(), &remote).unwrap_err();
        assert!(matches!(
            err,
            SyncError::HistoryTooShallow { boundary, .. } if boundary == commits[1]
        ));
    }

    #[test]
    fn shallow_history_can_still_fast_forward() {
        let mut full = GraphBuilder::in_memory();
        let commits = full.linear(None, 3, "c");

        let remote_repo = Repository::in_memory().unwrap();
        full.copy_history(&remote_repo, commits[1]);
        GraphBuilder::new(remote_repo.clone()).set_ref(MAIN, commits[1]);
        let remote = LocalTransport::new("remote", remote_repo);

        let shallow_repo = Repository::in_memory()
            .unwrap()
            .with_shallow(ShallowBoundary::from_commits([commits[1]]));
        full.copy_commit(&shallow_repo, commits[1]);
        full.copy_commit(&shallow_repo, commits[2]);
        let local = GraphBuilder::new(shallow_repo);
        local.set_ref(MAIN, commits[2]);

        let Negotiation::Update(plan) = negotiate(local.repo(), &remote).unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(plan.expected_old, Some(commits[1]));
        assert_eq!(plan.missing.last(), Some(&commits[2]));
    }

    #[test]
    fn symbolic_remote_ref_rejected() {
        let mut local = GraphBuilder::in_memory();
        let commits = local.linear(None, 1, "c");
        local.set_ref(MAIN, commits[0]);
        let remote = LocalTransport::new("remote", Repository::in_memory().unwrap());

        let spec = ResolvedRefSpec::new(MAIN, "HEAD");
        let err = HistoryNegotiator::new(local.repo(), &remote, &SilentProgress)
            .negotiate(&spec)
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::CannotPushToSymbolicRef { ref target, .. } if target == MAIN
        ));
    }

    #[test]
    fn missing_local_ref() {
        let local = GraphBuilder::in_memory();
        let remote = LocalTransport::new("remote", Repository::in_memory().unwrap());

        let err = negotiate(local.repo(), &remote).unwrap_err();
        assert!(matches!(err, SyncError::LocalRefNotFound(ref name) if name == MAIN));
    }

    #[test]
    fn objects_already_on_remote_are_pruned() {
        let mut local = GraphBuilder::in_memory();
        let commits = local.linear(None, 2, "c");
        local.set_ref(MAIN, commits[1]);

        // The remote has the history under another name only.
        let remote_repo = Repository::in_memory().unwrap();
        local.copy_history(&remote_repo, commits[1]);
        let remote = LocalTransport::new("remote", remote_repo);

        let Negotiation::Update(plan) = negotiate(local.repo(), &remote).unwrap() else {
            panic!("expected an update");
        };
        assert!(plan.is_creation());
        assert!(plan.missing.is_empty());
    }

    #[test]
    fn merge_history_ordered() {
        let mut local = GraphBuilder::in_memory();
        let base = local.commit(&[], "base");
        let left = local.commit(&[base], "left");
        let right = local.commit(&[base], "right");
        let merge = local.commit(&[left, right], "merge");
        local.set_ref(MAIN, merge);
        let remote = LocalTransport::new("remote", Repository::in_memory().unwrap());

        let Negotiation::Update(plan) = negotiate(local.repo(), &remote).unwrap() else {
            panic!("expected an update");
        };
        assert_eq!(
            plan.missing.len(),
            reachable_from(local.repo(), merge).len()
        );
        assert_dependency_order(local.repo(), &plan.missing);
    }

    #[test]
    fn dependency_order_skips_unknown_nodes() {
        let a = ObjectId::from_bytes([1; 32]);
        let b = ObjectId::from_bytes([2; 32]);
        let c = ObjectId::from_bytes([3; 32]);
        let graph = HashMap::from([(a, vec![b, c]), (b, vec![c])]);

        assert_eq!(dependency_order(a, &graph), vec![b, a]);
        assert!(dependency_order(c, &graph).is_empty());
    }
}
