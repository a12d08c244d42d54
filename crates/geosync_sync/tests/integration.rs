//! Integration tests for the push engine.

use geosync_store::{Object, ObjectId, RefTarget, RepoConfig, Repository, ShallowBoundary};
use geosync_sync::{
    LocalTransport, PushConfig, PushCoordinator, PushMode, PushOp, PushOutcome, PushState,
    RemoteTransport, ResolvedRefSpec, SyncError, SyncResult, SyncStatusCode,
};
use geosync_testkit::{reachable_from, GraphBuilder, TestRepo};
use parking_lot::Mutex;
use std::collections::VecDeque;

const MAIN: &str = "refs/heads/main";

fn main_spec() -> ResolvedRefSpec {
    ResolvedRefSpec::new(MAIN, MAIN)
}

fn push_main(local: &Repository, remote: &Repository) -> SyncResult<PushOutcome> {
    PushCoordinator::new(
        local.clone(),
        "origin",
        LocalTransport::new("remote", remote.clone()),
        PushConfig::default(),
    )
    .push(&[main_spec()])
}

/// A transport that moves the remote ref right before each
/// compare-and-set, as a concurrent pusher would.
struct RacingTransport {
    inner: LocalTransport,
    moves: Mutex<VecDeque<ObjectId>>,
}

impl RacingTransport {
    fn new(remote: Repository, moves: Vec<ObjectId>) -> Self {
        Self {
            inner: LocalTransport::new("racing", remote),
            moves: Mutex::new(moves.into()),
        }
    }
}

impl RemoteTransport for RacingTransport {
    fn url(&self) -> &str {
        self.inner.url()
    }

    fn read_ref(&self, name: &str) -> SyncResult<Option<RefTarget>> {
        self.inner.read_ref(name)
    }

    fn list_refs(&self, prefix: &str) -> SyncResult<Vec<(String, RefTarget)>> {
        self.inner.list_refs(prefix)
    }

    fn has_objects(&self, oids: &[ObjectId]) -> SyncResult<Vec<bool>> {
        self.inner.has_objects(oids)
    }

    fn send_objects(&self, objects: &[Object]) -> SyncResult<()> {
        self.inner.send_objects(objects)
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<ObjectId>,
        new: ObjectId,
    ) -> SyncResult<bool> {
        if let Some(next) = self.moves.lock().pop_front() {
            GraphBuilder::new(self.inner.repository().clone()).set_ref(name, next);
        }
        self.inner.compare_and_set(name, expected, new)
    }
}

#[test]
fn create_scenario() {
    let mut local = GraphBuilder::in_memory();
    let commits = local.linear(None, 3, "c");
    local.set_ref(MAIN, commits[2]);
    let remote = Repository::in_memory().unwrap();

    let outcome = push_main(local.repo(), &remote).unwrap();
    assert!(outcome.data_pushed);
    assert_eq!(remote.refs().peel(MAIN).unwrap(), Some(commits[2]));

    // C1, C2, C3 and their trees and values.
    let expected = reachable_from(local.repo(), commits[2]);
    assert_eq!(expected.len(), 12);
    assert_eq!(outcome.stats.objects_transferred as usize, expected.len());
    for oid in &expected {
        assert!(remote.objects().has(oid).unwrap());
    }
}

#[test]
fn fast_forward_scenario() {
    let mut local = GraphBuilder::in_memory();
    let commits = local.linear(None, 3, "c");
    local.set_ref(MAIN, commits[2]);

    let remote = Repository::in_memory().unwrap();
    local.copy_history(&remote, commits[0]);
    GraphBuilder::new(remote.clone()).set_ref(MAIN, commits[0]);

    let outcome = push_main(local.repo(), &remote).unwrap();
    assert!(outcome.data_pushed);
    assert_eq!(outcome.reports[0].old, Some(commits[0]));
    assert_eq!(outcome.reports[0].new, Some(commits[2]));
    assert_eq!(remote.refs().peel(MAIN).unwrap(), Some(commits[2]));

    // C2 and C3 with their snapshots; C1's objects were already there.
    assert_eq!(outcome.stats.objects_transferred, 8);
}

#[test]
fn divergence_scenario() {
    let mut local = GraphBuilder::in_memory();
    let base = local.commit(&[], "c1");
    let c2 = local.commit(&[base], "c2");
    let c3 = local.commit(&[base], "c3");
    local.set_ref(MAIN, c2);

    let remote = Repository::in_memory().unwrap();
    local.copy_history(&remote, c3);
    GraphBuilder::new(remote.clone()).set_ref(MAIN, c3);
    let before = remote.objects().len().unwrap();

    let err = push_main(local.repo(), &remote).unwrap_err();
    assert_eq!(err.status_code(), Some(SyncStatusCode::RemoteHasChanges));
    assert_eq!(remote.refs().peel(MAIN).unwrap(), Some(c3));
    assert_eq!(remote.objects().len().unwrap(), before);
}

#[test]
fn shallow_scenario() {
    let mut full = GraphBuilder::in_memory();
    let commits = full.linear(None, 4, "c");

    let remote = Repository::in_memory().unwrap();
    full.copy_history(&remote, commits[0]);
    GraphBuilder::new(remote.clone()).set_ref(MAIN, commits[0]);
    let before = remote.objects().len().unwrap();

    let local = Repository::in_memory()
        .unwrap()
        .with_shallow(ShallowBoundary::from_commits([commits[2]]));
    full.copy_commit(&local, commits[2]);
    full.copy_commit(&local, commits[3]);
    GraphBuilder::new(local.clone()).set_ref(MAIN, commits[3]);

    let err = push_main(&local, &remote).unwrap_err();
    assert_eq!(err.status_code(), Some(SyncStatusCode::HistoryTooShallow));
    assert_eq!(remote.refs().peel(MAIN).unwrap(), Some(commits[0]));
    assert_eq!(remote.objects().len().unwrap(), before);
}

#[test]
fn shallow_creation_keeps_remote_closed() {
    let mut full = GraphBuilder::in_memory();
    let commits = full.linear(None, 3, "c");
    full.set_ref(MAIN, commits[2]);

    let local = Repository::in_memory()
        .unwrap()
        .with_shallow(ShallowBoundary::from_commits([commits[1]]));
    full.copy_commit(&local, commits[1]);
    full.copy_commit(&local, commits[2]);
    GraphBuilder::new(local.clone()).set_ref(MAIN, commits[2]);

    let remote = Repository::in_memory().unwrap();
    let err = push_main(&local, &remote).unwrap_err();
    assert_eq!(err.status_code(), Some(SyncStatusCode::HistoryTooShallow));
    assert!(remote.objects().is_empty().unwrap());
    assert_eq!(remote.refs().peel(MAIN).unwrap(), None);

    // A full clone can still publish everything afterwards.
    push_main(full.repo(), &remote).unwrap();
    for oid in reachable_from(full.repo(), commits[2]) {
        assert!(remote.objects().has(&oid).unwrap());
    }
}

#[test]
fn symbolic_scenario() {
    let mut local = GraphBuilder::in_memory();
    let commits = local.linear(None, 1, "c");
    local.set_ref(MAIN, commits[0]);

    let remote = Repository::in_memory().unwrap();
    let err = PushCoordinator::new(
        local.repo().clone(),
        "origin",
        LocalTransport::new("remote", remote.clone()),
        PushConfig::default(),
    )
    .push(&[ResolvedRefSpec::new(MAIN, "HEAD")])
    .unwrap_err();

    assert_eq!(
        err.status_code(),
        Some(SyncStatusCode::CannotPushToSymbolicRef)
    );
    assert!(remote.objects().is_empty().unwrap());
    assert_eq!(
        remote.refs().resolve("HEAD").unwrap(),
        Some(RefTarget::Symbolic(MAIN.into()))
    );
}

#[test]
fn lost_race_is_retried_once() {
    let mut local = GraphBuilder::in_memory();
    let commits = local.linear(None, 3, "c");
    local.set_ref(MAIN, commits[2]);

    let remote = Repository::in_memory().unwrap();
    local.copy_history(&remote, commits[1]);
    GraphBuilder::new(remote.clone()).set_ref(MAIN, commits[0]);

    // Someone else fast-forwards the remote to C2 while we push.
    let transport = RacingTransport::new(remote.clone(), vec![commits[1]]);
    let push = PushCoordinator::new(local.repo().clone(), "origin", transport, PushConfig::default());

    let outcome = push.push(&[main_spec()]).unwrap();
    assert_eq!(outcome.stats.update_retries, 1);
    assert_eq!(outcome.reports[0].state, PushState::Done);
    assert_eq!(outcome.reports[0].old, Some(commits[1]));
    assert_eq!(remote.refs().peel(MAIN).unwrap(), Some(commits[2]));
}

#[test]
fn persistent_race_fails() {
    let mut local = GraphBuilder::in_memory();
    let commits = local.linear(None, 3, "c");
    local.set_ref(MAIN, commits[2]);

    let remote = Repository::in_memory().unwrap();
    local.copy_history(&remote, commits[1]);
    let mut remote_graph = GraphBuilder::new(remote.clone());
    remote_graph.set_ref(MAIN, commits[0]);
    let theirs = remote_graph.commit(&[commits[1]], "theirs");

    let transport = RacingTransport::new(remote.clone(), vec![commits[1], theirs]);
    let push = PushCoordinator::new(local.repo().clone(), "origin", transport, PushConfig::default());

    let err = push.push(&[main_spec()]).unwrap_err();
    assert!(matches!(err, SyncError::RemoteHasDivergentChanges { .. }));
    assert_eq!(remote.refs().peel(MAIN).unwrap(), Some(theirs));
    assert_eq!(push.stats().update_retries, 1);
}

#[test]
fn single_attempt_config_does_not_retry() {
    let mut local = GraphBuilder::in_memory();
    let commits = local.linear(None, 3, "c");
    local.set_ref(MAIN, commits[2]);

    let remote = Repository::in_memory().unwrap();
    local.copy_history(&remote, commits[1]);
    GraphBuilder::new(remote.clone()).set_ref(MAIN, commits[0]);

    let transport = RacingTransport::new(remote.clone(), vec![commits[1]]);
    let push = PushCoordinator::new(
        local.repo().clone(),
        "origin",
        transport,
        PushConfig::new().with_max_update_attempts(1),
    );

    let err = push.push(&[main_spec()]).unwrap_err();
    assert!(matches!(err, SyncError::RemoteHasDivergentChanges { .. }));
    assert_eq!(remote.refs().peel(MAIN).unwrap(), Some(commits[1]));
}

#[test]
fn atomic_session_leaves_earlier_refspecs_unapplied() {
    let mut local = GraphBuilder::in_memory();
    let commits = local.linear(None, 2, "c");
    local.set_ref(MAIN, commits[1]);
    local.set_ref("refs/heads/roads", commits[0]);

    let remote = Repository::in_memory().unwrap();
    local.copy_history(&remote, commits[1]);
    // The remote's roads is ahead of ours.
    GraphBuilder::new(remote.clone()).set_ref("refs/heads/roads", commits[1]);

    let err = PushCoordinator::new(
        local.repo().clone(),
        "origin",
        LocalTransport::new("remote", remote.clone()),
        PushConfig::new().with_mode(PushMode::Atomic),
    )
    .push(&[
        main_spec(),
        ResolvedRefSpec::new("refs/heads/roads", "refs/heads/roads"),
    ])
    .unwrap_err();

    assert!(err.is_safety_rejection());
    assert_eq!(remote.refs().peel(MAIN).unwrap(), None);
    assert_eq!(
        local.repo().refs().peel("refs/remotes/origin/main").unwrap(),
        None
    );
}

#[test]
fn directory_repositories_end_to_end() {
    let mut local = TestRepo::init();
    let remote = TestRepo::init();

    let mut graph = local.graph();
    let commits = graph.linear(None, 2, "edit");
    graph.set_ref(MAIN, commits[1]);
    local.save_config(
        &RepoConfig::new()
            .with_remote("origin", remote.url())
            .with_upstream("main", "origin", MAIN),
    );

    let outcome = PushOp::new(local.repo.clone()).call().unwrap();
    assert!(outcome.data_pushed);

    let reopened = remote.reopen();
    assert_eq!(reopened.refs().peel(MAIN).unwrap(), Some(commits[1]));
    assert_eq!(
        reopened.objects().len().unwrap(),
        reachable_from(&local.repo, commits[1]).len()
    );
    assert_eq!(
        local.reopen().refs().peel("refs/remotes/origin/main").unwrap(),
        Some(commits[1])
    );

    let again = PushOp::new(local.repo.clone()).call().unwrap();
    assert!(!again.data_pushed);
    assert_eq!(again.reports[0].state, PushState::UpToDate);
}

#[test]
fn push_all_branches() {
    let mut local = TestRepo::init();
    let remote = TestRepo::init();

    let mut graph = local.graph();
    let main = graph.linear(None, 2, "main");
    let roads = graph.linear(Some(main[0]), 1, "roads");
    graph.set_ref(MAIN, main[1]);
    graph.set_ref("refs/heads/roads", roads[0]);
    local.save_config(&RepoConfig::new().with_remote("origin", remote.url()));

    let outcome = PushOp::new(local.repo.clone())
        .with_remote("origin")
        .with_all(true)
        .call()
        .unwrap();
    assert_eq!(outcome.reports.len(), 2);
    assert_eq!(outcome.stats.refs_updated, 2);

    let reopened = remote.reopen();
    assert_eq!(reopened.refs().peel(MAIN).unwrap(), Some(main[1]));
    assert_eq!(reopened.refs().peel("refs/heads/roads").unwrap(), Some(roads[0]));
}

#[test]
fn independent_mode_pushes_what_it_can() {
    let mut local = GraphBuilder::in_memory();
    let commits = local.linear(None, 2, "c");
    local.set_ref(MAIN, commits[1]);
    local.set_ref("refs/heads/roads", commits[0]);

    let remote = Repository::in_memory().unwrap();
    local.copy_history(&remote, commits[1]);
    GraphBuilder::new(remote.clone()).set_ref("refs/heads/roads", commits[1]);

    let outcome = PushOp::new(local.repo().clone())
        .with_refspecs(["roads", "main"])
        .with_config(PushConfig::new().with_mode(PushMode::Independent))
        .call_with(LocalTransport::new("remote", remote.clone()))
        .unwrap();

    assert!(outcome.data_pushed);
    assert_eq!(outcome.failures().count(), 1);
    assert_eq!(remote.refs().peel(MAIN).unwrap(), Some(commits[1]));
    let err = outcome.into_result().unwrap_err();
    assert_eq!(err.status_code(), Some(SyncStatusCode::RemoteHasChanges));
}
