//! Test fixtures and repository helpers.
//!
//! Provides builders for commit graphs and temporary repository
//! directories.

use crate::generators::ForkShape;
use geosync_store::{
    Commit, Object, ObjectId, RefTarget, RepoConfig, RepoDir, Repository, Tree, TreeEntry, Value,
    HEAD,
};
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;

/// Builds commits, trees and values into a repository.
///
/// Every commit made with [`GraphBuilder::commit`] gets its own snapshot:
/// a root tree holding a `layer` tree holding one `feature` value derived
/// from the commit message.
pub struct GraphBuilder {
    repo: Repository,
    clock: i64,
}

impl GraphBuilder {
    /// Creates a builder over an existing repository.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            clock: 1_700_000_000_000,
        }
    }

    /// Creates a builder over a fresh in-memory repository.
    pub fn in_memory() -> Self {
        Self::new(Repository::in_memory().expect("Failed to create in-memory repository"))
    }

    /// Returns the repository.
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Consumes the builder, returning the repository.
    pub fn into_repo(self) -> Repository {
        self.repo
    }

    /// Stores an object.
    pub fn put(&self, object: impl Into<Object>) -> ObjectId {
        self.repo
            .objects()
            .put(&object.into())
            .expect("Failed to store object")
    }

    /// Stores a value.
    pub fn value(&self, data: &[u8]) -> ObjectId {
        self.put(Value::new(data))
    }

    /// Stores a tree.
    pub fn tree(&self, entries: Vec<TreeEntry>) -> ObjectId {
        self.put(Tree::new(entries))
    }

    /// Stores a commit of `tree`.
    pub fn commit_tree(&mut self, tree: ObjectId, parents: &[ObjectId], message: &str) -> ObjectId {
        self.clock += 60_000;
        self.put(Commit::new(
            tree,
            parents.to_vec(),
            "Test Author <test@example.org>",
            self.clock,
            message,
        ))
    }

    /// Stores a commit with a snapshot derived from `message`.
    pub fn commit(&mut self, parents: &[ObjectId], message: &str) -> ObjectId {
        let feature = self.value(message.as_bytes());
        let layer = self.tree(vec![TreeEntry::value("feature", feature)]);
        let root = self.tree(vec![TreeEntry::tree("layer", layer)]);
        self.commit_tree(root, parents, message)
    }

    /// Stores `count` commits in a line on top of `base`.
    ///
    /// Messages are `<label>1`, `<label>2`, ... Returns the commits oldest
    /// first.
    pub fn linear(&mut self, base: Option<ObjectId>, count: usize, label: &str) -> Vec<ObjectId> {
        let mut commits = Vec::with_capacity(count);
        let mut parent = base;
        for i in 1..=count {
            let parents: Vec<ObjectId> = parent.into_iter().collect();
            let commit = self.commit(&parents, &format!("{}{}", label, i));
            commits.push(commit);
            parent = Some(commit);
        }
        commits
    }

    /// Builds a base line with two branches forking from its tip.
    pub fn fork(&mut self, shape: ForkShape) -> ForkedHistory {
        let base = self.linear(None, shape.base.max(1), "base");
        let tip = base.last().copied();
        let ours = self.linear(tip, shape.ours, "ours");
        let theirs = self.linear(tip, shape.theirs, "theirs");
        ForkedHistory { base, ours, theirs }
    }

    /// Points `name` at `commit`, whatever it pointed at before.
    pub fn set_ref(&self, name: &str, commit: ObjectId) {
        let refs = self.repo.refs();
        let current = match refs.resolve(name).expect("Failed to read ref") {
            Some(RefTarget::Direct(oid)) => Some(oid),
            Some(RefTarget::Symbolic(target)) => panic!("{} is symbolic (-> {})", name, target),
            None => None,
        };
        assert!(
            refs.compare_and_set(name, current, commit)
                .expect("Failed to set ref"),
            "ref {} changed while setting it",
            name
        );
    }

    /// Points `HEAD` at the branch ref `name`.
    pub fn set_head(&self, name: &str) {
        self.repo
            .refs()
            .set_symbolic(HEAD, name)
            .expect("Failed to set HEAD");
    }

    /// Copies everything reachable from `tip` into `target`.
    pub fn copy_history(&self, target: &Repository, tip: ObjectId) {
        self.copy_objects(target, reachable_from(&self.repo, tip));
    }

    /// Copies one commit and its snapshot, without its parents.
    pub fn copy_commit(&self, target: &Repository, commit: ObjectId) {
        let object = self.repo.objects().get(&commit).expect("Missing commit");
        let tree = object.as_commit().expect("Not a commit").tree;
        let mut ids = reachable_from(&self.repo, tree);
        ids.insert(commit);
        self.copy_objects(target, ids);
    }

    fn copy_objects(&self, target: &Repository, ids: HashSet<ObjectId>) {
        let objects: Vec<Object> = ids
            .iter()
            .map(|oid| self.repo.objects().get(oid).expect("Missing object"))
            .collect();
        target
            .objects()
            .put_batch(&objects)
            .expect("Failed to copy objects");
    }
}

/// Commits of a forked history, oldest first on each line.
#[derive(Debug, Clone)]
pub struct ForkedHistory {
    /// The shared line.
    pub base: Vec<ObjectId>,
    /// Our branch, on top of the base tip.
    pub ours: Vec<ObjectId>,
    /// Their branch, on top of the base tip.
    pub theirs: Vec<ObjectId>,
}

impl ForkedHistory {
    /// The tip of the base line.
    pub fn base_tip(&self) -> ObjectId {
        *self.base.last().expect("Base line is never empty")
    }

    /// Our tip (the base tip if our branch is empty).
    pub fn our_tip(&self) -> ObjectId {
        self.ours.last().copied().unwrap_or_else(|| self.base_tip())
    }

    /// Their tip (the base tip if their branch is empty).
    pub fn their_tip(&self) -> ObjectId {
        self.theirs.last().copied().unwrap_or_else(|| self.base_tip())
    }
}

/// Everything reachable from `tip` that `repo` holds.
///
/// Parents of commits on the shallow boundary are not followed. Absent
/// objects are skipped.
pub fn reachable_from(repo: &Repository, tip: ObjectId) -> HashSet<ObjectId> {
    let mut seen = HashSet::new();
    let mut stack = vec![tip];
    while let Some(oid) = stack.pop() {
        let Some(object) = repo.objects().try_get(&oid).expect("Failed to read object") else {
            continue;
        };
        if !seen.insert(oid) {
            continue;
        }
        match &object {
            Object::Commit(commit) if repo.shallow().contains(&oid) => stack.push(commit.tree),
            _ => stack.extend(object.references()),
        }
    }
    seen
}

/// A repository directory that is removed when dropped.
pub struct TestRepo {
    /// The repository.
    pub repo: Repository,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestRepo {
    /// Initializes a repository in a fresh temporary directory.
    pub fn init() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let repo = Repository::init(temp_dir.path()).expect("Failed to init repository");
        Self {
            repo,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the repository directory.
    pub fn path(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Returns a `file://` URL for the repository.
    pub fn url(&self) -> String {
        format!("file://{}", self.path().display())
    }

    /// Returns a graph builder writing into this repository.
    pub fn graph(&self) -> GraphBuilder {
        GraphBuilder::new(self.repo.clone())
    }

    /// Writes `config` to the directory and reloads the repository.
    pub fn save_config(&mut self, config: &RepoConfig) {
        RepoDir::open(self.path())
            .and_then(|dir| dir.save_config(config))
            .expect("Failed to save config");
        self.repo = self.reopen();
    }

    /// Opens the directory again, picking up on-disk changes.
    pub fn reopen(&self) -> Repository {
        Repository::open(self.path()).expect("Failed to open repository")
    }
}

impl std::ops::Deref for TestRepo {
    type Target = Repository;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}
