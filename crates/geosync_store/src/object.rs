//! Immutable objects of the commit graph.
//!
//! Three kinds of object make up a repository:
//!
//! ```text
//! Commit ──tree──▶ Tree ──entry──▶ Tree ──entry──▶ Value
//!   │                 └──entry──▶ Value
//!   └──parents──▶ Commit ...
//! ```
//!
//! Every object is identified by the SHA-256 of its canonical CBOR
//! encoding, so an object's id changes whenever any reachable content does.

use crate::error::{StoreError, StoreResult};
use crate::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A commit.
    Commit,
    /// A tree.
    Tree,
    /// A leaf value.
    Value,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Value => "value",
        };
        f.write_str(name)
    }
}

/// A commit: a snapshot of the root tree plus its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root tree of the snapshot.
    pub tree: ObjectId,
    /// Parent commits, first parent first.
    pub parents: Vec<ObjectId>,
    /// Author name and address.
    pub author: String,
    /// Commit time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Commit message.
    pub message: String,
}

impl Commit {
    /// Creates a commit.
    pub fn new(
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: impl Into<String>,
        timestamp: i64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            parents,
            author: author.into(),
            timestamp,
            message: message.into(),
        }
    }
}

/// A named entry of a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Entry name, unique within the tree.
    pub name: String,
    /// Kind of the referenced object (`Tree` or `Value`).
    pub kind: ObjectKind,
    /// Referenced object.
    pub oid: ObjectId,
}

impl TreeEntry {
    /// Creates an entry pointing at a subtree.
    pub fn tree(name: impl Into<String>, oid: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Tree,
            oid,
        }
    }

    /// Creates an entry pointing at a value.
    pub fn value(name: impl Into<String>, oid: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind: ObjectKind::Value,
            oid,
        }
    }
}

/// A tree: a directory of features or nested trees.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Creates a tree; entries are sorted by name so the encoding is canonical.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    /// Returns the entries in name order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Returns true if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A leaf value, typically one serialized feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    /// Opaque payload.
    pub data: Vec<u8>,
}

impl Value {
    /// Creates a value.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

/// Any object stored in the object graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Object {
    /// A commit.
    Commit(Commit),
    /// A tree.
    Tree(Tree),
    /// A leaf value.
    Value(Value),
}

impl Object {
    /// Returns the object's kind.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Commit(_) => ObjectKind::Commit,
            Object::Tree(_) => ObjectKind::Tree,
            Object::Value(_) => ObjectKind::Value,
        }
    }

    /// Returns the commit if this object is one.
    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            Object::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    /// Returns the ids this object points at.
    ///
    /// For commits the root tree comes first, followed by the parents.
    pub fn references(&self) -> Vec<ObjectId> {
        match self {
            Object::Commit(commit) => {
                let mut refs = Vec::with_capacity(commit.parents.len() + 1);
                refs.push(commit.tree);
                refs.extend(commit.parents.iter().copied());
                refs
            }
            Object::Tree(tree) => tree.entries.iter().map(|e| e.oid).collect(),
            Object::Value(_) => Vec::new(),
        }
    }

    /// Encodes the object to canonical CBOR.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| StoreError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes an object from CBOR.
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Computes the object's id.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(ObjectId::digest(&self.encode()?))
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Object::Commit(commit)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Object::Tree(tree)
    }
}

impl From<Value> for Object {
    fn from(value: Value) -> Self {
        Object::Value(value)
    }
}
