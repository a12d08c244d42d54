//! # GeoSync Store
//!
//! Object graph store and ref store for GeoSync.
//!
//! This crate provides the two collaborators the synchronization engine
//! works against:
//!
//! - [`ObjectStore`]: content-addressable storage of commits, trees and
//!   values keyed by [`ObjectId`]
//! - [`RefStore`]: named refs, updated only through compare-and-set
//!
//! ## Design Principles
//!
//! - Objects are immutable and identified by the hash of their content
//! - Object reads need no locking
//! - The only mutable state is the ref table, and every write to it is a
//!   compare-and-set
//!
//! ## Available Implementations
//!
//! - [`MemoryObjectStore`] / [`MemoryRefStore`] - for tests and embedding
//! - [`FileObjectStore`] / [`FileRefStore`] - a repository directory, see [`RepoDir`]
//!
//! ## Example
//!
//! ```rust
//! use geosync_store::{Commit, MemoryObjectStore, MemoryRefStore, Object, ObjectStore, RefStore, Tree};
//!
//! let objects = MemoryObjectStore::new();
//! let refs = MemoryRefStore::new();
//!
//! let tree = objects.put(&Object::from(Tree::default())).unwrap();
//! let commit = objects
//!     .put(&Object::from(Commit::new(tree, vec![], "ana", 0, "initial import")))
//!     .unwrap();
//!
//! assert!(refs.compare_and_set("refs/heads/main", None, commit).unwrap());
//! assert_eq!(refs.peel("refs/heads/main").unwrap(), Some(commit));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dir;
mod error;
mod object;
mod objects;
mod oid;
mod refs;
mod repository;
mod shallow;

pub use config::{BranchConfig, RemoteConfig, RepoConfig, DEFAULT_REMOTE};
pub use dir::{FileObjectStore, FileRefStore, RepoDir};
pub use error::{StoreError, StoreResult};
pub use object::{Commit, Object, ObjectKind, Tree, TreeEntry, Value};
pub use objects::{MemoryObjectStore, ObjectStore};
pub use oid::{ObjectId, OID_LEN};
pub use refs::{
    branch_name, tracking_ref, validate_ref_name, MemoryRefStore, RefStore, RefTarget, HEAD,
    HEADS_PREFIX, REFS_PREFIX, REMOTES_PREFIX, TAGS_PREFIX,
};
pub use repository::Repository;
pub use shallow::ShallowBoundary;
