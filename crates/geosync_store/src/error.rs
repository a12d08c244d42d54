//! Error types for store operations.

use crate::oid::ObjectId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the object and ref stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding an object to CBOR failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Decoding an object from CBOR failed.
    #[error("decode error: {0}")]
    Decode(String),

    /// Reading or writing a JSON document failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested object is not in the store.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// A string could not be parsed as an object id.
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    /// A ref name is malformed.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidRefName {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Stored data does not match its id or is otherwise unreadable.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the repository lock.
    #[error("repository locked: {0}")]
    RepositoryLocked(PathBuf),

    /// The path does not contain a repository.
    #[error("not a repository: {0}")]
    NotARepository(PathBuf),
}

impl StoreError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Returns true if the error indicates a missing object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::ObjectNotFound(_))
    }
}
