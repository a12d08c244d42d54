//! Error types for the push engine.

use geosync_store::{ObjectId, StoreError};
use std::fmt;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a push.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A refspec is malformed or its source does not exist.
    #[error("invalid refspec {spec:?}: {reason}")]
    InvalidRefSpec {
        /// The refspec as given.
        spec: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No refspec was given and the current branch has no upstream.
    #[error("no upstream configured for {}", branch.as_deref().unwrap_or("detached HEAD"))]
    NoUpstreamConfigured {
        /// The current branch, if any.
        branch: Option<String>,
    },

    /// The local ref to push does not resolve to a commit.
    #[error("local ref not found: {0}")]
    LocalRefNotFound(String),

    /// The named remote is not configured.
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// The remote ref holds commits the local history does not contain.
    #[error("remote ref {remote_ref} has changes that would be lost")]
    RemoteHasDivergentChanges {
        /// The remote ref that was rejected.
        remote_ref: String,
    },

    /// The local history is truncated before the remote's commit was found.
    #[error("not enough local history to push {local_ref} (shallow at {boundary})")]
    HistoryTooShallow {
        /// The local ref being pushed.
        local_ref: String,
        /// The commit where the walk ran out of history.
        boundary: ObjectId,
    },

    /// The destination is a symbolic ref on the remote.
    #[error("cannot push to symbolic ref {remote_ref} (-> {target})")]
    CannotPushToSymbolicRef {
        /// The remote ref that was rejected.
        remote_ref: String,
        /// What the symbolic ref points at.
        target: String,
    },

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Local or remote store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The push was cancelled through the progress listener.
    #[error("push cancelled")]
    Cancelled,

    /// Invalid state transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },
}

/// Status codes of the safety rejections, as reported to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatusCode {
    /// The remote has changes that a push would discard.
    RemoteHasChanges,
    /// The local history is too shallow to prove a fast-forward.
    HistoryTooShallow,
    /// The destination is a symbolic ref.
    CannotPushToSymbolicRef,
}

impl SyncStatusCode {
    /// Returns the code's identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatusCode::RemoteHasChanges => "REMOTE_HAS_CHANGES",
            SyncStatusCode::HistoryTooShallow => "HISTORY_TOO_SHALLOW",
            SyncStatusCode::CannotPushToSymbolicRef => "CANNOT_PUSH_TO_SYMBOLIC_REF",
        }
    }

    /// Returns the user-facing failure message.
    pub fn message(&self) -> &'static str {
        match self {
            SyncStatusCode::RemoteHasChanges => {
                "Push failed: The remote repository has changes that would be lost in the event of a push."
            }
            SyncStatusCode::HistoryTooShallow => {
                "Push failed: There is not enough local history to complete the push."
            }
            SyncStatusCode::CannotPushToSymbolicRef => {
                "Push failed: Cannot push to a symbolic reference"
            }
        }
    }
}

impl fmt::Display for SyncStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SyncError {
    /// Creates an invalid refspec error.
    pub fn invalid_refspec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRefSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns the status code for safety rejections.
    pub fn status_code(&self) -> Option<SyncStatusCode> {
        match self {
            SyncError::RemoteHasDivergentChanges { .. } => Some(SyncStatusCode::RemoteHasChanges),
            SyncError::HistoryTooShallow { .. } => Some(SyncStatusCode::HistoryTooShallow),
            SyncError::CannotPushToSymbolicRef { .. } => {
                Some(SyncStatusCode::CannotPushToSymbolicRef)
            }
            _ => None,
        }
    }

    /// Returns true for errors detected before any remote interaction.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidRefSpec { .. }
                | SyncError::NoUpstreamConfigured { .. }
                | SyncError::LocalRefNotFound(_)
                | SyncError::RemoteNotFound(_)
        )
    }

    /// Returns true if the push was refused to prevent data loss.
    pub fn is_safety_rejection(&self) -> bool {
        self.status_code().is_some()
    }

    /// Returns true if the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            _ => false,
        }
    }
}
