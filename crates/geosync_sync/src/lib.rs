//! # GeoSync Sync
//!
//! Push synchronization engine for GeoSync.
//!
//! This crate provides:
//! - Refspec parsing and resolution (short names, upstreams, `--all`)
//! - History negotiation (fast-forward check, missing object set)
//! - Push coordination (batched transfer, compare-and-set ref update)
//! - Transport abstraction with a local filesystem transport
//!
//! ## Architecture
//!
//! A push runs in three steps per refspec:
//! 1. Resolve the user's arguments to `(local ref, remote ref)` pairs
//! 2. Negotiate: prove the remote commit is an ancestor of the local one
//!    and compute the objects the remote lacks
//! 3. Transfer those objects in dependency order, then compare-and-set the
//!    remote ref against the value seen in step 2
//!
//! ## Key Invariants
//!
//! - A remote ref only moves forward; nothing is ever overwritten blindly
//! - The remote never references an object it does not hold
//! - Pushing the same state twice changes nothing
//! - Symbolic refs are never push targets

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod negotiate;
mod op;
mod progress;
mod push;
mod refspec;
mod state;
mod transport;

pub use config::{PushConfig, PushMode};
pub use error::{SyncError, SyncResult, SyncStatusCode};
pub use negotiate::{HistoryNegotiator, Negotiation, PushPlan};
pub use op::PushOp;
pub use progress::{CancelToken, ProgressListener, SilentProgress};
pub use push::PushCoordinator;
pub use refspec::{PushTarget, RefSpec, RefSpecResolver, ResolvedRefSpec};
pub use state::{PushOutcome, PushState, PushStats, RefUpdateReport};
pub use transport::{connect, LocalTransport, RemoteTransport};

/// Version of the push engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
